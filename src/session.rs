use std::{fmt::Display, io};

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info, warn};

use crate::{
    bridge::Bridge,
    client::{ClientHandle, PeerAddr},
    hexdump,
};

/// Why a client session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The client closed the connection.
    Disconnected,

    /// Reading from the client failed.
    ReadFailed(io::Error),

    /// Writing the client's bytes to the serial port failed.
    /// Only this session ends, others carry on.
    SerialWriteFailed(io::Error),
}

impl Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::Disconnected => write!(f, "disconnected"),
            SessionEnd::ReadFailed(e) => write!(f, "client read failed: {e}"),
            SessionEnd::SerialWriteFailed(e) => write!(f, "serial write failed: {e}"),
        }
    }
}

/// Serve one connected client until it goes away.
///
/// The client is registered for broadcasts while this runs.
/// Everything it sends is written to the serial port, one chunk at a time.
pub(crate) async fn run<C>(bridge: Bridge, connection: C, peer: PeerAddr) -> SessionEnd
where
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(connection);
    let client = ClientHandle::new(peer, Box::new(writer));

    let (registration, count) = bridge.registry().register(client.clone());
    info!(clients = count, "Connect {client}");

    let settings = bridge.settings();
    let mut from_client =
        FramedRead::with_capacity(reader, BytesCodec::new(), settings.buffer_size);

    let end = loop {
        let chunk = match from_client.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => break SessionEnd::ReadFailed(e),
            None => break SessionEnd::Disconnected,
        };

        if let Err(e) = bridge.gate().write(&chunk).await {
            warn!(?e, "Unable to write to serial port");
            break SessionEnd::SerialWriteFailed(e);
        }

        debug!("Wrote {} bytes to serial port", chunk.len());
        if settings.hexdump {
            info!("To serial port:\n{}", hexdump::dump(&chunk));
        }
    };

    drop(registration);

    if let Err(e) = client.close().await {
        debug!(?e, "Problem closing connection");
    }

    info!("Disconnect {client}: {end}");

    end
}
