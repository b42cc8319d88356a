use std::net::{Ipv4Addr, SocketAddr};

use futures::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::oneshot,
};
use tokio_stream::wrappers::TcpListenerStream;
use tracing::info;

use crate::{bridge::Bridge, client::PeerAddr, config::RelaySettings, error::Error};

async fn bind(addr: SocketAddr) -> Result<TcpListener, Error> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Listen { addr, source })
}

async fn run<S>(
    serial: S,
    settings: RelaySettings,
    listener: TcpListener,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| Error::InternalIssue(format!("Listener has no local address: {e}")))?;

    if let Some(port_reply) = allocated_port {
        port_reply.send(addr.port()).map_err(|_| {
            Error::InternalIssue("The receiver of which port was allocated was dropped".into())
        })?;
    }

    info!("listening on {}", addr);

    let incoming = TcpListenerStream::new(listener).map(|accepted| {
        accepted.map(|stream| {
            let peer = match stream.peer_addr() {
                Ok(addr) => PeerAddr::from(addr),
                Err(_) => PeerAddr::from("unknown peer"),
            };
            (stream, peer)
        })
    });

    let (bridge, broadcast) = Bridge::new(serial, settings);
    bridge.run(broadcast, incoming).await
}

/// Start relaying on an arbitrary available port on localhost.
/// The port allocated will be sent on the provided channel.
pub async fn run_any_port<S>(
    serial: S,
    settings: RelaySettings,
    allocated_port: oneshot::Sender<u16>,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let listener = bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
    run(serial, settings, listener, Some(allocated_port)).await
}

/// Start relaying on the given address.
///
/// Fails right away if the address cannot be bound,
/// otherwise only returns once the serial port is lost.
pub async fn run_on_addr<S>(
    serial: S,
    settings: RelaySettings,
    addr: SocketAddr,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let listener = bind(addr).await?;
    run(serial, settings, listener, None).await
}
