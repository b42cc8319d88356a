use std::sync::Arc;

use bytes::Bytes;
use futures::{future::join_all, StreamExt};
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::RelaySettings, error::Error, hexdump, registry::ClientRegistry, serial::SerialReader,
};

/// Reads the serial port and hands every chunk to every registered client.
///
/// There is exactly one of these per serial port, and it is the only reader of it.
pub struct BroadcastLoop {
    serial: FramedRead<SerialReader, BytesCodec>,
    registry: ClientRegistry,
    settings: Arc<RelaySettings>,
}

impl std::fmt::Debug for BroadcastLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastLoop")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BroadcastLoop {
    pub(crate) fn new(
        serial: SerialReader,
        registry: ClientRegistry,
        settings: Arc<RelaySettings>,
    ) -> Self {
        Self {
            serial: FramedRead::with_capacity(serial, BytesCodec::new(), settings.buffer_size),
            registry,
            settings,
        }
    }

    /// Relay serial data until the serial port fails.
    ///
    /// Only returns on error: the serial port is the sole data source,
    /// so there is nothing left to do once it is gone.
    pub async fn run(self) -> Result<(), Error> {
        let Self {
            mut serial,
            registry,
            settings,
        } = self;

        loop {
            let chunk = match serial.next().await {
                Some(Ok(chunk)) => chunk.freeze(),
                Some(Err(e)) => {
                    error!(?e, "Unable to read from serial port");
                    return Err(Error::SerialRead(e));
                }
                None => {
                    error!("Serial port closed");
                    return Err(Error::SerialClosed);
                }
            };

            debug!("Read {} bytes from serial port", chunk.len());
            if settings.hexdump {
                info!("From serial port:\n{}", hexdump::dump(&chunk));
            }

            broadcast(&registry, &settings, chunk).await;
        }
    }
}

/// Write the chunk to every client registered right now.
/// Returns how many clients got all of it.
async fn broadcast(
    registry: &ClientRegistry,
    settings: &RelaySettings,
    chunk: Bytes,
) -> usize {
    let clients = registry.snapshot();
    let deadline = settings.client_write_timeout();

    let deliveries = clients.iter().map(|client| {
        let chunk = &chunk;
        async move { (client, client.send(chunk, deadline).await) }
    });

    let mut delivered = 0;
    for (client, result) in join_all(deliveries).await {
        match result {
            Ok(()) => delivered += 1,
            // The client's own session notices if it is gone for good.
            Err(e) => warn!(%client, ?e, "Unable to write to client"),
        }
    }

    trace!("Broadcasted to {delivered}/{} client(s)", clients.len());

    delivered
}
