//! A mock, useful to run the relay without an actual serial port.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, info, trace, warn};

/// A serial link which echoes back whatever is written to it.
///
/// Behaves like a serial device with its TX and RX pins tied together.
/// The echo task stops when the returned stream is dropped.
pub fn loopback(buffer_size: usize) -> DuplexStream {
    let (ours, mut device) = tokio::io::duplex(buffer_size.max(1));

    info!("Running loopback mock");

    tokio::spawn(async move {
        let mut buf = vec![0; buffer_size.max(1)];

        loop {
            let n = match device.read(&mut buf).await {
                Ok(0) => {
                    debug!("Loopback mock closed");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(?e, "Loopback mock read error");
                    break;
                }
            };

            trace!("Echoing {n} byte(s)");

            if let Err(e) = device.write_all(&buf[..n]).await {
                warn!(?e, "Loopback mock write error");
                break;
            }
        }
    });

    ours
}
