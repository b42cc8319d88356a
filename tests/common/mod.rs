#![allow(dead_code)]

use std::time::Duration;

use color_eyre::Result;
use serial_relay::{config::RelaySettings, error::Error, server};
use tokio::{
    io::{AsyncReadExt, DuplexStream},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tracing::{info, Level};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// A relay running over an in-memory serial link.
pub struct Relay {
    pub port: u16,

    /// The device end of the serial link.
    /// Write here to produce serial data, read here to see what clients wrote.
    pub device: DuplexStream,

    pub handle: JoinHandle<Result<(), Error>>,
}

pub async fn start_relay() -> Relay {
    start_relay_with_settings(RelaySettings::default()).await
}

pub async fn start_relay_with_settings(settings: RelaySettings) -> Relay {
    serial_relay::logging::init(Level::DEBUG, None).await;

    let (serial, device) = tokio::io::duplex(64 * 1024);
    let (port_tx, port_rx) = oneshot::channel();

    let handle = tokio::spawn(server::run_any_port(serial, settings, port_tx));
    let port = port_rx
        .await
        .expect("Relay should reply with allocated port");

    Relay {
        port,
        device,
        handle,
    }
}

pub async fn connect(port: u16) -> Result<TcpStream> {
    info!("Connecting to relay on port {port}");
    Ok(TcpStream::connect(("127.0.0.1", port)).await?)
}

/// Read exactly `n` bytes, or fail after [`TIMEOUT`].
pub async fn receive<R: AsyncReadExt + Unpin>(reader: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0; n];
    timeout(TIMEOUT, reader.read_exact(&mut buf)).await??;

    Ok(buf)
}

/// Assert nothing arrives within a short while.
pub async fn receive_nothing<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<()> {
    let mut buf = [0; 1];
    match timeout(Duration::from_millis(200), reader.read(&mut buf)).await {
        Err(_elapsed) => Ok(()),
        Ok(read) => Err(color_eyre::eyre::eyre!(
            "Expected nothing, got {read:?} ({:?})",
            &buf
        )),
    }
}

/// Connecting is not the same as being registered for broadcasts.
/// Round-trip a byte through the serial side to know the session is up.
pub async fn connect_registered(relay: &mut Relay) -> Result<TcpStream> {
    use tokio::io::AsyncWriteExt;

    let mut client = connect(relay.port).await?;
    client.write_all(&[0xff]).await?;
    assert_eq!(receive(&mut relay.device, 1).await?, [0xff]);

    Ok(client)
}
