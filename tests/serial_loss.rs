use std::time::Duration;

use color_eyre::Result;
use common::{connect_registered, start_relay, TIMEOUT};
use serial_relay::error::Error;
use pretty_assertions::assert_eq;
use tokio::{io::AsyncReadExt, time::timeout};

mod common;

#[tokio::test]
async fn serial_eof_stops_the_relay() -> Result<()> {
    let mut relay = start_relay().await;
    let mut client = connect_registered(&mut relay).await?;

    drop(relay.device);

    let result = timeout(TIMEOUT, relay.handle).await??;
    assert!(matches!(result, Err(Error::SerialClosed)));

    // Sessions are ended with the relay, so the client sees the connection close.
    let mut buf = vec![];
    let read = timeout(TIMEOUT, client.read_to_end(&mut buf)).await?;
    assert!(matches!(read, Ok(0) | Err(_)));

    Ok(())
}

#[tokio::test]
async fn no_new_clients_after_serial_loss() -> Result<()> {
    let relay = start_relay().await;
    let port = relay.port;

    drop(relay.device);
    let _ = timeout(TIMEOUT, relay.handle).await?;

    // The listener went away with the relay.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .is_err());

    Ok(())
}

#[tokio::test]
async fn stopping_the_relay_releases_the_serial_port() -> Result<()> {
    let mut relay = start_relay().await;
    let _client = connect_registered(&mut relay).await?;

    relay.handle.abort();
    assert!(relay.handle.await.unwrap_err().is_cancelled());

    // Nothing is left holding the relay's end, so the device sees it close.
    let mut buf = vec![];
    let read = timeout(TIMEOUT, relay.device.read_to_end(&mut buf)).await??;
    assert_eq!(read, 0);

    Ok(())
}
