use tokio::io::{AsyncRead, AsyncWrite};

/// Opening and configuring a real serial port.
pub mod serial_port;

/// The read half of the serial link, type erased.
/// Owned by the broadcast loop, which is its only reader.
pub type SerialReader = Box<dyn AsyncRead + Send + Unpin>;

/// The write half of the serial link, type erased.
/// Only reachable through the [`crate::gate::SerialWriterGate`].
pub type SerialWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Split a serial link into its two halves.
pub(crate) fn split<S>(serial: S) -> (SerialReader, SerialWriter)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(serial);

    (Box::new(reader), Box::new(writer))
}
