use std::io;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{Mutex, MutexGuard},
};

use crate::serial::SerialWriter;

/// Serializes writes to the serial port.
///
/// At most one writer holds the gate at a time.
/// The gate is released when the guard is dropped, whatever happened while holding it.
pub struct SerialWriterGate<W = SerialWriter> {
    writer: Mutex<W>,
}

impl<W> std::fmt::Debug for SerialWriterGate<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialWriterGate").finish_non_exhaustive()
    }
}

impl<W: AsyncWrite + Unpin> SerialWriterGate<W> {
    /// Guard the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Wait for exclusive access to the serial writer.
    pub async fn acquire(&self) -> MutexGuard<'_, W> {
        self.writer.lock().await
    }

    /// Write the whole chunk while holding the gate.
    ///
    /// No other chunk is written until this one is complete (or failed).
    pub async fn write(&self, chunk: &[u8]) -> io::Result<()> {
        let mut writer = self.acquire().await;

        writer.write_all(chunk).await?;
        writer.flush().await
    }
}
