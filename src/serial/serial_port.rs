use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::{config::SerialSettings, error::Error};

/// Builder for an opened [`SerialStream`].
#[derive(Debug)]
pub struct SerialPortBuilder {
    baud: Option<u32>,
    path: String,
    settings: SerialSettings,
}

impl SerialPortBuilder {
    /// Start a new builder.
    /// The tty should likely be along the lines of `/dev/ttyACMx` on unix, and `COMx` on Windows.
    pub fn new(tty: &str) -> Self {
        Self {
            baud: None,
            path: tty.to_string(),
            settings: SerialSettings::default(),
        }
    }

    /// Set the serial port builder's baud.
    /// Will use 115_200 if not set.
    pub fn baud(mut self, baud: u32) -> Self {
        self.baud = Some(baud);
        self
    }

    /// Set the line settings (data bits, parity, stop bits, flow control).
    pub fn settings(mut self, settings: &SerialSettings) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Open the port.
    pub fn build(self) -> Result<SerialStream, Error> {
        let baud = self.baud.unwrap_or(115_200);
        let SerialSettings {
            data_bits,
            parity,
            stop_bits,
            flow_control,
        } = self.settings;

        info!(
            %self.path,
            %baud,
            ?data_bits,
            ?parity,
            ?stop_bits,
            ?flow_control,
            "Opening serial port"
        );

        tokio_serial::new(&self.path, baud)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .open_native_async()
            .map_err(|source| Error::SerialOpen {
                path: self.path,
                source,
            })
    }
}
