use std::{
    net::{IpAddr, Ipv4Addr},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::error::Error;

/// How bytes are framed on the serial line.
///
/// Baud rate is not part of this, it is always given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Data bits per character.
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Stop bits per character.
    pub stop_bits: StopBits,

    /// Hardware, software or no flow control.
    pub flow_control: FlowControl,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// Settings for relaying bytes between the serial port and clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// The most bytes read in one go, from the serial port or from a client.
    pub buffer_size: usize,

    /// Give up on writing a chunk to a client after this many milliseconds.
    ///
    /// Without a timeout, a client which stops reading will eventually
    /// stall delivery to every other client.
    pub client_write_timeout_ms: Option<u64>,

    /// Log a hex dump of every relayed chunk.
    pub hexdump: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            client_write_timeout_ms: None,
            hexdump: false,
        }
    }
}

impl RelaySettings {
    /// The client write timeout, if any.
    pub fn client_write_timeout(&self) -> Option<Duration> {
        self.client_write_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.buffer_size == 0 {
            return Err(Error::BadConfig(
                "The buffer size must be at least one byte".into(),
            ));
        }

        if self.client_write_timeout_ms == Some(0) {
            return Err(Error::BadConfig(
                "A client write timeout of 0 ms would fail every write. \
                 Leave it out to disable the timeout."
                    .into(),
            ));
        }

        Ok(())
    }
}

/// The configuration used for running the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line settings.
    pub serial: SerialSettings,

    /// The address the TCP listener binds to.
    pub bind_address: IpAddr,

    /// Relay behaviour.
    pub relay: RelaySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            relay: RelaySettings::default(),
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, Error> {
        Ok(Self::ron().from_str::<Config>(input)?)
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            serial: SerialSettings {
                flow_control: FlowControl::Hardware,
                ..Default::default()
            },
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            relay: RelaySettings {
                client_write_timeout_ms: Some(5000),
                ..Default::default()
            },
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> Result<String, Error> {
        Ok(Self::ron().to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let path = p.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        Self::deserialize(&s)
    }

    /// Check the configuration makes sense.
    pub fn validate(&self) -> Result<(), Error> {
        self.relay.validate()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn example_round_trips() {
        let c = Config::example();
        let serialized = c.serialize_pretty().unwrap();

        println!("{serialized}");

        assert_eq!(Config::deserialize(&serialized).unwrap(), c);
    }

    #[test]
    fn deserialize() {
        let input = r#"
(
    serial: (
        data_bits: Seven,
        parity: Even,
        stop_bits: Two,
        flow_control: Software,
    ),
    bind_address: "127.0.0.1",
    relay: (
        buffer_size: 4096,
        client_write_timeout_ms: 250,
        hexdump: true,
    ),
)
"#;
        let config = Config::deserialize(input).unwrap();

        assert_eq!(config.serial.data_bits, DataBits::Seven);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.stop_bits, StopBits::Two);
        assert_eq!(config.serial.flow_control, FlowControl::Software);
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.relay.buffer_size, 4096);
        assert_eq!(
            config.relay.client_write_timeout(),
            Some(Duration::from_millis(250))
        );
        assert!(config.relay.hexdump);
    }

    #[test]
    fn omitted_fields_use_defaults() {
        let config = Config::deserialize("(relay: (hexdump: true))").unwrap();

        assert_eq!(config.serial, SerialSettings::default());
        assert_eq!(config.relay.buffer_size, 1024);
        assert!(config.relay.hexdump);
    }

    #[test]
    fn bad_ron_is_an_error() {
        assert!(matches!(
            Config::deserialize("(relay: (buffer_size: \"big\"))"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn bad_config_zero_buffer() {
        let c = Config {
            relay: RelaySettings {
                buffer_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };

        let err = c.validate().unwrap_err().try_into_bad_config().unwrap();

        assert!(err.contains("buffer size"));
    }

    #[test]
    fn bad_config_zero_timeout() {
        let c = Config {
            relay: RelaySettings {
                client_write_timeout_ms: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = c.validate().unwrap_err().try_into_bad_config().unwrap();

        assert!(err.contains("timeout"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            Config::new_from_path("/this/path/does/not/exist.ron"),
            Err(Error::ConfigIo { .. })
        ));
    }
}
