use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

/// Errors that may occur in this library.
///
/// Problems with a single client never show up here,
/// they stay within that client's session.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial port could not be opened.
    #[error("Could not open serial port `{path}`")]
    SerialOpen {
        /// The path (or COM name) of the port.
        path: String,

        /// What the driver reported.
        #[source]
        source: tokio_serial::Error,
    },

    /// The TCP listener could not be set up.
    #[error("Could not listen on {addr}")]
    Listen {
        /// The address we tried to bind.
        addr: SocketAddr,

        /// The underlying problem.
        #[source]
        source: io::Error,
    },

    /// Reading from the serial port failed.
    /// The relay has no data source left after this.
    #[error("Unable to read from serial port")]
    SerialRead(#[source] io::Error),

    /// The serial port stopped producing data (end of stream).
    #[error("Serial port closed")]
    SerialClosed,

    /// The configuration is not usable.
    #[error("The configuration is not valid. Problem: `{0}`")]
    BadConfig(String),

    /// A configuration file could not be read.
    #[error("Could not read configuration file {path:?}")]
    ConfigIo {
        /// Path to the file.
        path: PathBuf,

        /// The underlying problem.
        #[source]
        source: io::Error,
    },

    /// A configuration file was not valid RON.
    #[error("Could not parse configuration")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// A configuration could not be turned into RON.
    #[error("Could not serialize configuration")]
    ConfigSerialize(#[from] ron::Error),

    /// Something unexpected happened on our side.
    #[error("Internal issue: `{0}`")]
    InternalIssue(String),
}

impl Error {
    /// If this is [`Error::BadConfig`], get the problem description.
    pub fn try_into_bad_config(self) -> Option<String> {
        match self {
            Error::BadConfig(problem) => Some(problem),
            _ => None,
        }
    }

    /// Whether this error means the serial port is gone.
    pub fn is_serial_loss(&self) -> bool {
        matches!(self, Error::SerialRead(_) | Error::SerialClosed)
    }
}
