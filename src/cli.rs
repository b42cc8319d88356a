use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;

/// The command line interface for serial relay.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// The serial port to relay, e.g. `/dev/ttyUSB0` or `COM3`
    #[arg(required = true)]
    pub serial_port: Option<String>,

    /// Baud rate of the serial port
    #[arg(required = true)]
    pub baud: Option<u32>,

    /// TCP port clients connect to
    #[arg(required = true)]
    pub tcp_port: Option<u16>,

    /// Pass `debug` to log a hex dump of everything relayed
    pub debug: Option<DebugFlag>,

    /// Path to a configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Relay through an in-memory loopback instead of opening the serial port
    #[arg(long)]
    pub mock: bool,

    /// Log level on stdout, overridden by `RUST_LOG`
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Also log to a daily rotated file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Show an example of a configuration file's contents and exit
    #[arg(long, exclusive = true)]
    pub example_config: bool,
}

/// The optional trailing `debug` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DebugFlag {
    /// Hex dump relayed bytes.
    Debug,
}

impl Cli {
    /// Was the trailing `debug` argument given?
    pub fn debug(&self) -> bool {
        self.debug.is_some()
    }
}
