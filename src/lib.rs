#![deny(missing_docs)]

//! This crate shares one serial port with any number of TCP clients.
//!
//! Whatever the serial port produces is broadcast to every connected client.
//! Whatever a client sends is written to the serial port.
//! Client writes go through a gate, so the bytes of two clients never interleave
//! within a chunk.
//!
//! The bytes are relayed as-is, there is no framing or protocol on top.
//!
//! Clients may come and go at any time without affecting each other.
//! Losing the serial port ends the relay.

/// Accepts connections and spawns a session for each.
pub(crate) mod acceptor;

/// Reads the serial port and broadcasts to all clients.
pub mod broadcast;

/// Owns the state shared by all tasks of one relay.
pub mod bridge;

/// Connected clients.
pub mod client;

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// Serializes writes to the serial port.
pub mod gate;

/// Human readable dumps of relayed bytes.
pub mod hexdump;

/// Logging/tracing setup.
pub mod logging;

/// Mocked serial port.
pub mod mock;

/// The set of clients receiving broadcasts.
pub mod registry;

/// Code relating to setting up the server which accepts clients.
pub mod server;

/// The task serving a single client.
pub mod session;

/// Serial port driver.
pub mod serial;
