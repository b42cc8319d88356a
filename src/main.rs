use std::net::SocketAddr;

use clap::Parser;
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use serial_relay::{
    cli, config::Config, logging, mock, serial::serial_port::SerialPortBuilder, server,
};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();

    if cli.example_config {
        println!("{}", Config::example().serialize_pretty()?);
        return Ok(());
    }

    logging::init(cli.log_level, cli.log_dir.clone()).await;

    let mut config = if let Some(config_path) = &cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)?
    } else {
        debug!("Default config");
        Config::default()
    };

    if cli.debug() {
        config.relay.hexdump = true;
    }

    config.validate()?;

    let (Some(serial_port), Some(baud), Some(tcp_port)) =
        (cli.serial_port.as_deref(), cli.baud, cli.tcp_port)
    else {
        return Err(eyre!("A serial port, baud rate and TCP port are required"));
    };

    let addr = SocketAddr::new(config.bind_address, tcp_port);

    let relay = if cli.mock {
        warn!(%serial_port, "Not opening serial port, relaying through a loopback mock");

        let serial = mock::loopback(config.relay.buffer_size);
        tokio::spawn(server::run_on_addr(serial, config.relay, addr))
    } else {
        let serial = SerialPortBuilder::new(serial_port)
            .baud(baud)
            .settings(&config.serial)
            .build()
            .wrap_err("Unable to open serial port")?;

        tokio::spawn(server::run_on_addr(serial, config.relay, addr))
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
            Ok(())
        }
        result = relay => match result.wrap_err("Relay task failed")? {
            Ok(()) => Err(eyre!("Relay stopped unexpectedly")),
            Err(e) if e.is_serial_loss() => {
                error!(%e, "Lost the serial port, relay stopped");
                Err(e.into())
            }
            Err(e) => {
                error!(%e, "Relay stopped");
                Err(e.into())
            }
        }
    }
}
