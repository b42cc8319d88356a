use std::{io, sync::Arc};

use futures::Stream;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};
use tracing::{info_span, Instrument};

use crate::{
    acceptor,
    broadcast::BroadcastLoop,
    client::PeerAddr,
    config::RelaySettings,
    error::Error,
    gate::SerialWriterGate,
    registry::ClientRegistry,
    serial,
};

/// Everything the tasks of one relay share:
/// the registered clients and the gate to the serial port.
///
/// Cheap to clone; clones refer to the same relay.
/// Several independent bridges may live in the same process.
#[derive(Debug, Clone)]
pub struct Bridge {
    registry: ClientRegistry,
    gate: Arc<SerialWriterGate>,
    settings: Arc<RelaySettings>,
}

impl Bridge {
    /// Set up a bridge for the given serial link.
    ///
    /// The link is split: writes go through the bridge's gate,
    /// reads belong to the returned [`BroadcastLoop`].
    pub fn new<S>(serial: S, settings: RelaySettings) -> (Self, BroadcastLoop)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = serial::split(serial);

        let bridge = Self {
            registry: ClientRegistry::new(),
            gate: Arc::new(SerialWriterGate::new(writer)),
            settings: Arc::new(settings),
        };

        let broadcast =
            BroadcastLoop::new(reader, bridge.registry.clone(), bridge.settings.clone());

        (bridge, broadcast)
    }

    /// The clients currently receiving broadcasts.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The gate all serial writes go through.
    pub fn gate(&self) -> &SerialWriterGate {
        &self.gate
    }

    /// The relay settings.
    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Run the relay.
    ///
    /// The broadcast loop gets a task of its own, and every connection
    /// yielded by `incoming` gets a session.
    ///
    /// Returns when the serial port is lost, with the reason.
    /// All sessions are ended at that point.
    /// Dropping the returned future ends the broadcast task and all sessions.
    pub async fn run<St, C>(self, broadcast: BroadcastLoop, incoming: St) -> Result<(), Error>
    where
        St: Stream<Item = io::Result<(C, PeerAddr)>> + Unpin,
        C: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut broadcast_task = JoinSet::new();
        broadcast_task.spawn(broadcast.run().instrument(info_span!("broadcast")));

        let joined = tokio::select! {
            joined = broadcast_task.join_next() => joined,
            () = acceptor::run(&self, incoming) => None,
        };

        let joined = match joined {
            Some(joined) => joined,
            None => broadcast_task
                .join_next()
                .await
                .ok_or_else(|| Error::InternalIssue("Broadcast task missing".into()))?,
        };

        joined.map_err(|e| Error::InternalIssue(format!("Broadcast task failed: {e}")))?
    }
}
