use std::{fmt::Display, io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};
use uuid::Uuid;

/// The write half of a client connection, type erased.
pub(crate) type ClientWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Identifies one connected client for as long as it is connected.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientId(Uuid);

impl ClientId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a client connected from.
/// Only used for logging.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PeerAddr(Arc<str>);

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string().into())
    }
}

impl From<&str> for PeerAddr {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handle to a connected client, able to send it bytes.
///
/// The owning session holds one, the registry holds a clone so that
/// the broadcast loop can reach the client.
#[derive(Clone)]
pub struct ClientHandle {
    id: ClientId,
    peer: PeerAddr,
    writer: Arc<Mutex<ClientWriter>>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl Display for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.peer)
    }
}

impl ClientHandle {
    pub(crate) fn new(peer: PeerAddr, writer: ClientWriter) -> Self {
        Self {
            id: ClientId::new(),
            peer,
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// This client's id.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Write the whole chunk to the client.
    ///
    /// If a deadline is given and the write does not complete within it,
    /// the write is abandoned with [`io::ErrorKind::TimedOut`].
    /// Part of the chunk may have reached the client in that case.
    pub async fn send(&self, chunk: &[u8], deadline: Option<Duration>) -> io::Result<()> {
        let write = async {
            let mut writer = self.writer.lock().await;
            writer.write_all(chunk).await?;
            writer.flush().await
        };

        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, write)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "client write timed out"))?,
            None => write.await,
        }
    }

    /// Shut down the write direction of the connection.
    pub(crate) async fn close(&self) -> io::Result<()> {
        self.writer.lock().await.shutdown().await
    }
}
