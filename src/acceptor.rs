use std::io;

use futures::{Stream, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::{bridge::Bridge, client::PeerAddr, session};

/// Spawn a session for every incoming connection.
///
/// A failed accept is logged and skipped.
/// When `incoming` ends, this waits for the remaining sessions to finish.
///
/// Sessions live in a [`JoinSet`] owned by this future:
/// dropping the future ends them all.
pub(crate) async fn run<St, C>(bridge: &Bridge, mut incoming: St)
where
    St: Stream<Item = io::Result<(C, PeerAddr)>> + Unpin,
    C: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            accepted = incoming.next() => match accepted {
                Some(Ok((connection, peer))) => {
                    let span = info_span!("client", %peer);
                    sessions.spawn(session::run(bridge.clone(), connection, peer).instrument(span));
                }
                Some(Err(e)) => {
                    warn!(?e, "Error accepting");
                }
                None => break,
            },
            Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                reap(finished);
            }
        }
    }

    warn!("No longer accepting clients, relaying for existing ones only");

    while let Some(finished) = sessions.join_next().await {
        reap(finished);
    }
}

fn reap(finished: Result<session::SessionEnd, tokio::task::JoinError>) {
    match finished {
        Ok(end) => debug!(%end, "Session ended"),
        Err(e) => error!(?e, "Session task failed"),
    }
}
