use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::trace;

use crate::client::{ClientHandle, ClientId};

/// The clients currently eligible to receive broadcasts.
///
/// Cheap to clone, all clones share the same set.
/// The lock is only ever held for in-memory work, never across I/O.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<ClientId, ClientHandle>>>,
}

impl ClientRegistry {
    /// A new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, ClientHandle>> {
        // Nothing in here can panic halfway through a mutation,
        // so the map is sound even if some other holder panicked.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a client.
    /// Adding the same client twice keeps a single entry.
    ///
    /// Returns how many clients are registered afterwards.
    pub fn add(&self, client: ClientHandle) -> usize {
        let mut clients = self.lock();
        clients.insert(client.id(), client);
        clients.len()
    }

    /// Remove a client, if present.
    pub fn remove(&self, id: &ClientId) -> Option<ClientHandle> {
        self.lock().remove(id)
    }

    /// A copy of the currently registered clients.
    ///
    /// The copy is detached from the live set, so clients may come and go
    /// while it is being iterated. Members may also have disconnected by the
    /// time they are written to.
    pub fn snapshot(&self) -> Vec<ClientHandle> {
        self.lock().values().cloned().collect()
    }

    /// Add a client and get a guard which removes it again when dropped.
    ///
    /// Returns the guard and how many clients are registered afterwards.
    pub fn register(&self, client: ClientHandle) -> (Registration, usize) {
        let id = client.id();
        let count = self.add(client);

        (
            Registration {
                registry: self.clone(),
                id,
            },
            count,
        )
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Is the given client registered?
    pub fn contains(&self, id: &ClientId) -> bool {
        self.lock().contains_key(id)
    }
}

/// Keeps a client registered for as long as it lives.
#[derive(Debug)]
pub struct Registration {
    registry: ClientRegistry,
    id: ClientId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            trace!(%self.id, "Deregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;

    fn client(name: &str) -> ClientHandle {
        ClientHandle::new(name.into(), Box::new(tokio::io::sink()))
    }

    #[test]
    fn add_is_idempotent() {
        let registry = ClientRegistry::new();
        let c = client("a");

        assert_eq!(registry.add(c.clone()), 1);
        assert_eq!(registry.add(c.clone()), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&c.id()));
    }

    #[test]
    fn remove_missing_is_noop() {
        let registry = ClientRegistry::new();
        let c = client("a");

        assert!(registry.remove(&c.id()).is_none());

        registry.add(c.clone());
        assert!(registry.remove(&c.id()).is_some());
        assert!(registry.remove(&c.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = ClientRegistry::new();
        let a = client("a");
        let b = client("b");
        registry.add(a.clone());
        registry.add(b.clone());

        let snapshot = registry.snapshot();
        registry.remove(&a.id());
        registry.add(client("c"));

        let ids: HashSet<_> = snapshot.iter().map(ClientHandle::id).collect();
        assert_eq!(ids, HashSet::from([a.id(), b.id()]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registration_guard_deregisters() {
        let registry = ClientRegistry::new();
        let c = client("a");

        let (guard, count) = registry.register(c.clone());
        assert_eq!(count, 1);
        assert!(registry.contains(&c.id()));

        drop(guard);
        assert!(!registry.contains(&c.id()));
    }

    #[tokio::test]
    async fn aborted_task_still_deregisters() {
        let registry = ClientRegistry::new();
        let c = client("a");
        let id = c.id();

        let task_registry = registry.clone();
        let (registered_tx, registered_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            let _guard = task_registry.register(c);
            registered_tx.send(()).unwrap();
            futures::future::pending::<()>().await;
        });

        registered_rx.await.unwrap();
        assert!(registry.contains(&id));

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!registry.contains(&id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_churn_leaves_exactly_the_live_clients() {
        let registry = ClientRegistry::new();

        let mut tasks = vec![];
        for i in 0..64 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let c = client(&format!("client-{i}"));
                let (guard, _) = registry.register(c.clone());

                for _ in 0..10 {
                    let snapshot = registry.snapshot();
                    assert!(snapshot.iter().any(|s| s.id() == c.id()));
                    tokio::task::yield_now().await;
                }

                // Odd clients stay.
                if i % 2 == 1 {
                    std::mem::forget(guard);
                    Some(c.id())
                } else {
                    None
                }
            }));
        }

        let mut stayed = HashSet::new();
        for task in tasks {
            if let Some(id) = task.await.unwrap() {
                stayed.insert(id);
            }
        }

        let live: HashSet<_> = registry.snapshot().iter().map(ClientHandle::id).collect();
        assert_eq!(live, stayed);
        assert_eq!(registry.len(), 32);
    }
}
