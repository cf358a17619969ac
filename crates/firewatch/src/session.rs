// ── Gateway session registry ──
//
// Tracks live dashboard connections. Each entry holds the session's
// cancellation token, a child of the server-wide shutdown token, so one
// cancel at shutdown reaches every engine subscription.

use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use firewatch_core::SessionId;

#[derive(Debug)]
struct SessionEntry {
    cancel: CancellationToken,
    connected_at: Instant,
}

/// Registry of live stream sessions.
#[derive(Debug)]
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    shutdown: CancellationToken,
    send_queue: usize,
}

impl SessionManager {
    pub fn new(send_queue: usize, shutdown: CancellationToken) -> Self {
        Self {
            sessions: DashMap::new(),
            shutdown,
            send_queue: send_queue.max(1),
        }
    }

    /// Register a new connection and hand back its id and token.
    pub fn register(&self) -> (SessionId, CancellationToken) {
        let id = SessionId::new();
        let cancel = self.shutdown.child_token();
        self.sessions.insert(
            id,
            SessionEntry {
                cancel: cancel.clone(),
                connected_at: Instant::now(),
            },
        );
        debug!(session_id = %id, live = self.sessions.len(), "session registered");
        (id, cancel)
    }

    /// Drop a session. Cancels its token if still live.
    pub fn unregister(&self, id: &SessionId) {
        if let Some((_, entry)) = self.sessions.remove(id) {
            entry.cancel.cancel();
            info!(
                session_id = %id,
                connected_secs = entry.connected_at.elapsed().as_secs(),
                "session closed"
            );
        }
    }

    /// Cancel one session without removing it; its connection task
    /// unregisters once teardown completes.
    pub fn cancel(&self, id: &SessionId) -> bool {
        self.sessions
            .get(id)
            .map(|entry| entry.cancel.cancel())
            .is_some()
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Capacity of each client's outbound queue.
    pub fn send_queue(&self) -> usize {
        self.send_queue
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let manager = SessionManager::new(8, CancellationToken::new());
        let (a, token_a) = manager.register();
        let (b, _) = manager.register();
        assert_ne!(a, b);
        assert_eq!(manager.count(), 2);

        manager.unregister(&a);
        assert!(token_a.is_cancelled());
        assert_eq!(manager.count(), 1);
        assert!(!manager.contains(&a));

        // Second unregister is a no-op.
        manager.unregister(&a);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn shutdown_cancels_every_session() {
        let root = CancellationToken::new();
        let manager = SessionManager::new(8, root.clone());
        let tokens: Vec<_> = (0..5).map(|_| manager.register().1).collect();

        root.cancel();
        assert!(manager.is_shutting_down());
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
    }

    #[test]
    fn cancel_one_session() {
        let manager = SessionManager::new(0, CancellationToken::new());
        let (a, token_a) = manager.register();
        let (_, token_b) = manager.register();

        assert!(manager.cancel(&a));
        assert!(token_a.is_cancelled());
        assert!(!token_b.is_cancelled());
        assert!(!manager.cancel(&SessionId::new()));
        assert_eq!(manager.send_queue(), 1);
    }
}
