//! Periodic expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::session::SessionStore;

/// Background task calling [`SessionStore::delete_expired`] at a fixed period.
///
/// Stopped by [`Sweeper::stop`] or when dropped.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(store: Arc<SessionStore>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => match store.delete_expired() {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "expiry sweep finished"),
                        Err(e) => warn!(error = %e, "expiry sweep failed"),
                    },
                }
            }
            debug!("expiry sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the task to stop. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UnverifiedEngine;
    use crate::protocol::{DisclosureRequest, RequestorRequest, SessionRequest};
    use crate::session::{Session, SessionTimeouts, Token};

    fn expiring_session() -> Session {
        let request = RequestorRequest::new(SessionRequest::Disclosing(DisclosureRequest {
            disclose: vec![vec!["a.b.c.d".into()]],
        }));
        Session::new(
            Token::generate(),
            request,
            Arc::new(UnverifiedEngine),
            SessionTimeouts {
                lifetime: Duration::ZERO,
                client_timeout: None,
            },
        )
    }

    #[tokio::test]
    async fn test_sweeps_periodically() {
        let store = Arc::new(SessionStore::new());
        store.put(expiring_session()).unwrap();

        let sweeper = Sweeper::spawn(Arc::clone(&store), Duration::from_millis(10));
        for _ in 0..100 {
            if store.count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.count(), 0);
        sweeper.stop();
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let store = Arc::new(SessionStore::new());
        let sweeper = Sweeper::spawn(store, Duration::from_secs(3600));
        assert!(sweeper.is_running());

        sweeper.stop();
        sweeper.stop();
        for _ in 0..100 {
            if !sweeper.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!sweeper.is_running());
    }
}
