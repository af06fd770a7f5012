use crate::services::session_store::SessionStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodically evicts expired sessions until shutdown is signalled.
pub struct SessionSweeper {
    sessions: SessionStore,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SessionSweeper {
    pub fn new(sessions: SessionStore, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            sessions,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Session sweeper started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Session sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep();
                }
            }
        }
    }

    fn sweep(&self) {
        let evicted = self.sessions.evict_expired();
        if evicted > 0 {
            tracing::info!("🧹 Evicted {} expired sessions ({} active)", evicted, self.sessions.len());
        }
    }
}
