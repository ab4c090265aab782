use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::SessionStore;

/// How often idle sessions are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that closes sessions idle for longer than the store's TTL.
///
/// Runs until aborted through the returned handle.
pub fn start_reaper(sessions: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle().await;
            if evicted > 0 {
                tracing::info!(evicted, "Session reaper: closed idle sessions");
            } else {
                tracing::debug!("Session reaper: nothing to close");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_closes_idle_sessions() {
        let ttl = Duration::from_secs(300);
        let sessions = Arc::new(SessionStore::new(10, ttl));
        sessions.create(Value::Null).await.unwrap();

        let handle = start_reaper(Arc::clone(&sessions), Duration::from_secs(30));

        tokio::time::sleep(ttl / 2).await;
        assert_eq!(sessions.open_count().await, 1);

        tokio::time::sleep(ttl).await;
        assert_eq!(sessions.open_count().await, 0);

        handle.abort();
    }
}
