//! Background job: purge expired login sessions.
//!
//! Sessions are only checked for expiry at lookup time, so rows for
//! browsers that never came back would otherwise accumulate forever.

use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::store::sqlite::SqliteStore;

/// Spawn the hourly purge task. Call this once at startup.
pub fn spawn_session_purge(db: SqliteStore) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match db.delete_expired_sessions(Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "expired sessions removed"),
                Err(e) => tracing::error!("session purge failed: {}", e),
            }
        }
    });
}
