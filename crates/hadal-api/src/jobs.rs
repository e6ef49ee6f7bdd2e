//! Background maintenance jobs.

use std::time::Duration;

use chrono::Utc;
use hadal_db::SharedStore;
use tokio::{task::JoinHandle, time::interval};

/// How often expired audio is purged.
const AUDIO_PURGE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Delay before the first purge to stay out of the way of startup.
const AUDIO_PURGE_INITIAL_DELAY: Duration = Duration::from_secs(10 * 60);

/// Start all background jobs. The handles can be aborted on shutdown.
pub fn start_background_jobs(store: SharedStore, audio_ttl_days: i64) -> Vec<JoinHandle<()>> {
    vec![tokio::spawn(periodic_audio_cache_purge(store, audio_ttl_days))]
}

async fn periodic_audio_cache_purge(store: SharedStore, ttl_days: i64) {
    tokio::time::sleep(AUDIO_PURGE_INITIAL_DELAY).await;

    let mut interval = interval(AUDIO_PURGE_INTERVAL);

    loop {
        interval.tick().await;

        match purge_expired_audio(&store, ttl_days).await {
            Ok(0) => tracing::debug!("Audio cache purge: nothing expired"),
            Ok(deleted) => tracing::info!(deleted, ttl_days, "Purged expired audio clips"),
            Err(e) => tracing::error!(error = %e, "Failed to purge expired audio clips"),
        }
    }
}

/// Delete clips older than `ttl_days`. Returns the number removed.
pub async fn purge_expired_audio(
    store: &SharedStore,
    ttl_days: i64,
) -> Result<u64, hadal_db::StoreError> {
    let cutoff = Utc::now() - chrono::Duration::days(ttl_days.max(0));
    store.purge_audio_before(cutoff).await
}
