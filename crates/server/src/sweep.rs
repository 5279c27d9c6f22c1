//! Background rig cache sweeper.

use crate::metrics;
use crate::state::AppState;
use tokio::time::MissedTickBehavior;

/// Periodically evict cache entries older than the configured TTL.
///
/// Spawned at startup when `[cache].auto_sweep` is on; the admin sweep
/// endpoint drives the same eviction on demand. Runs until the process
/// exits.
pub async fn run_cache_sweeper(state: AppState) {
    let mut ticker = tokio::time::interval(state.config.cache.sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so startup is quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let evicted = state.rig_cache.evict_expired(state.config.cache.ttl()).await;
        if evicted > 0 {
            metrics::CACHE_EVICTIONS.inc_by(evicted as u64);
            tracing::info!(evicted, "cache sweep reclaimed expired rigs");
        } else {
            tracing::debug!("cache sweep found nothing to evict");
        }

        state.session_locks.prune().await;
    }
}
