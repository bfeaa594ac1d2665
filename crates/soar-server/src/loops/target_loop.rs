//! Periodic AAT target optimisation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::config::Config;
use crate::state::AppState;

/// Start the target optimisation loop. Runs only while the behaviour has
/// automatic optimisation enabled and the task has area points.
pub async fn run_target_loop(state: Arc<AppState>, config: Config) {
    let mut ticker = interval(Duration::from_secs(config.optimise_interval_s));

    loop {
        ticker.tick().await;

        if !state.optimisation_due().await {
            continue;
        }

        let results = state.optimise_targets().await;
        let optimised = results.iter().filter(|r| r.is_ok()).count();
        tracing::debug!(
            optimised,
            failed = results.len() - optimised,
            "target optimisation pass"
        );
    }
}
