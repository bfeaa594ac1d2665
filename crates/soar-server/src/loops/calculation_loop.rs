//! Per-fix task calculation loop.
//!
//! Drains the fix queue on every tick and applies the batch to the task
//! under a single write lease.

use std::sync::Arc;
use std::time::Duration;

use soar_core::{AircraftState, TaskEvent};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::interval;

use crate::config::Config;
use crate::state::{AppState, FixReceiver};

pub async fn run_calculation_loop(state: Arc<AppState>, mut fixes: FixReceiver, config: Config) {
    let mut ticker = interval(Duration::from_millis(config.calc_interval_ms));
    let mut pending = Vec::new();

    loop {
        ticker.tick().await;

        let open = drain_fixes(&mut fixes, &mut pending);
        if !pending.is_empty() {
            let events = state.apply_fixes(&pending).await;
            tracing::debug!(fixes = pending.len(), events = events.len(), "fixes applied");
            for event in &events {
                log_event(event);
            }
            pending.clear();
        }

        if !open {
            tracing::info!("Fix channel closed, calculation loop stopping");
            break;
        }
    }
}

/// Move every queued fix into `pending`, sorted by time.
///
/// Returns false once the sending side has gone away.
pub fn drain_fixes(fixes: &mut FixReceiver, pending: &mut Vec<AircraftState>) -> bool {
    let open = loop {
        match fixes.try_recv() {
            Ok(fix) => pending.push(fix),
            Err(TryRecvError::Empty) => break true,
            Err(TryRecvError::Disconnected) => break false,
        }
    };
    pending.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    open
}

fn log_event(event: &TaskEvent) {
    match event {
        TaskEvent::FinalGlideChanged { final_glide } => {
            tracing::info!(final_glide, "final glide status changed");
        }
        other => tracing::info!(event = ?other, "task event"),
    }
}
