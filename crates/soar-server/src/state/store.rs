//! In-memory task state shared by the calculation loops and the API.
//!
//! One `TaskManager` lives behind a single `RwLock`. Incoming fixes are
//! queued on a bounded channel and applied by the calculation loop in
//! batches under one write lease, so readers always see a task that has
//! fully processed some prefix of the fix stream.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use soar_core::{
    AircraftState, OptimiseFailure, OptimisedTarget, OrderedTask, TaskBehaviour, TaskDefinition,
    TaskError, TaskEvent, TaskManager, TaskStats, ValidationError,
};
use tokio::sync::{mpsc, RwLock};
use tokio::sync::mpsc::error::TrySendError;

/// Number of task events kept for `/v1/events`.
const EVENT_HISTORY: usize = 256;

pub type FixReceiver = mpsc::Receiver<AircraftState>;

#[derive(Debug, Clone, Serialize)]
pub struct TimedEvent {
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TaskEvent,
}

/// Why a fix could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
    Closed,
}

pub struct AppState {
    manager: RwLock<TaskManager>,
    fixes: mpsc::Sender<AircraftState>,
    events: std::sync::Mutex<VecDeque<TimedEvent>>,
}

impl AppState {
    /// Create the state and the receiving end of its fix queue.
    pub fn new(manager: TaskManager, queue_capacity: usize) -> (Arc<Self>, FixReceiver) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let state = Arc::new(Self {
            manager: RwLock::new(manager),
            fixes: tx,
            events: std::sync::Mutex::new(VecDeque::with_capacity(EVENT_HISTORY)),
        });
        (state, rx)
    }

    /// Queue a fix for the next calculation tick.
    pub fn submit_fix(&self, fix: AircraftState) -> Result<(), QueueError> {
        self.fixes.try_send(fix).map_err(|err| match err {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Apply a batch of fixes in time order under one write lease.
    ///
    /// Fixes not newer than the last applied fix are skipped.
    pub async fn apply_fixes(&self, fixes: &[AircraftState]) -> Vec<TaskEvent> {
        let mut manager = self.manager.write().await;
        let mut last_time = manager.last_state().map(|s| s.time_s);
        let mut events = Vec::new();
        for fix in fixes {
            if last_time.is_some_and(|t| fix.time_s <= t) {
                tracing::debug!(time_s = fix.time_s, "stale fix skipped");
                continue;
            }
            last_time = Some(fix.time_s);
            events.extend(manager.update(fix));
        }
        drop(manager);
        self.record_events(&events);
        events
    }

    fn record_events(&self, events: &[TaskEvent]) {
        if events.is_empty() {
            return;
        }
        let now = Utc::now();
        if let Ok(mut history) = self.events.lock() {
            for event in events {
                if history.len() == EVENT_HISTORY {
                    history.pop_front();
                }
                history.push_back(TimedEvent {
                    received_at: now,
                    event: event.clone(),
                });
            }
        }
    }

    pub fn recent_events(&self) -> Vec<TimedEvent> {
        self.events
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn stats(&self) -> TaskStats {
        self.manager.read().await.stats().clone()
    }

    pub async fn behaviour(&self) -> TaskBehaviour {
        self.manager.read().await.behaviour().clone()
    }

    pub async fn task_definition(&self) -> TaskDefinition {
        TaskDefinition::from_task(self.manager.read().await.task())
    }

    /// Snapshot of the task for read-only callers.
    pub async fn task(&self) -> OrderedTask {
        self.manager.read().await.task().clone()
    }

    /// True when automatic optimisation is enabled and an area task is under way.
    pub async fn optimisation_due(&self) -> bool {
        let manager = self.manager.read().await;
        let task = manager.task();
        manager.behaviour().optimise_targets
            && task.has_area_points()
            && task.is_started()
            && !task.is_finished()
    }

    /// Validate and install a new task. Returns advisory warnings.
    pub async fn set_task(&self, task: OrderedTask) -> Result<Vec<ValidationError>, TaskError> {
        let warnings = self.manager.write().await.set_task(task)?;
        if let Ok(mut history) = self.events.lock() {
            history.clear();
        }
        Ok(warnings)
    }

    pub async fn reset(&self) {
        self.manager.write().await.reset();
        tracing::info!("task progress reset");
    }

    /// Set the MacCready value and return the value in effect.
    pub async fn set_mc(&self, mc_mps: f64) -> f64 {
        let mut manager = self.manager.write().await;
        manager.set_mc(mc_mps);
        manager.polar().mc()
    }

    pub async fn optimise_targets(&self) -> Vec<Result<OptimisedTarget, OptimiseFailure>> {
        self.manager.write().await.optimise_targets()
    }

    pub async fn adjust_aat_range(&self) -> Result<Option<f64>, TaskError> {
        self.manager.write().await.adjust_aat_range()
    }
}
