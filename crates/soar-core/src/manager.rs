//! Task manager: the single owner of task, behaviour, polar and latest stats.
//!
//! Applications hold one `TaskManager` behind a lock and feed it fixes.

use crate::aat::{self, OptimisedTarget};
use crate::behaviour::TaskBehaviour;
use crate::error::{OptimiseFailure, TaskError};
use crate::factory::{has_blocking_errors, ValidationError};
use crate::glide::GlidePolar;
use crate::state::AircraftState;
use crate::stats::TaskStats;
use crate::task::{OrderedTask, TaskEvent};
use tracing::info;

#[derive(Debug, Clone)]
pub struct TaskManager {
    behaviour: TaskBehaviour,
    polar: GlidePolar,
    task: OrderedTask,
    last_state: Option<AircraftState>,
    stats: TaskStats,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new(TaskBehaviour::default())
    }
}

impl TaskManager {
    pub fn new(behaviour: TaskBehaviour) -> Self {
        let polar = GlidePolar::new(behaviour.polar, behaviour.mc_mps);
        Self {
            task: OrderedTask::new(behaviour.contest_ruleset, Default::default()),
            behaviour,
            polar,
            last_state: None,
            stats: TaskStats::default(),
        }
    }

    pub fn behaviour(&self) -> &TaskBehaviour {
        &self.behaviour
    }

    pub fn set_behaviour(&mut self, behaviour: TaskBehaviour) {
        self.polar = GlidePolar::new(behaviour.polar, behaviour.mc_mps);
        self.behaviour = behaviour;
    }

    pub fn polar(&self) -> &GlidePolar {
        &self.polar
    }

    pub fn task(&self) -> &OrderedTask {
        &self.task
    }

    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    pub fn last_state(&self) -> Option<&AircraftState> {
        self.last_state.as_ref()
    }

    /// Replace the task after validating it against its ruleset.
    ///
    /// Blocking errors reject the task; warnings are returned.
    pub fn set_task(&mut self, task: OrderedTask) -> Result<Vec<ValidationError>, TaskError> {
        let errors = task.factory_type().factory().validate(&task);
        if has_blocking_errors(&errors) {
            return Err(TaskError::Invalid(errors));
        }
        info!(
            ruleset = ?task.factory_type(),
            points = task.len(),
            warnings = errors.len(),
            "task replaced"
        );
        self.task = task;
        self.last_state = None;
        self.refresh_stats();
        Ok(errors)
    }

    /// Mutable access for edits. Geometry is kept current by the task itself.
    pub fn task_mut(&mut self) -> &mut OrderedTask {
        &mut self.task
    }

    pub fn set_mc(&mut self, mc_mps: f64) {
        self.polar.set_mc(mc_mps);
        self.behaviour.mc_mps = self.polar.mc();
        self.refresh_stats();
    }

    /// Return the task to its initial state. The next fix may carry any
    /// time, so a flight can be replayed from the beginning.
    pub fn reset(&mut self) {
        self.task.reset();
        self.last_state = None;
        self.refresh_stats();
    }

    /// Process one fix: transitions, samples, then statistics.
    pub fn update(&mut self, state: &AircraftState) -> Vec<TaskEvent> {
        let mut events = self.task.check_transitions(state, &self.behaviour);
        self.task.update_samples(state);
        self.last_state = Some(*state);

        let was_final_glide = self.stats.final_glide;
        self.stats = self.task.compute_stats(state, &self.polar, &self.behaviour);
        if self.stats.final_glide != was_final_glide {
            info!(final_glide = self.stats.final_glide, "final glide changed");
            events.push(TaskEvent::FinalGlideChanged {
                final_glide: self.stats.final_glide,
            });
        }
        events
    }

    fn refresh_stats(&mut self) {
        if let Some(state) = self.last_state {
            self.stats = self.task.compute_stats(&state, &self.polar, &self.behaviour);
        } else {
            self.stats = TaskStats::default();
        }
    }

    /// Optimise every free area target from the last fix.
    pub fn optimise_targets(&mut self) -> Vec<Result<OptimisedTarget, OptimiseFailure>> {
        let Some(state) = self.last_state else {
            return Vec::new();
        };
        let results = aat::optimise_targets(&mut self.task, &state, &self.polar, &self.behaviour);
        self.refresh_stats();
        results
    }

    /// Spread free area targets so the planned time meets the AAT minimum time.
    pub fn adjust_aat_range(&mut self) -> Result<Option<f64>, TaskError> {
        let Some(state) = self.last_state else {
            return Ok(None);
        };
        let range = aat::adjust_aat_range(&mut self.task, &state, &self.polar, &self.behaviour);
        self.refresh_stats();
        range
    }
}
