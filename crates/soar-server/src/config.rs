//! Server configuration from environment.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use soar_core::{TaskBehaviour, TaskDefinition};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Calculation loop tick in milliseconds
    pub calc_interval_ms: u64,
    /// Target optimisation loop period in seconds
    pub optimise_interval_s: u64,
    /// Maximum fixes queued between calculation ticks
    pub fix_queue_capacity: usize,
    pub behaviour_path: Option<PathBuf>,
    pub task_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SOAR_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            calc_interval_ms: env::var("SOAR_CALC_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(1000),
            optimise_interval_s: env::var("SOAR_OPTIMISE_INTERVAL_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(10),
            fix_queue_capacity: env::var("SOAR_FIX_QUEUE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1024),
            behaviour_path: env::var("SOAR_BEHAVIOUR_PATH").ok().map(PathBuf::from),
            task_path: env::var("SOAR_TASK_PATH").ok().map(PathBuf::from),
        }
    }

    /// Behaviour from `SOAR_BEHAVIOUR_PATH`, or the defaults.
    pub fn load_behaviour(&self) -> Result<TaskBehaviour> {
        let Some(path) = &self.behaviour_path else {
            return Ok(TaskBehaviour::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading behaviour from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing behaviour in {}", path.display()))
    }

    /// Startup task from `SOAR_TASK_PATH`, if configured.
    pub fn load_task(&self) -> Result<Option<TaskDefinition>> {
        let Some(path) = &self.task_path else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading task from {}", path.display()))?;
        let definition = TaskDefinition::from_json(&text)
            .with_context(|| format!("parsing task in {}", path.display()))?;
        Ok(Some(definition))
    }
}
