use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Feed algorithm used when a run config does not name one explicitly
pub const DEFAULT_FEED_ALGORITHM: &str = "chronological";

/// Lifecycle state of a simulation run.
///
/// Valid transitions:
///   - RUNNING -> COMPLETED: normal successful completion
///   - RUNNING -> FAILED: error or interruption during the simulation
///
/// COMPLETED and FAILED are terminal. Self-transitions are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(Error::InvalidInput(format!(
                "Unknown run status: '{}'",
                other
            ))),
        }
    }

    /// Targets reachable from this status. Self-transitions are no-ops and
    /// are not listed.
    pub fn valid_transitions(&self) -> &'static [RunStatus] {
        match self {
            RunStatus::Running => &[RunStatus::Completed, RunStatus::Failed],
            RunStatus::Completed => &[],
            RunStatus::Failed => &[],
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking a lifecycle transition against the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition is allowed and should be applied
    Apply,
    /// Current and target status are equal; nothing to do
    NoOp,
}

/// Check a run status transition against the state machine.
///
/// Self-transitions return `Transition::NoOp`. Anything not in
/// `current.valid_transitions()` is an `InvalidTransition` error carrying
/// the offending pair and the valid targets.
pub fn check_status_transition(
    run_id: &str,
    current: RunStatus,
    target: RunStatus,
) -> Result<Transition> {
    if current == target {
        return Ok(Transition::NoOp);
    }
    if current.valid_transitions().contains(&target) {
        Ok(Transition::Apply)
    } else {
        Err(Error::InvalidTransition {
            run_id: run_id.to_string(),
            current,
            target,
            valid: current.valid_transitions().to_vec(),
        })
    }
}

/// Configuration for a simulation run (transient request DTO)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub num_agents: u32,
    pub num_turns: u32,
    pub feed_algorithm: String,
    #[serde(default)]
    pub feed_algorithm_config: Option<serde_json::Map<String, serde_json::Value>>,
    /// Metric names computed per turn and per run; defaulted when absent
    #[serde(default)]
    pub metric_keys: Option<Vec<String>>,
}

impl RunConfig {
    pub fn new(num_agents: u32, num_turns: u32, feed_algorithm: impl Into<String>) -> Self {
        Self {
            num_agents,
            num_turns,
            feed_algorithm: feed_algorithm.into(),
            feed_algorithm_config: None,
            metric_keys: None,
        }
    }

    /// Reject invalid configs before any write happens
    pub fn validate(&self) -> Result<()> {
        if self.num_agents == 0 {
            return Err(Error::InvalidInput(
                "num_agents must be greater than zero".to_string(),
            ));
        }
        if self.num_turns == 0 {
            return Err(Error::InvalidInput(
                "num_turns must be greater than zero".to_string(),
            ));
        }
        if self.feed_algorithm.trim().is_empty() {
            return Err(Error::InvalidInput(
                "feed_algorithm cannot be empty".to_string(),
            ));
        }
        if let Some(keys) = &self.metric_keys {
            if keys.is_empty() {
                return Err(Error::InvalidInput(
                    "metric_keys cannot be empty when provided".to_string(),
                ));
            }
            if keys.iter().any(|key| key.trim().is_empty()) {
                return Err(Error::InvalidInput(
                    "metric_keys cannot contain empty names".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A durable simulation run.
///
/// Created when run execution starts; mutated only by lifecycle
/// transitions; never deleted. `completed_at` is present exactly when the
/// status is COMPLETED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub created_at: String,
    pub total_turns: u32,
    pub total_agents: u32,
    pub feed_algorithm: String,
    #[serde(default)]
    pub feed_algorithm_config: Option<serde_json::Map<String, serde_json::Value>>,
    pub metric_keys: Vec<String>,
    pub started_at: String,
    pub status: RunStatus,
    #[serde(default)]
    pub completed_at: Option<String>,
}
