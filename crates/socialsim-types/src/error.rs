use std::fmt;

use crate::run::RunStatus;

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Domain error taxonomy shared by every layer of the engine.
///
/// Repository implementations translate storage-engine failures into this
/// taxonomy; the LLM layer converts its own error type via `From`.
#[derive(Debug)]
pub enum Error {
    /// Malformed caller input (empty ids, zero counts, unknown names)
    InvalidInput(String),

    /// An action-rule invariant was violated (duplicate or replayed targets,
    /// too many agents without feeds)
    InvariantViolation(String),

    /// Lookup by run_id missed
    RunNotFound { run_id: String },

    /// Lifecycle transition not allowed by the run state machine
    InvalidTransition {
        run_id: String,
        current: RunStatus,
        target: RunStatus,
        valid: Vec<RunStatus>,
    },

    /// Create-run write failed; no run row exists
    RunCreation { run_id: String, reason: String },

    /// Status write failed at the storage layer
    RunStatusUpdate { run_id: String, reason: String },

    /// Re-write of existing (run_id, turn_number) metadata
    DuplicateTurnMetadata { run_id: String, turn_number: u32 },

    /// Agent factory returned fewer agents than requested
    InsufficientAgents { requested: usize, available: usize },

    /// Agent handle uniqueness violation
    HandleAlreadyExists { handle: String },

    /// Any failure during a run after creation; chains the original cause
    RunFailure {
        run_id: Option<String>,
        source: Box<Error>,
    },

    /// A required metric could not be computed
    MetricsComputation {
        metric_key: String,
        run_id: String,
        turn_number: Option<u32>,
        reason: String,
    },

    /// Database schema version does not match this build
    SchemaMismatch { found: i32, expected: i32 },

    /// Storage-engine failure not covered by the variants above
    Storage(String),

    /// Terminal LLM failure (or a transient one after retries were exhausted)
    Llm(String),
}

impl Error {
    /// Wrap a storage-engine error message into the domain taxonomy
    pub fn storage(err: impl fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }

    /// Wrap a failure that happened inside a run, preserving the cause
    pub fn run_failure(run_id: Option<String>, source: Error) -> Self {
        Error::RunFailure {
            run_id,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "{}", msg),
            Error::InvariantViolation(msg) => write!(f, "{}", msg),
            Error::RunNotFound { run_id } => write!(f, "Run '{}' not found", run_id),
            Error::InvalidTransition {
                run_id,
                current,
                target,
                valid,
            } => {
                let transitions = if valid.is_empty() {
                    "none (terminal state)".to_string()
                } else {
                    valid
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                write!(
                    f,
                    "Invalid status transition for run '{}': {} -> {}. Valid transitions from {} are: {}",
                    run_id, current, target, current, transitions
                )
            }
            Error::RunCreation { run_id, reason } => {
                write!(f, "Failed to create run '{}': {}", run_id, reason)
            }
            Error::RunStatusUpdate { run_id, reason } => {
                write!(f, "Failed to update run status for '{}': {}", run_id, reason)
            }
            Error::DuplicateTurnMetadata {
                run_id,
                turn_number,
            } => write!(
                f,
                "Turn metadata already exists for run '{}', turn {}",
                run_id, turn_number
            ),
            Error::InsufficientAgents {
                requested,
                available,
            } => write!(
                f,
                "Not enough agents: requested {}, but only {} available",
                requested, available
            ),
            Error::HandleAlreadyExists { handle } => {
                write!(f, "Handle '{}' already exists", handle)
            }
            Error::RunFailure { run_id, source } => match run_id {
                Some(run_id) => write!(f, "Simulation run '{}' failed: {}", run_id, source),
                None => write!(
                    f,
                    "Simulation run failed before a run id was assigned: {}",
                    source
                ),
            },
            Error::MetricsComputation {
                metric_key,
                run_id,
                turn_number,
                reason,
            } => match turn_number {
                Some(turn) => write!(
                    f,
                    "Failed to compute metric '{}' for run '{}', turn {}: {}",
                    metric_key, run_id, turn, reason
                ),
                None => write!(
                    f,
                    "Failed to compute metric '{}' for run '{}': {}",
                    metric_key, run_id, reason
                ),
            },
            Error::SchemaMismatch { found, expected } => write!(
                f,
                "Database schema version {} does not match expected version {}; refusing to run",
                found, expected
            ),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Llm(msg) => write!(f, "LLM error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::RunFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
