//! Run orchestration: the command service that drives a configured run
//! through its turns, the metric computations persisted with each turn,
//! and the read-only query surface.

mod agents;
mod command;
mod config;
mod metrics;
mod query;

pub use agents::{AgentFactory, RosterAgentFactory, StaticAgentFactory};
pub use command::{HistoryFactory, SimulationCommandService, SimulationDeps, Sleeper};
pub use config::{
    DATABASE_URL_ENV, DB_PATH_ENV, EnvConfig, LOCAL_ENV, LOCAL_RESET_DB_ENV,
};
pub use metrics::{compute_run_metrics, compute_turn_metrics};
pub use query::SimulationQueryService;
