//! SQLite persistence for the simulation engine.
//!
//! One `Database` owns the connection behind a lock, applies the versioned
//! schema on open, and implements every repository port. Row helpers take
//! `&Connection` so the same code serves self-committing calls and the
//! scoped transactions opened by `Database::with_transaction`.

mod actions;
mod agents;
mod db;
mod feeds;
mod metrics;
mod posts;
mod runs;
mod schema;

pub use db::Database;
pub use schema::SCHEMA_VERSION;
