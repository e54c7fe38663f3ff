//! In-memory database worlds for integration tests.

use std::sync::Arc;

use anyhow::Result;

use socialsim_store::Database;
use socialsim_types::{Agent, AgentRepository, FeedPostRepository, Post};

/// Open an in-memory store with the schema applied
pub fn in_memory_store() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("in-memory store should open"))
}

/// Seed the post corpus
pub fn seed_posts(db: &Database, posts: &[Post]) -> Result<()> {
    db.write_posts(posts)?;
    Ok(())
}

/// Seed the agent roster
pub fn seed_agents(db: &Database, agents: &[Agent]) -> Result<()> {
    for agent in agents {
        db.write_agent(agent)?;
    }
    Ok(())
}
