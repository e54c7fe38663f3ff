use rusqlite::Connection;

use socialsim_types::{Error, Result};

// Schema version (increment when changing table definitions)
pub const SCHEMA_VERSION: i32 = 1;

/// Apply the schema to a fresh database or verify an existing one.
///
/// A database whose `user_version` is neither 0 (fresh) nor the current
/// version is refused with `SchemaMismatch`; the engine never runs against
/// a schema it does not understand.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(Error::storage)?;

    if current_version != 0 && current_version != SCHEMA_VERSION {
        return Err(Error::SchemaMismatch {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            total_turns INTEGER NOT NULL CHECK (total_turns > 0),
            total_agents INTEGER NOT NULL CHECK (total_agents > 0),
            feed_algorithm TEXT NOT NULL,
            feed_algorithm_config TEXT,
            metric_keys TEXT NOT NULL,
            started_at TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('running', 'completed', 'failed')),
            completed_at TEXT,
            CHECK (status != 'completed' OR completed_at >= started_at)
        );

        CREATE TABLE IF NOT EXISTS turn_metadata (
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            total_actions TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (run_id, turn_number)
        );

        CREATE TABLE IF NOT EXISTS turn_metrics (
            run_id TEXT NOT NULL,
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            metrics TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (run_id, turn_number)
        );

        CREATE TABLE IF NOT EXISTS run_metrics (
            run_id TEXT PRIMARY KEY,
            metrics TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS feed_posts (
            post_id TEXT PRIMARY KEY,
            source TEXT NOT NULL CHECK (source IN ('bluesky', 'ai_generated')),
            uri TEXT NOT NULL,
            author_handle TEXT NOT NULL,
            author_display_name TEXT NOT NULL,
            text TEXT NOT NULL,
            bookmark_count INTEGER NOT NULL DEFAULT 0 CHECK (bookmark_count >= 0),
            like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            quote_count INTEGER NOT NULL DEFAULT 0 CHECK (quote_count >= 0),
            reply_count INTEGER NOT NULL DEFAULT 0 CHECK (reply_count >= 0),
            repost_count INTEGER NOT NULL DEFAULT 0 CHECK (repost_count >= 0),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS generated_feeds (
            feed_id TEXT NOT NULL,
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            agent_handle TEXT NOT NULL,
            post_ids TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (agent_handle, run_id, turn_number)
        );

        CREATE TABLE IF NOT EXISTS likes (
            like_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            agent_handle TEXT NOT NULL,
            post_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            explanation TEXT,
            model_used TEXT,
            generation_metadata_json TEXT,
            generation_created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
            comment_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            agent_handle TEXT NOT NULL,
            post_id TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            explanation TEXT,
            model_used TEXT,
            generation_metadata_json TEXT,
            generation_created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS follows (
            follow_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            turn_number INTEGER NOT NULL CHECK (turn_number >= 0),
            agent_handle TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            explanation TEXT,
            model_used TEXT,
            generation_metadata_json TEXT,
            generation_created_at TEXT
        );

        CREATE TABLE IF NOT EXISTS agents (
            agent_id TEXT PRIMARY KEY,
            handle TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            persona_source TEXT NOT NULL CHECK (persona_source IN ('user_generated', 'sync_bluesky')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS agent_bios (
            bio_id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL REFERENCES agents(agent_id),
            persona_bio TEXT NOT NULL,
            source TEXT NOT NULL CHECK (source IN ('ai_generated', 'user_provided')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_feeds_run_turn ON generated_feeds(run_id, turn_number);
        CREATE INDEX IF NOT EXISTS idx_likes_run_turn ON likes(run_id, turn_number);
        CREATE INDEX IF NOT EXISTS idx_likes_run_turn_agent ON likes(run_id, turn_number, agent_handle);
        CREATE INDEX IF NOT EXISTS idx_comments_run_turn ON comments(run_id, turn_number);
        CREATE INDEX IF NOT EXISTS idx_comments_run_turn_agent ON comments(run_id, turn_number, agent_handle);
        CREATE INDEX IF NOT EXISTS idx_follows_run_turn ON follows(run_id, turn_number);
        CREATE INDEX IF NOT EXISTS idx_follows_run_turn_agent ON follows(run_id, turn_number, agent_handle);
        CREATE INDEX IF NOT EXISTS idx_bios_agent ON agent_bios(agent_id, created_at DESC);
        "#,
    )
    .map_err(Error::storage)?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])
        .map_err(Error::storage)?;

    Ok(())
}
