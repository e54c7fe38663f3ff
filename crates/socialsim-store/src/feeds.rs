use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, params};

use socialsim_types::{Error, GeneratedFeed, GeneratedFeedRepository, Result};

use crate::db::Database;

fn feed_from_columns(
    feed_id: String,
    run_id: String,
    turn_number: u32,
    agent_handle: String,
    post_ids: String,
    created_at: String,
) -> Result<GeneratedFeed> {
    Ok(GeneratedFeed {
        feed_id,
        run_id,
        turn_number,
        agent_handle,
        post_ids: serde_json::from_str(&post_ids)
            .map_err(|e| Error::storage(format!("invalid post_ids: {}", e)))?,
        created_at,
    })
}

fn replace_feed(conn: &Connection, feed: &GeneratedFeed) -> Result<()> {
    conn.execute(
        "DELETE FROM generated_feeds \
         WHERE agent_handle = ?1 AND run_id = ?2 AND turn_number = ?3",
        params![&feed.agent_handle, &feed.run_id, feed.turn_number],
    )
    .map_err(Error::storage)?;
    let post_ids = serde_json::to_string(&feed.post_ids).map_err(Error::storage)?;
    conn.execute(
        "INSERT INTO generated_feeds \
         (feed_id, run_id, turn_number, agent_handle, post_ids, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &feed.feed_id,
            &feed.run_id,
            feed.turn_number,
            &feed.agent_handle,
            &post_ids,
            &feed.created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

impl GeneratedFeedRepository for Database {
    fn write_generated_feed(&self, feed: &GeneratedFeed) -> Result<()> {
        // Delete-then-insert keeps the write idempotent per composite key
        self.with_transaction(|tx| replace_feed(tx, feed))
    }

    fn read_generated_feed(
        &self,
        agent_handle: &str,
        run_id: &str,
        turn_number: u32,
    ) -> Result<Option<GeneratedFeed>> {
        self.with_conn(|conn| {
            let row: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT feed_id, post_ids, created_at FROM generated_feeds \
                     WHERE agent_handle = ?1 AND run_id = ?2 AND turn_number = ?3",
                    params![agent_handle, run_id, turn_number],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(Error::storage)?;
            row.map(|(feed_id, post_ids, created_at)| {
                feed_from_columns(
                    feed_id,
                    run_id.to_string(),
                    turn_number,
                    agent_handle.to_string(),
                    post_ids,
                    created_at,
                )
            })
            .transpose()
        })
    }

    fn read_feeds_for_turn(&self, run_id: &str, turn_number: u32) -> Result<Vec<GeneratedFeed>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT feed_id, agent_handle, post_ids, created_at FROM generated_feeds \
                     WHERE run_id = ?1 AND turn_number = ?2 ORDER BY agent_handle",
                )
                .map_err(Error::storage)?;
            let rows = stmt
                .query_map(params![run_id, turn_number], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<(String, String, String, String)>, _>>()
                .map_err(Error::storage)?;
            rows.into_iter()
                .map(|(feed_id, agent_handle, post_ids, created_at)| {
                    feed_from_columns(
                        feed_id,
                        run_id.to_string(),
                        turn_number,
                        agent_handle,
                        post_ids,
                        created_at,
                    )
                })
                .collect()
        })
    }

    fn seen_post_ids(&self, agent_handle: &str, run_id: &str) -> Result<HashSet<String>> {
        if agent_handle.trim().is_empty() {
            return Err(Error::InvalidInput(
                "agent_handle cannot be empty".to_string(),
            ));
        }
        if run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
        }
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT post_ids FROM generated_feeds \
                     WHERE agent_handle = ?1 AND run_id = ?2",
                )
                .map_err(Error::storage)?;
            let raw_lists = stmt
                .query_map(params![agent_handle, run_id], |row| row.get::<_, String>(0))
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(Error::storage)?;

            let mut seen = HashSet::new();
            for raw in raw_lists {
                let ids: Vec<String> = serde_json::from_str(&raw)
                    .map_err(|e| Error::storage(format!("invalid post_ids: {}", e)))?;
                seen.extend(ids);
            }
            Ok(seen)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialsim_types::{RunConfig, RunRepository, now_timestamp};

    fn feed(run_id: &str, turn: u32, agent: &str, post_ids: &[&str]) -> GeneratedFeed {
        GeneratedFeed {
            feed_id: format!("feed_{}_{}_{}", run_id, turn, agent),
            run_id: run_id.to_string(),
            turn_number: turn,
            agent_handle: agent.to_string(),
            post_ids: post_ids.iter().map(|s| s.to_string()).collect(),
            created_at: now_timestamp(),
        }
    }

    fn store_with_run() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let run = db.create_run(&RunConfig::new(2, 4, "chronological")).unwrap();
        (db, run.run_id)
    }

    #[test]
    fn upsert_replaces_existing_feed() {
        let (db, run_id) = store_with_run();

        db.write_generated_feed(&feed(&run_id, 0, "@a", &["bluesky:p1", "bluesky:p2"]))
            .unwrap();
        db.write_generated_feed(&feed(&run_id, 0, "@a", &["bluesky:p3"]))
            .unwrap();

        let feeds = db.read_feeds_for_turn(&run_id, 0).unwrap();
        assert_eq!(feeds.len(), 1, "exactly one row per composite key");
        assert_eq!(feeds[0].post_ids, vec!["bluesky:p3".to_string()]);
    }

    #[test]
    fn seen_post_ids_union_across_turns() {
        let (db, run_id) = store_with_run();

        db.write_generated_feed(&feed(&run_id, 0, "@a", &["bluesky:p1", "bluesky:p2"]))
            .unwrap();
        db.write_generated_feed(&feed(&run_id, 1, "@a", &["bluesky:p2", "bluesky:p3"]))
            .unwrap();
        db.write_generated_feed(&feed(&run_id, 0, "@b", &["bluesky:p9"]))
            .unwrap();

        let seen = db.seen_post_ids("@a", &run_id).unwrap();
        let expected: HashSet<String> = ["bluesky:p1", "bluesky:p2", "bluesky:p3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn read_single_feed_by_composite_key() {
        let (db, run_id) = store_with_run();
        db.write_generated_feed(&feed(&run_id, 2, "@a", &[])).unwrap();

        let loaded = db.read_generated_feed("@a", &run_id, 2).unwrap().unwrap();
        assert!(loaded.post_ids.is_empty());
        assert!(db.read_generated_feed("@a", &run_id, 3).unwrap().is_none());
    }
}
