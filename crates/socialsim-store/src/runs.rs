use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use socialsim_types::{
    Error, Result, Run, RunConfig, RunRepository, RunStatus, Transition, TurnMetadata,
    check_status_transition, compact_timestamp, default_metric_keys, now_timestamp,
};

use crate::db::Database;

const RUN_COLUMNS: &str = "run_id, created_at, total_turns, total_agents, feed_algorithm, \
     feed_algorithm_config, metric_keys, started_at, status, completed_at";

type RunRow = (
    String,
    String,
    u32,
    u32,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
);

fn run_from_row(row: RunRow) -> Result<Run> {
    let (
        run_id,
        created_at,
        total_turns,
        total_agents,
        feed_algorithm,
        feed_algorithm_config,
        metric_keys,
        started_at,
        status,
        completed_at,
    ) = row;
    Ok(Run {
        run_id,
        created_at,
        total_turns,
        total_agents,
        feed_algorithm,
        feed_algorithm_config: feed_algorithm_config
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| Error::storage(format!("invalid feed_algorithm_config: {}", e)))?,
        metric_keys: serde_json::from_str(&metric_keys)
            .map_err(|e| Error::storage(format!("invalid metric_keys: {}", e)))?,
        started_at,
        status: RunStatus::parse(&status)?,
        completed_at,
    })
}

fn read_run_row(conn: &Connection, run_id: &str) -> Result<Option<RunRow>> {
    conn.query_row(
        &format!("SELECT {} FROM runs WHERE run_id = ?1", RUN_COLUMNS),
        [run_id],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        },
    )
    .optional()
    .map_err(Error::storage)
}

pub(crate) fn read_run(conn: &Connection, run_id: &str) -> Result<Option<Run>> {
    read_run_row(conn, run_id)?.map(run_from_row).transpose()
}

fn insert_run(conn: &Connection, run: &Run) -> Result<()> {
    let feed_algorithm_config = run
        .feed_algorithm_config
        .as_ref()
        .map(|config| serde_json::Value::Object(config.clone()).to_string());
    let metric_keys =
        serde_json::to_string(&run.metric_keys).map_err(Error::storage)?;
    conn.execute(
        r#"
        INSERT INTO runs
        (run_id, created_at, total_turns, total_agents, feed_algorithm,
         feed_algorithm_config, metric_keys, started_at, status, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            &run.run_id,
            &run.created_at,
            run.total_turns,
            run.total_agents,
            &run.feed_algorithm,
            &feed_algorithm_config,
            &metric_keys,
            &run.started_at,
            run.status.as_str(),
            &run.completed_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

/// Apply a validated status transition inside an open transaction.
///
/// Callers are responsible for state-machine validation; this only issues
/// the row update and maps a zero rowcount to `RunNotFound`.
pub(crate) fn apply_run_status(
    conn: &Connection,
    run_id: &str,
    status: RunStatus,
    completed_at: Option<&str>,
) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE runs SET status = ?1, completed_at = ?2 WHERE run_id = ?3",
            params![status.as_str(), completed_at, run_id],
        )
        .map_err(|e| Error::RunStatusUpdate {
            run_id: run_id.to_string(),
            reason: e.to_string(),
        })?;
    if rows == 0 {
        return Err(Error::RunNotFound {
            run_id: run_id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn insert_turn_metadata(conn: &Connection, metadata: &TurnMetadata) -> Result<()> {
    let run = read_run(conn, &metadata.run_id)?.ok_or_else(|| Error::RunNotFound {
        run_id: metadata.run_id.clone(),
    })?;
    if metadata.turn_number >= run.total_turns {
        return Err(Error::InvalidInput(format!(
            "Turn number {} is out of bounds for run '{}' with {} turns",
            metadata.turn_number, metadata.run_id, run.total_turns
        )));
    }

    let total_actions =
        serde_json::to_string(&metadata.total_actions).map_err(Error::storage)?;
    match conn.execute(
        "INSERT INTO turn_metadata (run_id, turn_number, total_actions, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            &metadata.run_id,
            metadata.turn_number,
            &total_actions,
            &metadata.created_at,
        ],
    ) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::DuplicateTurnMetadata {
                run_id: metadata.run_id.clone(),
                turn_number: metadata.turn_number,
            })
        }
        Err(e) => Err(Error::storage(e)),
    }
}

fn turn_metadata_from_row(
    run_id: String,
    turn_number: u32,
    total_actions: String,
    created_at: String,
) -> Result<TurnMetadata> {
    Ok(TurnMetadata {
        run_id,
        turn_number,
        total_actions: serde_json::from_str(&total_actions)
            .map_err(|e| Error::storage(format!("invalid total_actions: {}", e)))?,
        created_at,
    })
}

impl RunRepository for Database {
    fn create_run(&self, config: &RunConfig) -> Result<Run> {
        config.validate()?;

        let ts = now_timestamp();
        let run_id = format!("run_{}_{}", compact_timestamp(), Uuid::new_v4());
        let metric_keys = match &config.metric_keys {
            Some(keys) if !keys.is_empty() => keys.clone(),
            _ => default_metric_keys(),
        };
        let run = Run {
            run_id: run_id.clone(),
            created_at: ts.clone(),
            total_turns: config.num_turns,
            total_agents: config.num_agents,
            feed_algorithm: config.feed_algorithm.clone(),
            feed_algorithm_config: config.feed_algorithm_config.clone(),
            metric_keys,
            started_at: ts,
            status: RunStatus::Running,
            completed_at: None,
        };

        self.with_transaction(|tx| insert_run(tx, &run))
            .map_err(|e| Error::RunCreation {
                run_id,
                reason: e.to_string(),
            })?;
        Ok(run)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        if run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
        }
        self.with_conn(|conn| read_run(conn, run_id))
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM runs ORDER BY created_at DESC, run_id DESC",
                    RUN_COLUMNS
                ))
                .map_err(Error::storage)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                })
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<RunRow>, _>>()
                .map_err(Error::storage)?;
            rows.into_iter().map(run_from_row).collect()
        })
    }

    fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        if run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
        }
        self.with_transaction(|tx| {
            let current = read_run(tx, run_id)?.ok_or_else(|| Error::RunNotFound {
                run_id: run_id.to_string(),
            })?;
            match check_status_transition(run_id, current.status, status)? {
                Transition::NoOp => Ok(()),
                Transition::Apply => {
                    let completed_at = (status == RunStatus::Completed).then(now_timestamp);
                    apply_run_status(tx, run_id, status, completed_at.as_deref())
                }
            }
        })
    }

    fn get_turn_metadata(&self, run_id: &str, turn_number: u32) -> Result<Option<TurnMetadata>> {
        if run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
        }
        self.with_conn(|conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT total_actions, created_at FROM turn_metadata \
                     WHERE run_id = ?1 AND turn_number = ?2",
                    params![run_id, turn_number],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(Error::storage)?;
            row.map(|(total_actions, created_at)| {
                turn_metadata_from_row(run_id.to_string(), turn_number, total_actions, created_at)
            })
            .transpose()
        })
    }

    fn list_turn_metadata(&self, run_id: &str) -> Result<Vec<TurnMetadata>> {
        if run_id.trim().is_empty() {
            return Err(Error::InvalidInput("run_id cannot be empty".to_string()));
        }
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT turn_number, total_actions, created_at FROM turn_metadata \
                     WHERE run_id = ?1 ORDER BY turn_number ASC",
                )
                .map_err(Error::storage)?;
            let rows = stmt
                .query_map([run_id], |row| {
                    Ok((row.get::<_, u32>(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(Error::storage)?
                .collect::<std::result::Result<Vec<(u32, String, String)>, _>>()
                .map_err(Error::storage)?;
            rows.into_iter()
                .map(|(turn_number, total_actions, created_at)| {
                    turn_metadata_from_row(
                        run_id.to_string(),
                        turn_number,
                        total_actions,
                        created_at,
                    )
                })
                .collect()
        })
    }

    fn write_turn_metadata(&self, metadata: &TurnMetadata) -> Result<()> {
        self.with_transaction(|tx| insert_turn_metadata(tx, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialsim_types::action_counts;

    fn store() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn config() -> RunConfig {
        RunConfig::new(2, 3, "chronological")
    }

    #[test]
    fn create_run_assigns_id_and_defaults() {
        let db = store();
        let run = db.create_run(&config()).unwrap();

        assert!(run.run_id.starts_with("run_"));
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.metric_keys, default_metric_keys());
        assert_eq!(run.started_at, run.created_at);
        assert!(run.completed_at.is_none());

        let loaded = db.get_run(&run.run_id).unwrap().unwrap();
        assert_eq!(loaded.run_id, run.run_id);
        assert_eq!(loaded.total_turns, 3);
        assert_eq!(loaded.total_agents, 2);
    }

    #[test]
    fn create_run_rejects_invalid_config() {
        let db = store();
        let err = db.create_run(&RunConfig::new(0, 1, "chronological")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn list_runs_newest_first() {
        let db = store();
        let first = db.create_run(&config()).unwrap();
        let second = db.create_run(&config()).unwrap();

        let runs = db.list_runs().unwrap();
        assert_eq!(runs.len(), 2);
        // Same-second timestamps fall back to run_id ordering; both runs
        // must be present and the later one must not sort before creation.
        let ids: Vec<_> = runs.iter().map(|r| r.run_id.clone()).collect();
        assert!(ids.contains(&first.run_id));
        assert!(ids.contains(&second.run_id));
    }

    #[test]
    fn status_updates_follow_the_state_machine() {
        let db = store();
        let run = db.create_run(&config()).unwrap();

        db.update_run_status(&run.run_id, RunStatus::Completed).unwrap();
        let loaded = db.get_run(&run.run_id).unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        let completed_at = loaded.completed_at.expect("completed_at must be set");
        assert!(completed_at >= loaded.started_at);

        // Terminal: self-transition is a no-op, anything else rejected
        db.update_run_status(&run.run_id, RunStatus::Completed).unwrap();
        let err = db
            .update_run_status(&run.run_id, RunStatus::Running)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let unchanged = db.get_run(&run.run_id).unwrap().unwrap();
        assert_eq!(unchanged.status, RunStatus::Completed);
    }

    #[test]
    fn status_update_for_unknown_run_misses() {
        let db = store();
        let err = db
            .update_run_status("run_missing", RunStatus::Failed)
            .unwrap_err();
        assert!(matches!(err, Error::RunNotFound { .. }));
    }

    #[test]
    fn turn_metadata_is_unique_per_turn() {
        let db = store();
        let run = db.create_run(&config()).unwrap();

        let metadata = TurnMetadata {
            run_id: run.run_id.clone(),
            turn_number: 0,
            total_actions: action_counts(2, 1, 0),
            created_at: now_timestamp(),
        };
        db.write_turn_metadata(&metadata).unwrap();

        let err = db.write_turn_metadata(&metadata).unwrap_err();
        assert!(matches!(err, Error::DuplicateTurnMetadata { .. }));

        let loaded = db.get_turn_metadata(&run.run_id, 0).unwrap().unwrap();
        assert_eq!(loaded.total_actions, action_counts(2, 1, 0));
    }

    #[test]
    fn turn_metadata_requires_run_and_bounds() {
        let db = store();
        let run = db.create_run(&config()).unwrap();

        let missing = TurnMetadata {
            run_id: "run_missing".to_string(),
            turn_number: 0,
            total_actions: action_counts(0, 0, 0),
            created_at: now_timestamp(),
        };
        assert!(matches!(
            db.write_turn_metadata(&missing).unwrap_err(),
            Error::RunNotFound { .. }
        ));

        let out_of_bounds = TurnMetadata {
            run_id: run.run_id.clone(),
            turn_number: 3,
            total_actions: action_counts(0, 0, 0),
            created_at: now_timestamp(),
        };
        assert!(matches!(
            db.write_turn_metadata(&out_of_bounds).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn turn_metadata_lists_in_turn_order() {
        let db = store();
        let run = db.create_run(&config()).unwrap();

        for turn in [2u32, 0, 1] {
            db.write_turn_metadata(&TurnMetadata {
                run_id: run.run_id.clone(),
                turn_number: turn,
                total_actions: action_counts(turn as u64, 0, 0),
                created_at: now_timestamp(),
            })
            .unwrap();
        }

        let listed = db.list_turn_metadata(&run.run_id).unwrap();
        let turns: Vec<u32> = listed.iter().map(|m| m.turn_number).collect();
        assert_eq!(turns, vec![0, 1, 2]);
    }

    #[test]
    fn blank_run_id_is_rejected() {
        let db = store();
        assert!(matches!(db.get_run("  ").unwrap_err(), Error::InvalidInput(_)));
        assert!(matches!(
            db.list_turn_metadata("").unwrap_err(),
            Error::InvalidInput(_)
        ));
    }
}
