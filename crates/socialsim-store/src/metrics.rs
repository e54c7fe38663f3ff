use rusqlite::{Connection, OptionalExtension, params};

use socialsim_types::{
    Error, MetricsRepository, Result, RunMetrics, RunStatus, SimulationPersistence, Transition,
    TurnMetadata, TurnMetrics, check_status_transition, now_timestamp,
};

use crate::db::Database;
use crate::runs;

fn upsert_turn_metrics(conn: &Connection, metrics: &TurnMetrics) -> Result<()> {
    let values = serde_json::to_string(&metrics.metrics).map_err(Error::storage)?;
    conn.execute(
        r#"
        INSERT INTO turn_metrics (run_id, turn_number, metrics, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(run_id, turn_number) DO UPDATE SET
            metrics = ?3,
            created_at = ?4
        "#,
        params![
            &metrics.run_id,
            metrics.turn_number,
            &values,
            &metrics.created_at,
        ],
    )
    .map_err(Error::storage)?;
    Ok(())
}

fn upsert_run_metrics(conn: &Connection, metrics: &RunMetrics) -> Result<()> {
    let values = serde_json::to_string(&metrics.metrics).map_err(Error::storage)?;
    conn.execute(
        r#"
        INSERT INTO run_metrics (run_id, metrics, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(run_id) DO UPDATE SET
            metrics = ?2,
            created_at = ?3
        "#,
        params![&metrics.run_id, &values, &metrics.created_at],
    )
    .map_err(Error::storage)?;
    Ok(())
}

impl MetricsRepository for Database {
    fn read_turn_metrics(&self, run_id: &str, turn_number: u32) -> Result<Option<TurnMetrics>> {
        self.with_conn(|conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT metrics, created_at FROM turn_metrics \
                     WHERE run_id = ?1 AND turn_number = ?2",
                    params![run_id, turn_number],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(Error::storage)?;
            row.map(|(metrics, created_at)| {
                Ok(TurnMetrics {
                    run_id: run_id.to_string(),
                    turn_number,
                    metrics: serde_json::from_str(&metrics)
                        .map_err(|e| Error::storage(format!("invalid metrics: {}", e)))?,
                    created_at,
                })
            })
            .transpose()
        })
    }

    fn read_run_metrics(&self, run_id: &str) -> Result<Option<RunMetrics>> {
        self.with_conn(|conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT metrics, created_at FROM run_metrics WHERE run_id = ?1",
                    [run_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(Error::storage)?;
            row.map(|(metrics, created_at)| {
                Ok(RunMetrics {
                    run_id: run_id.to_string(),
                    metrics: serde_json::from_str(&metrics)
                        .map_err(|e| Error::storage(format!("invalid metrics: {}", e)))?,
                    created_at,
                })
            })
            .transpose()
        })
    }
}

impl SimulationPersistence for Database {
    fn write_turn(&self, metadata: &TurnMetadata, metrics: &TurnMetrics) -> Result<()> {
        self.with_transaction(|tx| {
            runs::insert_turn_metadata(tx, metadata)?;
            upsert_turn_metrics(tx, metrics)?;
            Ok(())
        })
    }

    fn write_run(&self, run_id: &str, metrics: &RunMetrics) -> Result<()> {
        self.with_transaction(|tx| {
            upsert_run_metrics(tx, metrics)?;
            let run = runs::read_run(tx, run_id)?.ok_or_else(|| Error::RunNotFound {
                run_id: run_id.to_string(),
            })?;
            match check_status_transition(run_id, run.status, RunStatus::Completed)? {
                Transition::NoOp => Ok(()),
                Transition::Apply => {
                    let completed_at = now_timestamp();
                    runs::apply_run_status(
                        tx,
                        run_id,
                        RunStatus::Completed,
                        Some(&completed_at),
                    )
                }
            }
        })
    }
}
