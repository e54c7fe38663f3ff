use std::collections::BTreeMap;

use socialsim_types::{
    ActionCounts, Error, Result, Run, RunMetrics, TurnAction, TurnMetadata, TurnMetrics,
    now_timestamp,
};

fn count(counts: &ActionCounts, action: TurnAction) -> f64 {
    counts.get(&action).copied().unwrap_or(0) as f64
}

fn metric_from_counts(key: &str, counts: &ActionCounts) -> Option<f64> {
    match key {
        "total_likes" => Some(count(counts, TurnAction::Like)),
        "total_comments" => Some(count(counts, TurnAction::Comment)),
        "total_follows" => Some(count(counts, TurnAction::Follow)),
        "total_actions" => Some(
            count(counts, TurnAction::Like)
                + count(counts, TurnAction::Comment)
                + count(counts, TurnAction::Follow),
        ),
        _ => None,
    }
}

/// Evaluate the run's requested metric keys against one turn's action
/// counts. An unknown key fails the turn (and therefore the run).
pub fn compute_turn_metrics(
    run: &Run,
    turn_number: u32,
    counts: &ActionCounts,
) -> Result<TurnMetrics> {
    let mut metrics = BTreeMap::new();
    for key in &run.metric_keys {
        let value =
            metric_from_counts(key, counts).ok_or_else(|| Error::MetricsComputation {
                metric_key: key.clone(),
                run_id: run.run_id.clone(),
                turn_number: Some(turn_number),
                reason: "unknown metric key".to_string(),
            })?;
        metrics.insert(key.clone(), value);
    }
    Ok(TurnMetrics {
        run_id: run.run_id.clone(),
        turn_number,
        metrics,
        created_at: now_timestamp(),
    })
}

/// Aggregate the run's metric keys across all persisted turns
pub fn compute_run_metrics(run: &Run, turns: &[TurnMetadata]) -> Result<RunMetrics> {
    let mut totals: ActionCounts = ActionCounts::new();
    for turn in turns {
        for (action, value) in &turn.total_actions {
            *totals.entry(*action).or_insert(0) += value;
        }
    }

    let mut metrics = BTreeMap::new();
    for key in &run.metric_keys {
        let value =
            metric_from_counts(key, &totals).ok_or_else(|| Error::MetricsComputation {
                metric_key: key.clone(),
                run_id: run.run_id.clone(),
                turn_number: None,
                reason: "unknown metric key".to_string(),
            })?;
        metrics.insert(key.clone(), value);
    }
    Ok(RunMetrics {
        run_id: run.run_id.clone(),
        metrics,
        created_at: now_timestamp(),
    })
}
