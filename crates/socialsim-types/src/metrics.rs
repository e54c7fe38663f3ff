use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metric keys used when a run config does not name any
pub fn default_metric_keys() -> Vec<String> {
    vec![
        "total_likes".to_string(),
        "total_comments".to_string(),
        "total_follows".to_string(),
        "total_actions".to_string(),
    ]
}

/// Metric values for one turn; written atomically with turn metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetrics {
    pub run_id: String,
    pub turn_number: u32,
    pub metrics: BTreeMap<String, f64>,
    pub created_at: String,
}

/// Metric values for a whole run; written once at run completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub metrics: BTreeMap<String, f64>,
    pub created_at: String,
}
