use std::cmp::Ordering;

use chrono::DateTime;
use uuid::Uuid;

use socialsim_types::{Agent, Error, Post, Result};

use crate::algorithm::{AlgorithmConfig, FeedAlgorithm, FeedAlgorithmResult};

const ORDER_KEY: &str = "order";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedOrder {
    NewestFirst,
    OldestFirst,
}

fn parse_order(config: Option<&AlgorithmConfig>) -> Result<FeedOrder> {
    let Some(value) = config.and_then(|c| c.get(ORDER_KEY)) else {
        return Ok(FeedOrder::NewestFirst);
    };
    match value.as_str() {
        Some("newest_first") => Ok(FeedOrder::NewestFirst),
        Some("oldest_first") => Ok(FeedOrder::OldestFirst),
        _ => Err(Error::InvalidInput(format!(
            "Invalid chronological order config: {}",
            value
        ))),
    }
}

// Unparseable timestamps collapse to the epoch minimum so they sort
// after every real post in the default order.
fn created_at_millis(post: &Post) -> i64 {
    DateTime::parse_from_rfc3339(&post.created_at)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(i64::MIN)
}

/// Reference feed algorithm: newest posts first, ties broken by URI
/// ascending. `order = "oldest_first"` flips the primary key only.
pub struct ChronologicalFeedAlgorithm;

impl FeedAlgorithm for ChronologicalFeedAlgorithm {
    fn name(&self) -> &'static str {
        "chronological"
    }

    fn generate(
        &self,
        candidates: &[Post],
        agent: &Agent,
        limit: usize,
        config: Option<&AlgorithmConfig>,
    ) -> Result<FeedAlgorithmResult> {
        let order = parse_order(config)?;

        let mut ranked: Vec<&Post> = candidates.iter().collect();
        ranked.sort_by(|a, b| {
            let (ta, tb) = (created_at_millis(a), created_at_millis(b));
            let primary = match order {
                FeedOrder::NewestFirst => tb.cmp(&ta),
                FeedOrder::OldestFirst => ta.cmp(&tb),
            };
            match primary {
                Ordering::Equal => a.uri.cmp(&b.uri),
                other => other,
            }
        });

        Ok(FeedAlgorithmResult {
            feed_id: format!("feed_{}", Uuid::new_v4()),
            agent_handle: agent.handle.clone(),
            post_ids: ranked
                .into_iter()
                .take(limit)
                .map(|p| p.post_id.clone())
                .collect(),
        })
    }
}
