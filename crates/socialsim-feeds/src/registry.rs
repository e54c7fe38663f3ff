use socialsim_types::{Error, Result};

use crate::algorithm::FeedAlgorithm;
use crate::chronological::ChronologicalFeedAlgorithm;

#[derive(Debug, Clone)]
pub struct FeedAlgorithmMetadata {
    pub name: &'static str,
    pub description: &'static str,
}

// Closed set; algorithm names are validated against this on ingress and
// persisted in runs.feed_algorithm.
const ALGORITHMS: &[FeedAlgorithmMetadata] = &[FeedAlgorithmMetadata {
    name: "chronological",
    description: "Newest posts first, ties broken by URI ascending",
}];

pub fn algorithm_names() -> Vec<&'static str> {
    ALGORITHMS.iter().map(|a| a.name).collect()
}

/// Reject names not in the registry before any run state is written
pub fn validate_algorithm(name: &str) -> Result<()> {
    if ALGORITHMS.iter().any(|a| a.name == name) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Unknown feed algorithm: '{}'",
            name
        )))
    }
}

/// Create a feed algorithm by registry name
pub fn create_algorithm(name: &str) -> Result<Box<dyn FeedAlgorithm>> {
    match name {
        "chronological" => Ok(Box::new(ChronologicalFeedAlgorithm)),
        other => Err(Error::InvalidInput(format!(
            "Unknown feed algorithm: '{}'",
            other
        ))),
    }
}
