//! Dispatch from (action type, algorithm name) to generator
//! implementations.
//!
//! Names are strings at the boundary and validated here; the set of
//! algorithms is closed at compile time.

use std::sync::Arc;

use socialsim_llm::StructuredCompletion;
use socialsim_types::{Error, Result, TurnAction};

use crate::config::ActionGeneratorConfig;
use crate::generators::deterministic::{
    DeterministicCommentGenerator, DeterministicFollowGenerator, DeterministicLikeGenerator,
};
use crate::generators::naive_llm::{
    NaiveLlmCommentGenerator, NaiveLlmFollowGenerator, NaiveLlmLikeGenerator,
};
use crate::generators::random_simple::{
    RandomSimpleCommentGenerator, RandomSimpleFollowGenerator, RandomSimpleLikeGenerator,
};
use crate::generators::{CommentGenerator, FollowGenerator, LikeGenerator};

/// Algorithms available for every action type
pub fn generator_algorithms() -> &'static [&'static str] {
    &["deterministic", "random_simple", "naive_llm"]
}

fn missing_client(action: &str) -> Error {
    Error::InvalidInput(format!(
        "naive_llm {} generator requires an LLM client",
        action
    ))
}

fn unsupported(action: &str, algorithm: &str) -> Error {
    Error::InvalidInput(format!("Unsupported {} algorithm: '{}'", action, algorithm))
}

pub fn create_like_generator(
    algorithm: &str,
    llm_client: Option<&Arc<dyn StructuredCompletion>>,
    seed: Option<u64>,
) -> Result<Box<dyn LikeGenerator>> {
    match algorithm {
        "deterministic" => Ok(Box::new(DeterministicLikeGenerator)),
        "random_simple" => Ok(Box::new(match seed {
            Some(seed) => RandomSimpleLikeGenerator::seeded(seed),
            None => RandomSimpleLikeGenerator::new(),
        })),
        "naive_llm" => llm_client
            .map(|client| {
                Box::new(NaiveLlmLikeGenerator::new(client.clone())) as Box<dyn LikeGenerator>
            })
            .ok_or_else(|| missing_client("like")),
        other => Err(unsupported("like", other)),
    }
}

pub fn create_comment_generator(
    algorithm: &str,
    llm_client: Option<&Arc<dyn StructuredCompletion>>,
    seed: Option<u64>,
) -> Result<Box<dyn CommentGenerator>> {
    match algorithm {
        "deterministic" => Ok(Box::new(DeterministicCommentGenerator)),
        "random_simple" => Ok(Box::new(match seed {
            Some(seed) => RandomSimpleCommentGenerator::seeded(seed),
            None => RandomSimpleCommentGenerator::new(),
        })),
        "naive_llm" => llm_client
            .map(|client| {
                Box::new(NaiveLlmCommentGenerator::new(client.clone()))
                    as Box<dyn CommentGenerator>
            })
            .ok_or_else(|| missing_client("comment")),
        other => Err(unsupported("comment", other)),
    }
}

pub fn create_follow_generator(
    algorithm: &str,
    llm_client: Option<&Arc<dyn StructuredCompletion>>,
    seed: Option<u64>,
) -> Result<Box<dyn FollowGenerator>> {
    match algorithm {
        "deterministic" => Ok(Box::new(DeterministicFollowGenerator)),
        "random_simple" => Ok(Box::new(match seed {
            Some(seed) => RandomSimpleFollowGenerator::seeded(seed),
            None => RandomSimpleFollowGenerator::new(),
        })),
        "naive_llm" => llm_client
            .map(|client| {
                Box::new(NaiveLlmFollowGenerator::new(client.clone()))
                    as Box<dyn FollowGenerator>
            })
            .ok_or_else(|| missing_client("follow")),
        other => Err(unsupported("follow", other)),
    }
}

/// The three generators an agent runs each turn, one per action type
pub struct ActionGenerators {
    pub like: Box<dyn LikeGenerator>,
    pub comment: Box<dyn CommentGenerator>,
    pub follow: Box<dyn FollowGenerator>,
}

impl ActionGenerators {
    /// Resolve algorithms from config defaults and build the bundle.
    ///
    /// `seed` makes the random_simple policies reproducible; `llm_client`
    /// is required only when a naive_llm algorithm is resolved.
    pub fn from_config(
        config: &ActionGeneratorConfig,
        llm_client: Option<&Arc<dyn StructuredCompletion>>,
        seed: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            like: create_like_generator(
                &config.resolve_algorithm(TurnAction::Like, None),
                llm_client,
                seed,
            )?,
            comment: create_comment_generator(
                &config.resolve_algorithm(TurnAction::Comment, None),
                llm_client,
                seed,
            )?,
            follow: create_follow_generator(
                &config.resolve_algorithm(TurnAction::Follow, None),
                llm_client,
                seed,
            )?,
        })
    }

    /// All-deterministic bundle; fully reproducible turns
    pub fn deterministic() -> Self {
        Self {
            like: Box::new(DeterministicLikeGenerator),
            comment: Box::new(DeterministicCommentGenerator),
            follow: Box::new(DeterministicFollowGenerator),
        }
    }
}
