use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Substituted when a persisted row carries a null or blank explanation.
///
/// This is a one-way normalization applied on hydration; generated actions
/// always carry a non-empty explanation.
pub const DEFAULT_ACTION_EXPLANATION: &str = "No explanation provided.";

/// Normalize a persisted explanation into a non-empty string
pub fn normalize_action_explanation(explanation: Option<&str>) -> String {
    let normalized = explanation.unwrap_or("").trim();
    if normalized.is_empty() {
        DEFAULT_ACTION_EXPLANATION.to_string()
    } else {
        normalized.to_string()
    }
}

/// A like attributed to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub like_id: String,
    pub agent_id: String,
    pub post_id: String,
    pub created_at: String,
}

/// A comment attributed to an agent; text is required and non-empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub agent_id: String,
    pub post_id: String,
    pub text: String,
    pub created_at: String,
}

/// A follow attributed to an agent; the target is another user's handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follow_id: String,
    pub agent_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// Provenance attached to every generated action.
///
/// `generation_metadata` is an opaque JSON blob; it is persisted as
/// serialized text and never folded into the action's structural type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model_used: Option<String>,
    pub generation_metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// A like produced by a generator, with explanation and provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLike {
    pub like: Like,
    pub explanation: String,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedComment {
    pub comment: Comment,
    pub explanation: String,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFollow {
    pub follow: Follow,
    pub explanation: String,
    pub metadata: GenerationMetadata,
}

/// Any generated action, for hydrated turn views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedAction {
    Like(GeneratedLike),
    Comment(GeneratedComment),
    Follow(GeneratedFollow),
}

/// A like row as stored, with denormalized run/turn/agent keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedLike {
    pub like_id: String,
    pub run_id: String,
    pub turn_number: u32,
    pub agent_handle: String,
    pub post_id: String,
    pub created_at: String,
    pub explanation: Option<String>,
    pub model_used: Option<String>,
    pub generation_metadata_json: Option<String>,
    pub generation_created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedComment {
    pub comment_id: String,
    pub run_id: String,
    pub turn_number: u32,
    pub agent_handle: String,
    pub post_id: String,
    pub text: String,
    pub created_at: String,
    pub explanation: Option<String>,
    pub model_used: Option<String>,
    pub generation_metadata_json: Option<String>,
    pub generation_created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFollow {
    pub follow_id: String,
    pub run_id: String,
    pub turn_number: u32,
    pub agent_handle: String,
    pub user_id: String,
    pub created_at: String,
    pub explanation: Option<String>,
    pub model_used: Option<String>,
    pub generation_metadata_json: Option<String>,
    pub generation_created_at: Option<String>,
}

fn metadata_json(metadata: &GenerationMetadata) -> Option<String> {
    metadata
        .generation_metadata
        .as_ref()
        .map(|value| value.to_string())
}

fn metadata_from_row(
    model_used: Option<&str>,
    generation_metadata_json: Option<&str>,
    generation_created_at: Option<&str>,
    row_created_at: &str,
) -> Result<GenerationMetadata> {
    let generation_metadata = generation_metadata_json
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| Error::storage(format!("invalid generation_metadata_json: {}", e)))?;
    Ok(GenerationMetadata {
        model_used: model_used.map(str::to_string),
        generation_metadata,
        created_at: generation_created_at
            .unwrap_or(row_created_at)
            .to_string(),
    })
}

impl PersistedLike {
    pub fn from_generated(run_id: &str, turn_number: u32, generated: &GeneratedLike) -> Self {
        Self {
            like_id: generated.like.like_id.clone(),
            run_id: run_id.to_string(),
            turn_number,
            agent_handle: generated.like.agent_id.clone(),
            post_id: generated.like.post_id.clone(),
            created_at: generated.like.created_at.clone(),
            explanation: Some(generated.explanation.clone()),
            model_used: generated.metadata.model_used.clone(),
            generation_metadata_json: metadata_json(&generated.metadata),
            generation_created_at: Some(generated.metadata.created_at.clone()),
        }
    }

    pub fn to_generated(&self) -> Result<GeneratedLike> {
        Ok(GeneratedLike {
            like: Like {
                like_id: self.like_id.clone(),
                agent_id: self.agent_handle.clone(),
                post_id: self.post_id.clone(),
                created_at: self.created_at.clone(),
            },
            explanation: normalize_action_explanation(self.explanation.as_deref()),
            metadata: metadata_from_row(
                self.model_used.as_deref(),
                self.generation_metadata_json.as_deref(),
                self.generation_created_at.as_deref(),
                &self.created_at,
            )?,
        })
    }
}

impl PersistedComment {
    pub fn from_generated(run_id: &str, turn_number: u32, generated: &GeneratedComment) -> Self {
        Self {
            comment_id: generated.comment.comment_id.clone(),
            run_id: run_id.to_string(),
            turn_number,
            agent_handle: generated.comment.agent_id.clone(),
            post_id: generated.comment.post_id.clone(),
            text: generated.comment.text.clone(),
            created_at: generated.comment.created_at.clone(),
            explanation: Some(generated.explanation.clone()),
            model_used: generated.metadata.model_used.clone(),
            generation_metadata_json: metadata_json(&generated.metadata),
            generation_created_at: Some(generated.metadata.created_at.clone()),
        }
    }

    pub fn to_generated(&self) -> Result<GeneratedComment> {
        Ok(GeneratedComment {
            comment: Comment {
                comment_id: self.comment_id.clone(),
                agent_id: self.agent_handle.clone(),
                post_id: self.post_id.clone(),
                text: self.text.clone(),
                created_at: self.created_at.clone(),
            },
            explanation: normalize_action_explanation(self.explanation.as_deref()),
            metadata: metadata_from_row(
                self.model_used.as_deref(),
                self.generation_metadata_json.as_deref(),
                self.generation_created_at.as_deref(),
                &self.created_at,
            )?,
        })
    }
}

impl PersistedFollow {
    pub fn from_generated(run_id: &str, turn_number: u32, generated: &GeneratedFollow) -> Self {
        Self {
            follow_id: generated.follow.follow_id.clone(),
            run_id: run_id.to_string(),
            turn_number,
            agent_handle: generated.follow.agent_id.clone(),
            user_id: generated.follow.user_id.clone(),
            created_at: generated.follow.created_at.clone(),
            explanation: Some(generated.explanation.clone()),
            model_used: generated.metadata.model_used.clone(),
            generation_metadata_json: metadata_json(&generated.metadata),
            generation_created_at: Some(generated.metadata.created_at.clone()),
        }
    }

    pub fn to_generated(&self) -> Result<GeneratedFollow> {
        Ok(GeneratedFollow {
            follow: Follow {
                follow_id: self.follow_id.clone(),
                agent_id: self.agent_handle.clone(),
                user_id: self.user_id.clone(),
                created_at: self.created_at.clone(),
            },
            explanation: normalize_action_explanation(self.explanation.as_deref()),
            metadata: metadata_from_row(
                self.model_used.as_deref(),
                self.generation_metadata_json.as_deref(),
                self.generation_created_at.as_deref(),
                &self.created_at,
            )?,
        })
    }
}
