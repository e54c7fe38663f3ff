use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::now_timestamp;

/// Where an agent's identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaSource {
    UserGenerated,
    SyncBluesky,
}

impl PersonaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaSource::UserGenerated => "user_generated",
            PersonaSource::SyncBluesky => "sync_bluesky",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "user_generated" => Ok(PersonaSource::UserGenerated),
            "sync_bluesky" => Ok(PersonaSource::SyncBluesky),
            other => Err(Error::InvalidInput(format!(
                "Unknown persona source: '{}'",
                other
            ))),
        }
    }
}

/// Where a persona bio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BioSource {
    AiGenerated,
    UserProvided,
}

impl BioSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BioSource::AiGenerated => "ai_generated",
            BioSource::UserProvided => "user_provided",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "ai_generated" => Ok(BioSource::AiGenerated),
            "user_provided" => Ok(BioSource::UserProvided),
            other => Err(Error::InvalidInput(format!(
                "Unknown bio source: '{}'",
                other
            ))),
        }
    }
}

/// Normalize a handle to lowercase with a single leading `@`
pub fn normalize_handle(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    format!("@{}", lowered.trim_start_matches('@'))
}

/// A synthetic user acting under algorithmic policies.
///
/// Agents are read-only inputs to the engine; the identity set is fixed
/// for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub handle: String,
    pub display_name: String,
    pub persona_source: PersonaSource,
    pub created_at: String,
    pub updated_at: String,
}

impl Agent {
    pub fn new(
        agent_id: impl Into<String>,
        handle: &str,
        display_name: impl Into<String>,
        persona_source: PersonaSource,
    ) -> Self {
        let ts = now_timestamp();
        Self {
            agent_id: agent_id.into(),
            handle: normalize_handle(handle),
            display_name: display_name.into(),
            persona_source,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }
}

/// Versioned persona text for an agent.
///
/// Bios are append-only; "latest" is the one with the highest created_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBio {
    pub bio_id: String,
    pub agent_id: String,
    pub persona_bio: String,
    pub source: BioSource,
    pub created_at: String,
    pub updated_at: String,
}
