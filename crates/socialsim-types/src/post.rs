use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source platform for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSource {
    Bluesky,
    AiGenerated,
}

impl PostSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSource::Bluesky => "bluesky",
            PostSource::AiGenerated => "ai_generated",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "bluesky" => Ok(PostSource::Bluesky),
            "ai_generated" => Ok(PostSource::AiGenerated),
            other => Err(Error::InvalidInput(format!(
                "Unknown post source: '{}'",
                other
            ))),
        }
    }
}

/// Canonical post id for a source-native uri: `{source}:{uri}`
pub fn canonical_post_id(source: PostSource, uri: &str) -> String {
    format!("{}:{}", source.as_str(), uri)
}

/// Platform-agnostic social media post with canonical identity.
///
/// Posts are immutable within a run and shared read-only across agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub source: PostSource,
    pub uri: String,
    pub author_handle: String,
    pub author_display_name: String,
    pub text: String,
    pub bookmark_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
    pub reply_count: u64,
    pub repost_count: u64,
    pub created_at: String,
}

impl Post {
    /// Build a post with the canonical id derived from source and uri
    pub fn new(
        source: PostSource,
        uri: impl Into<String>,
        author_handle: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        let uri = uri.into();
        Self {
            post_id: canonical_post_id(source, &uri),
            source,
            uri,
            author_handle: author_handle.into(),
            author_display_name: String::new(),
            text: String::new(),
            bookmark_count: 0,
            like_count: 0,
            quote_count: 0,
            reply_count: 0,
            repost_count: 0,
            created_at: created_at.into(),
        }
    }
}
