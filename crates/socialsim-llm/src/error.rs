use std::fmt;

/// Provider-agnostic LLM failure, classified for retry handling.
///
/// Transient kinds are retried on a bounded backoff schedule; terminal
/// kinds (auth, permission, invalid request) fail immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider rate limit hit
    RateLimited(String),

    /// Request timed out
    Timeout(String),

    /// Network or connection failure
    Connection(String),

    /// Authentication failed; retrying cannot help
    Auth(String),

    /// The credentials lack permission for this model or operation
    PermissionDenied(String),

    /// The request itself is malformed; retrying cannot help
    InvalidRequest(String),

    /// The reply was missing, unparsable, or did not match the declared
    /// shape; a fresh completion may fix it
    InvalidResponse(String),

    /// Any other provider-reported failure
    Provider(String),
}

impl LlmError {
    pub fn is_retriable(&self) -> bool {
        match self {
            LlmError::RateLimited(_)
            | LlmError::Timeout(_)
            | LlmError::Connection(_)
            | LlmError::InvalidResponse(_)
            | LlmError::Provider(_) => true,
            LlmError::Auth(_) | LlmError::PermissionDenied(_) | LlmError::InvalidRequest(_) => {
                false
            }
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            LlmError::Timeout(msg) => write!(f, "timeout: {}", msg),
            LlmError::Connection(msg) => write!(f, "connection error: {}", msg),
            LlmError::Auth(msg) => write!(f, "authentication failed: {}", msg),
            LlmError::PermissionDenied(msg) => write!(f, "permission denied: {}", msg),
            LlmError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            LlmError::InvalidResponse(msg) => write!(f, "invalid response: {}", msg),
            LlmError::Provider(msg) => write!(f, "provider error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<LlmError> for socialsim_types::Error {
    fn from(err: LlmError) -> Self {
        socialsim_types::Error::Llm(err.to_string())
    }
}
