use std::path::Path;

use serde::Deserialize;

use socialsim_types::{Error, Result, TurnAction};

/// Hard fallback when neither the caller nor the config names an
/// algorithm
pub fn fallback_algorithm(action: TurnAction) -> &'static str {
    match action {
        TurnAction::Like => "deterministic",
        TurnAction::Comment => "random_simple",
        TurnAction::Follow => "random_simple",
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionAlgorithmDefaults {
    #[serde(default)]
    pub default_algorithm: Option<String>,
}

/// Per-action algorithm defaults, loaded from TOML:
///
/// ```toml
/// [like]
/// default_algorithm = "deterministic"
///
/// [comment]
/// default_algorithm = "naive_llm"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionGeneratorConfig {
    #[serde(default)]
    pub like: ActionAlgorithmDefaults,
    #[serde(default)]
    pub comment: ActionAlgorithmDefaults,
    #[serde(default)]
    pub follow: ActionAlgorithmDefaults,
}

impl ActionGeneratorConfig {
    /// Load from a TOML file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!(
                "Failed to read action config {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidInput(format!(
                "Failed to parse action config {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn configured_default(&self, action: TurnAction) -> Option<&str> {
        let defaults = match action {
            TurnAction::Like => &self.like,
            TurnAction::Comment => &self.comment,
            TurnAction::Follow => &self.follow,
        };
        defaults
            .default_algorithm
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Resolution order: explicit argument, configured default, hard
    /// fallback
    pub fn resolve_algorithm(&self, action: TurnAction, explicit: Option<&str>) -> String {
        if let Some(name) = explicit.filter(|name| !name.is_empty()) {
            return name.to_string();
        }
        if let Some(name) = self.configured_default(action) {
            return name.to_string();
        }
        fallback_algorithm(action).to_string()
    }
}
