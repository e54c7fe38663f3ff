use std::path::PathBuf;

use socialsim_types::{Error, Result};

pub const DB_PATH_ENV: &str = "SIM_DB_PATH";
pub const DATABASE_URL_ENV: &str = "SIM_DATABASE_URL";
pub const LOCAL_ENV: &str = "LOCAL";
pub const LOCAL_RESET_DB_ENV: &str = "LOCAL_RESET_DB";

const LOCAL_DEV_DB_PATH: &str = "local/dev.sqlite";
const DEFAULT_DB_PATH: &str = "db.sqlite";

fn is_truthy(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

fn database_path_from_url(url: &str) -> Result<PathBuf> {
    for prefix in ["sqlite:///", "sqlite://", "sqlite:", "file:"] {
        if let Some(rest) = url.strip_prefix(prefix) {
            if rest.is_empty() {
                break;
            }
            return Ok(PathBuf::from(rest));
        }
    }
    Err(Error::InvalidInput(format!(
        "Unsupported database URL: '{}'",
        url
    )))
}

/// Environment-level configuration for the storage backend.
///
/// `LOCAL` forces the fixed dev database path and tells the (external)
/// seed loader to run once; `LOCAL_RESET_DB` permits it to overwrite a
/// fixture whose digest no longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub db_path: PathBuf,
    pub local_mode: bool,
    pub reset_local_db: bool,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolution order: LOCAL dev path, then SIM_DB_PATH, then
    /// SIM_DATABASE_URL, then the working-directory default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let local_mode = is_truthy(lookup(LOCAL_ENV));
        let reset_local_db = is_truthy(lookup(LOCAL_RESET_DB_ENV));

        let db_path = if local_mode {
            PathBuf::from(LOCAL_DEV_DB_PATH)
        } else if let Some(path) = lookup(DB_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            PathBuf::from(path)
        } else if let Some(url) = lookup(DATABASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            database_path_from_url(&url)?
        } else {
            PathBuf::from(DEFAULT_DB_PATH)
        };

        Ok(Self {
            db_path,
            local_mode,
            reset_local_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_working_directory_database() {
        let config = EnvConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("db.sqlite"));
        assert!(!config.local_mode);
        assert!(!config.reset_local_db);
    }

    #[test]
    fn explicit_path_wins_over_url() {
        let config = EnvConfig::from_lookup(lookup(&[
            (DB_PATH_ENV, "/data/sim.sqlite"),
            (DATABASE_URL_ENV, "sqlite:///elsewhere.sqlite"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/sim.sqlite"));
    }

    #[test]
    fn urls_are_unwrapped() {
        let config =
            EnvConfig::from_lookup(lookup(&[(DATABASE_URL_ENV, "sqlite:///data/sim.sqlite")]))
                .unwrap();
        assert_eq!(config.db_path, PathBuf::from("data/sim.sqlite"));

        let config =
            EnvConfig::from_lookup(lookup(&[(DATABASE_URL_ENV, "file:relative.sqlite")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("relative.sqlite"));

        assert!(EnvConfig::from_lookup(lookup(&[(DATABASE_URL_ENV, "postgres://db")])).is_err());
    }

    #[test]
    fn local_mode_forces_the_dev_path() {
        let config = EnvConfig::from_lookup(lookup(&[
            (LOCAL_ENV, "true"),
            (DB_PATH_ENV, "/data/sim.sqlite"),
            (LOCAL_RESET_DB_ENV, "1"),
        ]))
        .unwrap();
        assert!(config.local_mode);
        assert!(config.reset_local_db);
        assert_eq!(config.db_path, PathBuf::from("local/dev.sqlite"));
    }

    #[test]
    fn truthy_parsing_is_forgiving() {
        for value in ["1", "true", "TRUE", "yes", "On"] {
            assert!(
                EnvConfig::from_lookup(lookup(&[(LOCAL_ENV, value)]))
                    .unwrap()
                    .local_mode
            );
        }
        for value in ["0", "false", "off", "", "nope"] {
            assert!(
                !EnvConfig::from_lookup(lookup(&[(LOCAL_ENV, value)]))
                    .unwrap()
                    .local_mode
            );
        }
    }
}
