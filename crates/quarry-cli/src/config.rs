//! JSON configuration: the model graph plus compilation defaults.

use std::path::Path;

use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};
use quarry_core::{DialectKind, ModelGraph};
use serde::Deserialize;

/// Contents of the `--config` file.
///
/// ```json
/// {
///   "dialect": "postgres",
///   "prefix": "app.users",
///   "timezone": "+02:00",
///   "models": [{ "name": "User", "table": "users" }]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default dialect.
    pub dialect: Option<DialectKind>,
    /// Default table prefix for `where`.
    pub prefix: Option<String>,
    /// Offset dates are rendered in.
    pub timezone: Option<String>,
    /// Models used to resolve attributes and associations.
    #[serde(flatten)]
    pub graph: ModelGraph,
}

impl Config {
    /// Reads the config at `path`, or returns an empty one.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The configured timezone, UTC when unset.
    pub fn timezone(&self) -> anyhow::Result<FixedOffset> {
        match self.timezone.as_deref() {
            None => Ok(Utc.fix()),
            Some(offset) => offset
                .parse()
                .with_context(|| format!("invalid timezone offset '{offset}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "dialect": "sqlite3",
                "prefix": "users",
                "timezone": "+02:00",
                "models": [{{ "name": "User", "table": "users" }}]
            }}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.dialect, Some(DialectKind::Sqlite));
        assert_eq!(config.prefix.as_deref(), Some("users"));
        assert_eq!(config.timezone().unwrap().local_minus_utc(), 7200);
        assert!(config.graph.model("User").is_ok());
    }

    #[test]
    fn test_missing_config_is_empty() {
        let config = Config::load(None).unwrap();
        assert!(config.dialect.is_none());
        assert!(config.graph.models.is_empty());
        assert_eq!(config.timezone().unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_unreadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
