//! Configuration system (layered: code > env > config file).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::convert::Dialect;
use crate::error::RociError;

/// Global default config (lazy-initialized from file and env).
static DEFAULT_CONFIG: OnceLock<AgentsConfig> = OnceLock::new();

/// Layered configuration for model clients and runs.
///
/// Resolution order, highest first:
/// 1. Values set in code (`with_*`)
/// 2. Environment variables (after loading `.env`)
/// 3. `~/.roci/agents.toml`
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub dialect: Option<Dialect>,
    pub max_turns: Option<usize>,
    pub stream_buffer: Option<usize>,
}

impl fmt::Debug for AgentsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("dialect", &self.dialect)
            .field("max_turns", &self.max_turns)
            .field("stream_buffer", &self.stream_buffer)
            .finish()
    }
}

impl AgentsConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".roci"))
            .unwrap_or_else(|| PathBuf::from(".roci"))
            .join("agents.toml")
    }

    /// Parse a TOML config file. A missing file yields an empty config.
    pub fn from_file(path: &Path) -> Result<Self, RociError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&raw).map_err(|e| {
            RociError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self, RociError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from a variable lookup using the same names as [`Self::from_env`].
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, RociError> {
        let dialect = get("ROCI_AGENTS_DIALECT")
            .map(|raw| {
                raw.parse::<Dialect>().map_err(|_| {
                    RociError::Configuration(format!(
                        "ROCI_AGENTS_DIALECT must be 'responses' or 'chat_completions', got '{raw}'"
                    ))
                })
            })
            .transpose()?;
        Ok(Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL"),
            default_model: get("ROCI_AGENTS_MODEL"),
            dialect,
            max_turns: parse_count(&get, "ROCI_AGENTS_MAX_TURNS")?,
            stream_buffer: parse_count(&get, "ROCI_AGENTS_STREAM_BUFFER")?,
        })
    }

    /// Config file, then environment on top.
    pub fn load() -> Result<Self, RociError> {
        let file = Self::from_file(&Self::default_path())?;
        Ok(file.merge(Self::from_env()?))
    }

    /// Get (or create) the global default config.
    pub fn global() -> &'static AgentsConfig {
        DEFAULT_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|err| {
                warn!(error = %err, "ignoring invalid agents configuration");
                Self::default()
            })
        })
    }

    /// Layer `higher` over `self`; its set fields win.
    pub fn merge(self, higher: AgentsConfig) -> AgentsConfig {
        AgentsConfig {
            api_key: higher.api_key.or(self.api_key),
            base_url: higher.base_url.or(self.base_url),
            default_model: higher.default_model.or(self.default_model),
            dialect: higher.dialect.or(self.dialect),
            max_turns: higher.max_turns.or(self.max_turns),
            stream_buffer: higher.stream_buffer.or(self.stream_buffer),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = Some(capacity);
        self
    }
}

fn parse_count(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<usize>, RociError> {
    match get(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(RociError::Configuration(format!(
                "{name} must be a positive integer, got '{raw}'"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let config = AgentsConfig::from_vars(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("ROCI_AGENTS_MODEL", "gpt-4o"),
            ("ROCI_AGENTS_DIALECT", "chat_completions"),
            ("ROCI_AGENTS_MAX_TURNS", "4"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.dialect, Some(Dialect::ChatCompletions));
        assert_eq!(config.max_turns, Some(4));
        assert_eq!(config.stream_buffer, None);
    }

    #[test]
    fn rejects_bad_numbers_and_dialects() {
        let err = AgentsConfig::from_vars(lookup(&[("ROCI_AGENTS_MAX_TURNS", "0")])).unwrap_err();
        assert!(matches!(err, RociError::Configuration(_)));
        let err = AgentsConfig::from_vars(lookup(&[("ROCI_AGENTS_DIALECT", "grpc")])).unwrap_err();
        assert!(matches!(err, RociError::Configuration(_)));
    }

    #[test]
    fn merge_prefers_higher_layer() {
        let file = AgentsConfig::default()
            .with_default_model("from-file")
            .with_max_turns(3);
        let env = AgentsConfig::default().with_default_model("from-env");

        let merged = file.merge(env);

        assert_eq!(merged.default_model.as_deref(), Some("from-env"));
        assert_eq!(merged.max_turns, Some(3));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AgentsConfig::default().with_api_key("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
