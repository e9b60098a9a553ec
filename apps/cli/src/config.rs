//! CLI configuration
//!
//! Layered, lowest priority first:
//! 1. Built-in defaults
//! 2. Config file (`trackql.toml` in the working directory, or `--config`)
//! 3. `TRACKQL_*` environment variables, e.g. `TRACKQL_LOGGING__LEVEL=debug`
//!    or `TRACKQL_QUERY__MAX_DEPTH=64` (a `.env` file is loaded first)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use trackql_query::QueryConfig;

const DEFAULT_CONFIG_FILE: &str = "trackql.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema used when `--schema` is not given
    pub schema: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the trackql crates; `RUST_LOG` overrides it
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration. An explicit `path` must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("TRACKQL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
