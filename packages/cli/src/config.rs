use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_CONFIG_NAME: &str = "cord.config.json";

/// Cord configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Top-level fields kept whole by `flatten`, on top of the built-in atomic fields
    #[serde(default)]
    pub no_expand_fields: Vec<String>,

    /// Depth of the history used by `replay`
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Log level when `--verbose` is not given (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Run the conflict gate before `apply`
    #[serde(default = "default_enforce_conflict_gate")]
    pub enforce_conflict_gate: bool,
}

fn default_undo_levels() -> usize {
    100
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_enforce_conflict_gate() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Parsed `logLevel`, falling back to warn for unknown names
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::WARN)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            no_expand_fields: vec![],
            undo_levels: default_undo_levels(),
            log_level: default_log_level(),
            enforce_conflict_gate: default_enforce_conflict_gate(),
        }
    }
}
