pub mod schema;
pub mod watcher;

pub use schema::{BufferPolicy, SettingsConfig, StartupConfig, TrendConfig};
pub use watcher::ConfigWatcher;

use std::path::{Path, PathBuf};
use trend_core::{Result, TrendError};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "BETTER_TRENDS_CONFIG";

/// Load configuration from a TOML file.  Returns `TrendConfig::default()` if
/// the file doesn't exist so the engine always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<TrendConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(TrendConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| TrendError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<TrendConfig> {
    let mut config: TrendConfig =
        toml::from_str(raw).map_err(|e| TrendError::Config(format!("TOML parse error: {e}")))?;
    for input in &mut config.inputs {
        *input = input.trim().to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Return the config path: `$BETTER_TRENDS_CONFIG` if set, otherwise the
/// default location honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("better-trends").join("trends.toml")
}
