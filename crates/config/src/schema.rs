use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use trend_core::{Result, TrendError};

/// Accepted range for the sampling interval, in seconds.
pub const INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 1..=3600;
/// Accepted range for the window size (step count).
pub const STEPS_RANGE: std::ops::RangeInclusive<usize> = 1..=100;
/// Accepted range for the number of decimals a trend is rounded to.
pub const PRECISION_RANGE: std::ops::RangeInclusive<u32> = 0..=6;

/// Root configuration structure parsed from `trends.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Seconds between two sampling cycles.
    pub interval_secs: u64,
    /// Number of samples in each input's window.
    pub steps: usize,
    /// Decimals a trend value is rounded to.
    pub precision: u32,
    /// What happens to a window after it emits.
    pub policy: BufferPolicy,
    /// Appended to an input id to name its trend entity.
    pub output_suffix: String,
    /// Entity ids of the tracked inputs.
    pub inputs: Vec<String>,
    /// Optional helper entities that override interval/steps at runtime.
    pub settings: SettingsConfig,
    /// Initialization barrier tuning.
    pub startup: StartupConfig,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            steps: 10,
            precision: 2,
            policy: BufferPolicy::Reset,
            output_suffix: "_trend".to_string(),
            inputs: Vec::new(),
            settings: SettingsConfig::default(),
            startup: StartupConfig::default(),
        }
    }
}

impl TrendConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Check bounds and input list sanity.
    pub fn validate(&self) -> Result<()> {
        if !INTERVAL_RANGE.contains(&self.interval_secs) {
            return Err(TrendError::Config(format!(
                "interval_secs {} outside {}..={}",
                self.interval_secs,
                INTERVAL_RANGE.start(),
                INTERVAL_RANGE.end()
            )));
        }
        if !STEPS_RANGE.contains(&self.steps) {
            return Err(TrendError::Config(format!(
                "steps {} outside {}..={}",
                self.steps,
                STEPS_RANGE.start(),
                STEPS_RANGE.end()
            )));
        }
        if !PRECISION_RANGE.contains(&self.precision) {
            return Err(TrendError::Config(format!(
                "precision {} outside {}..={}",
                self.precision,
                PRECISION_RANGE.start(),
                PRECISION_RANGE.end()
            )));
        }
        if self.output_suffix.trim().is_empty() {
            return Err(TrendError::Config("output_suffix must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            let id = input.trim();
            if id.is_empty() {
                return Err(TrendError::Config("blank entry in inputs".into()));
            }
            if !seen.insert(id) {
                return Err(TrendError::Config(format!("duplicate input '{id}'")));
            }
        }
        Ok(())
    }
}

/// Window handling once a trend has been emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BufferPolicy {
    /// Clear the window; the next trend needs a full new window.
    #[default]
    Reset,
    /// Drop the oldest sample; every following cycle emits.
    Slide,
}

/// Helper entities in the state provider that hold runtime settings.
/// Any entity left unset keeps the value from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SettingsConfig {
    pub interval_entity: Option<String>,
    pub steps_entity: Option<String>,
    /// Receives the current window fill level after every cycle.
    pub counter_entity: Option<String>,
}

impl SettingsConfig {
    /// Entities the startup barrier waits for.
    pub fn required_entities(&self) -> Vec<&str> {
        [&self.interval_entity, &self.steps_entity]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Extra attempts after the first check for the settings entities.
    pub retries: u32,
    /// Delay between two attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Publish `0` to every trend entity before the first cycle.
    pub seed_outputs: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            retries: 10,
            retry_delay_ms: 1000,
            seed_outputs: true,
        }
    }
}

impl StartupConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
