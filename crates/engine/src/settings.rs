//! Runtime overrides for interval and step count.
//!
//! The host can expose two numeric helper entities (for example
//! `number.trend_sensor_interval` and `number.trend_sensor_steps`). They are
//! re-read at the start of every cycle; a usable value wins over the file.

use tracing::warn;
use trend_config::schema::{INTERVAL_RANGE, STEPS_RANGE};
use trend_config::SettingsConfig;
use trend_core::StateProvider;

/// Interval and step count in effect for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub interval_secs: u64,
    pub steps:         usize,
}

/// Read the helper entities, keeping `fallback` for anything unusable.
pub fn resolve<P>(provider: &P, config: &SettingsConfig, fallback: RuntimeSettings) -> RuntimeSettings
where
    P: StateProvider + ?Sized,
{
    let interval_secs = config
        .interval_entity
        .as_deref()
        .and_then(|id| read_bounded(provider, id, *INTERVAL_RANGE.start(), *INTERVAL_RANGE.end()))
        .unwrap_or(fallback.interval_secs);

    let steps = config
        .steps_entity
        .as_deref()
        .and_then(|id| {
            read_bounded(provider, id, *STEPS_RANGE.start() as u64, *STEPS_RANGE.end() as u64)
        })
        .map(|s| s as usize)
        .unwrap_or(fallback.steps);

    RuntimeSettings { interval_secs, steps }
}

/// Whole-number value of `entity_id` within `min..=max`. Fractional states
/// such as `"5.0"` are truncated.
fn read_bounded<P>(provider: &P, entity_id: &str, min: u64, max: u64) -> Option<u64>
where
    P: StateProvider + ?Sized,
{
    let state = match provider.get(entity_id) {
        Ok(Some(state)) => state,
        Ok(None) => {
            warn!("{entity_id} is not available; using configured value");
            return None;
        }
        Err(e) => {
            warn!("Reading {entity_id} failed: {e}; using configured value");
            return None;
        }
    };

    let value = match state.numeric() {
        Ok(v) => v.trunc(),
        Err(e) => {
            warn!("Invalid state for {entity_id}: {e}");
            return None;
        }
    };

    if value < min as f64 || value > max as f64 {
        warn!("{entity_id} = {value} is outside {min}..={max}; ignoring");
        return None;
    }
    Some(value as u64)
}
