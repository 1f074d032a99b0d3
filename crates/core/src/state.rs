use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SampleError;

/// Raw states the host uses when an entity has no usable reading.
const UNAVAILABLE_STATES: [&str; 2] = ["unknown", "unavailable"];

/// Attributes copied from a tracked input onto its derived trend entity.
pub const INHERITED_ATTRIBUTES: [&str; 2] = ["unit_of_measurement", "friendly_name"];

/// A snapshot of one host entity, as stored by the state provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Raw state string, e.g. `"21.4"` or `"unavailable"`.
    pub state: String,
    /// Free-form attributes (unit, friendly name, ...).
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// When the state was last written.
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
            last_updated: Utc::now(),
        }
    }

    /// State holding a numeric reading.
    pub fn from_value(value: f64) -> Self {
        Self::new(value.to_string())
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Interpret the raw state as a finite number.
    pub fn numeric(&self) -> Result<f64, SampleError> {
        let raw = self.state.trim();
        if raw.is_empty() || UNAVAILABLE_STATES.contains(&raw) {
            return Err(SampleError::Unavailable(raw.to_string()));
        }

        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(SampleError::NotNumeric(raw.to_string())),
        }
    }

    /// The subset of attributes a derived entity should carry over.
    pub fn inherited_attributes(&self) -> Map<String, Value> {
        INHERITED_ATTRIBUTES
            .iter()
            .filter_map(|key| {
                self.attributes
                    .get(*key)
                    .map(|v| ((*key).to_string(), v.clone()))
            })
            .collect()
    }
}

/// One emitted trend value for a tracked input.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendResult {
    pub input_id: String,
    pub output_id: String,
    /// `latest - mean(window)`, rounded to the configured precision.
    pub value: f64,
}

/// Entity id of the derived trend entity, e.g. `sensor.outdoor` → `sensor.outdoor_trend`.
pub fn trend_output_id(input_id: &str, suffix: &str) -> String {
    format!("{input_id}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parses_plain_numbers() {
        assert_eq!(EntityState::new("21.5").numeric(), Ok(21.5));
        assert_eq!(EntityState::new(" -3 ").numeric(), Ok(-3.0));
    }

    #[test]
    fn numeric_rejects_host_sentinels() {
        assert_eq!(
            EntityState::new("unavailable").numeric(),
            Err(SampleError::Unavailable("unavailable".into()))
        );
        assert_eq!(
            EntityState::new("unknown").numeric(),
            Err(SampleError::Unavailable("unknown".into()))
        );
        assert_eq!(
            EntityState::new("").numeric(),
            Err(SampleError::Unavailable(String::new()))
        );
    }

    #[test]
    fn numeric_rejects_garbage_and_non_finite() {
        assert_eq!(
            EntityState::new("on").numeric(),
            Err(SampleError::NotNumeric("on".into()))
        );
        assert!(matches!(
            EntityState::new("NaN").numeric(),
            Err(SampleError::NotNumeric(_))
        ));
        assert!(matches!(
            EntityState::new("inf").numeric(),
            Err(SampleError::NotNumeric(_))
        ));
    }

    #[test]
    fn inherited_attributes_keeps_only_known_keys() {
        let state = EntityState::new("20")
            .with_attribute("unit_of_measurement", "°C")
            .with_attribute("device_class", "temperature");

        let inherited = state.inherited_attributes();
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited["unit_of_measurement"], "°C");
    }

    #[test]
    fn output_id_appends_suffix() {
        assert_eq!(
            trend_output_id("sensor.outdoor", "_trend"),
            "sensor.outdoor_trend"
        );
    }
}
