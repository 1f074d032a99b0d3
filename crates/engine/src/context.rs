use std::collections::BTreeMap;

use tracing::{debug, info};
use trend_config::{BufferPolicy, TrendConfig};
use trend_core::{trend_output_id, Result};

use crate::calculator::TrendCalculator;

/// One tracked input and its rolling window.
#[derive(Debug, Clone)]
pub struct TrackedInput {
    pub id:         String,
    /// Entity the trend is published to.
    pub output_id:  String,
    pub calculator: TrendCalculator,
    pub last_trend: Option<f64>,
}

/// Per-process context: owns every tracked input's window.
///
/// The sampler task is the only writer, so nothing here is shared or locked.
#[derive(Debug)]
pub struct TrendContext {
    inputs:        BTreeMap<String, TrackedInput>,
    steps:         usize,
    precision:     u32,
    policy:        BufferPolicy,
    output_suffix: String,
}

impl TrendContext {
    pub fn from_config(config: &TrendConfig) -> Result<Self> {
        let mut ctx = Self {
            inputs:        BTreeMap::new(),
            steps:         config.steps,
            precision:     config.precision,
            policy:        config.policy,
            output_suffix: config.output_suffix.clone(),
        };
        ctx.sync_inputs(&config.inputs)?;
        Ok(ctx)
    }

    /// Make the tracked set match `ids`: new inputs start with an empty
    /// window, removed ones are dropped, the rest keep their samples.
    pub fn sync_inputs(&mut self, ids: &[String]) -> Result<()> {
        let before = self.inputs.len();
        self.inputs.retain(|id, _| ids.contains(id));
        let removed = before - self.inputs.len();

        let mut added = 0;
        for id in ids {
            if self.inputs.contains_key(id) {
                continue;
            }
            let calculator = TrendCalculator::new(self.steps, self.precision, self.policy)?;
            self.inputs.insert(
                id.clone(),
                TrackedInput {
                    id:         id.clone(),
                    output_id:  trend_output_id(id, &self.output_suffix),
                    calculator,
                    last_trend: None,
                },
            );
            debug!("Tracking {id}");
            added += 1;
        }

        if added > 0 || removed > 0 {
            info!("Tracked inputs updated: {added} added, {removed} removed");
        }
        Ok(())
    }

    /// Change the window size of every input. Returns `true` if it changed,
    /// in which case all partial windows were discarded.
    pub fn set_steps(&mut self, steps: usize) -> Result<bool> {
        if steps == self.steps {
            return Ok(false);
        }
        for input in self.inputs.values_mut() {
            input.calculator.resize(steps)?;
        }
        info!("Steps changed from {} to {steps}; windows reinitialized", self.steps);
        self.steps = steps;
        Ok(true)
    }

    /// Apply the window-related parts of a (re)loaded config.
    pub fn apply_config(&mut self, config: &TrendConfig) -> Result<()> {
        if config.output_suffix != self.output_suffix {
            self.output_suffix = config.output_suffix.clone();
            for input in self.inputs.values_mut() {
                input.output_id = trend_output_id(&input.id, &self.output_suffix);
            }
        }

        self.precision = config.precision;
        self.policy = config.policy;
        for input in self.inputs.values_mut() {
            input.calculator.set_precision(config.precision);
            input.calculator.set_policy(config.policy);
        }

        self.set_steps(config.steps)?;
        self.sync_inputs(&config.inputs)
    }

    /// Feed one sample; returns the trend when the input's window filled.
    /// Unknown ids are ignored.
    pub fn observe(&mut self, id: &str, value: f64) -> Option<f64> {
        let input = self.inputs.get_mut(id)?;
        let trend = input.calculator.observe(value);
        if trend.is_some() {
            input.last_trend = trend;
        }
        trend
    }

    pub fn get(&self, id: &str) -> Option<&TrackedInput> {
        self.inputs.get(id)
    }

    /// Tracked inputs in id order.
    pub fn inputs(&self) -> impl Iterator<Item = &TrackedInput> {
        self.inputs.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Highest window fill level across inputs (the "current step").
    pub fn fill_level(&self) -> usize {
        self.inputs
            .values()
            .map(|i| i.calculator.len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(inputs: &[&str], steps: usize) -> TrendConfig {
        TrendConfig {
            steps,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..TrendConfig::default()
        }
    }

    #[test]
    fn builds_one_window_per_input() {
        let ctx = TrendContext::from_config(&config(&["sensor.b", "sensor.a"], 3)).unwrap();
        assert_eq!(ctx.ids(), vec!["sensor.a", "sensor.b"]);
        assert_eq!(ctx.get("sensor.a").unwrap().output_id, "sensor.a_trend");
        assert_eq!(ctx.fill_level(), 0);
    }

    #[test]
    fn inputs_are_independent() {
        let mut ctx = TrendContext::from_config(&config(&["sensor.a", "sensor.b"], 2)).unwrap();
        assert_eq!(ctx.observe("sensor.a", 1.0), None);
        assert_eq!(ctx.observe("sensor.a", 3.0), Some(1.0));
        assert_eq!(ctx.observe("sensor.b", 5.0), None);
        assert_eq!(ctx.get("sensor.b").unwrap().calculator.len(), 1);
        assert_eq!(ctx.get("sensor.a").unwrap().last_trend, Some(1.0));
    }

    #[test]
    fn unknown_input_ignored() {
        let mut ctx = TrendContext::from_config(&config(&["sensor.a"], 1)).unwrap();
        assert_eq!(ctx.observe("sensor.zzz", 1.0), None);
    }

    #[test]
    fn sync_keeps_existing_windows() {
        let mut ctx = TrendContext::from_config(&config(&["sensor.a", "sensor.b"], 3)).unwrap();
        ctx.observe("sensor.a", 1.0);

        ctx.sync_inputs(&["sensor.a".to_string(), "sensor.c".to_string()])
            .unwrap();

        assert_eq!(ctx.ids(), vec!["sensor.a", "sensor.c"]);
        assert_eq!(ctx.get("sensor.a").unwrap().calculator.len(), 1);
        assert!(ctx.get("sensor.c").unwrap().calculator.is_empty());
    }

    #[test]
    fn step_change_reinitializes_windows() {
        let mut ctx = TrendContext::from_config(&config(&["sensor.a"], 3)).unwrap();
        ctx.observe("sensor.a", 1.0);
        ctx.observe("sensor.a", 2.0);
        assert_eq!(ctx.fill_level(), 2);

        assert!(!ctx.set_steps(3).unwrap());
        assert_eq!(ctx.fill_level(), 2);

        assert!(ctx.set_steps(2).unwrap());
        assert_eq!(ctx.fill_level(), 0);
        assert_eq!(ctx.observe("sensor.a", 4.0), None);
        assert_eq!(ctx.observe("sensor.a", 6.0), Some(1.0));
    }

    #[test]
    fn apply_config_renames_outputs() {
        let mut ctx = TrendContext::from_config(&config(&["sensor.a"], 3)).unwrap();
        let mut next = config(&["sensor.a"], 3);
        next.output_suffix = "_last".into();

        ctx.apply_config(&next).unwrap();
        assert_eq!(ctx.get("sensor.a").unwrap().output_id, "sensor.a_last");
    }
}
