//! A stand-in host: an in-memory state store whose tracked inputs follow
//! deterministic waveforms. Lets the engine run without a real platform.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use trend_core::{EntityState, MemoryStore};

/// Shape of one simulated sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub base:      f64,
    pub amplitude: f64,
    /// Ticks per full oscillation.
    pub period:    u32,
    /// Report `unavailable` on every n-th tick.
    pub dropout:   Option<u64>,
    pub unit:      Option<String>,
}

impl Waveform {
    pub fn new(base: f64, amplitude: f64, period: u32) -> Self {
        Self {
            base,
            amplitude,
            period: period.max(1),
            dropout: None,
            unit: None,
        }
    }

    #[must_use]
    pub fn with_dropout(mut self, every: u64) -> Self {
        self.dropout = (every > 0).then_some(every);
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Reading at `step`, rounded to one decimal like a typical host sensor.
    pub fn value_at(&self, step: u64) -> f64 {
        let phase = TAU * (step % u64::from(self.period)) as f64 / f64::from(self.period);
        ((self.base + self.amplitude * phase.sin()) * 10.0).round() / 10.0
    }

    fn state_at(&self, step: u64) -> EntityState {
        let dropped = self.dropout.is_some_and(|n| step > 0 && step % n == 0);
        let state = if dropped {
            EntityState::new("unavailable")
        } else {
            EntityState::from_value(self.value_at(step))
        };
        match &self.unit {
            Some(unit) => state.with_attribute("unit_of_measurement", unit.as_str()),
            None => state,
        }
    }
}

/// Simulated host feeding a shared [`MemoryStore`].
#[derive(Debug)]
pub struct SimulatedHost {
    store:   Arc<MemoryStore>,
    sensors: Vec<(String, Waveform)>,
    step:    u64,
}

impl SimulatedHost {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            sensors: Vec::new(),
            step: 0,
        }
    }

    /// One sensor per id with staggered defaults: base 20, 25, 30, …
    pub fn with_defaults(store: Arc<MemoryStore>, ids: &[String]) -> Self {
        let mut host = Self::new(store);
        for (i, id) in ids.iter().enumerate() {
            let waveform = Waveform::new(20.0 + 5.0 * i as f64, 2.0 + i as f64, 12 + 4 * i as u32)
                .with_unit("°C");
            host.add_sensor(id.clone(), waveform);
        }
        host
    }

    pub fn add_sensor(&mut self, id: impl Into<String>, waveform: Waveform) {
        let id = id.into();
        self.store.insert(id.clone(), waveform.state_at(self.step));
        self.sensors.push((id, waveform));
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Advance every sensor by one tick and write the new states.
    pub fn tick(&mut self) {
        self.step += 1;
        for (id, waveform) in &self.sensors {
            let state = waveform.state_at(self.step);
            debug!("Simulated {id} = {}", state.state);
            self.store.insert(id.clone(), state);
        }
    }

    /// Spawn a background task that ticks once per `period` until `cancel`
    /// fires. A new value on `period` restarts the ticker at that rate.
    pub fn spawn(
        mut self,
        mut period: watch::Receiver<Duration>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = host_ticker(*period.borrow_and_update());
            let mut period_open = true;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    changed = period.changed(), if period_open => {
                        if changed.is_err() {
                            period_open = false;
                            continue;
                        }
                        let next = *period.borrow_and_update();
                        debug!("Simulated host now ticking every {next:?}");
                        ticker = host_ticker(next);
                    }

                    _ = ticker.tick() => self.tick(),
                }
            }
        })
    }
}

/// First tick one full period from now.
fn host_ticker(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    time::interval_at(Instant::now() + period, period)
}
