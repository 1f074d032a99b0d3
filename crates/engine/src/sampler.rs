use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trend_config::TrendConfig;
use trend_core::{EntityState, Result, SampleError, StateProvider, TrendEvent, TrendResult};

use crate::context::TrendContext;
use crate::settings::{self, RuntimeSettings};
use crate::startup::{self, Readiness};

/// What one pass over the tracked inputs did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Inputs that produced a numeric sample.
    pub sampled:          usize,
    pub skipped:          Vec<(String, SampleError)>,
    pub emitted:          Vec<TrendResult>,
    /// The effective interval changed; the ticker must be rebuilt.
    pub interval_changed: bool,
}

/// Periodic sampler: reads every tracked input from the provider, feeds the
/// windows, and publishes trends.
pub struct Sampler<P> {
    provider: P,
    ctx:      TrendContext,
    config:   TrendConfig,
    settings: RuntimeSettings,
    events:   Option<mpsc::Sender<TrendEvent>>,
}

impl<P: StateProvider + 'static> Sampler<P> {
    pub fn new(provider: P, config: TrendConfig) -> Result<Self> {
        config.validate()?;
        let ctx = TrendContext::from_config(&config)?;
        Ok(Self {
            provider,
            ctx,
            settings: file_settings(&config),
            config,
            events: None,
        })
    }

    /// Forward [`TrendEvent`]s to `tx`. Events are dropped when the channel is full.
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<TrendEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn context(&self) -> &TrendContext {
        &self.ctx
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.settings
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval_secs)
    }

    /// Initialization barrier: wait for the settings entities, pick up their
    /// values, then seed the trend entities.
    pub async fn prepare(&mut self, cancel: &CancellationToken) -> Readiness {
        let readiness = startup::wait_for_settings(
            &self.provider,
            &self.config.settings,
            &self.config.startup,
            cancel,
        )
        .await;
        if readiness == Readiness::Cancelled {
            return readiness;
        }

        let resolved = settings::resolve(
            &self.provider,
            &self.config.settings,
            file_settings(&self.config),
        );
        self.apply_settings(resolved);

        if self.config.startup.seed_outputs {
            startup::seed_outputs(&self.provider, &self.ctx);
        }
        readiness
    }

    /// One sampling pass over every tracked input. Never fails: problems
    /// with individual inputs are logged and reported as skips.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let resolved = settings::resolve(
            &self.provider,
            &self.config.settings,
            file_settings(&self.config),
        );
        report.interval_changed = self.apply_settings(resolved);

        debug!("Processing trends for {} input(s)", self.ctx.len());
        for id in self.ctx.ids() {
            match self.sample(&id) {
                Ok(Some(result)) => {
                    report.sampled += 1;
                    self.emit(TrendEvent::TrendUpdated(result.clone()));
                    report.emitted.push(result);
                }
                Ok(None) => report.sampled += 1,
                Err(reason) => {
                    warn!("Skipping {id}: {reason}");
                    self.emit(TrendEvent::SampleSkipped {
                        input_id: id.clone(),
                        reason:   reason.clone(),
                    });
                    report.skipped.push((id, reason));
                }
            }
        }

        if let Some(counter) = &self.config.settings.counter_entity {
            // An input that emitted this cycle held a full window before its policy ran.
            let level = if report.emitted.is_empty() {
                self.ctx.fill_level()
            } else {
                self.ctx.steps()
            };
            if let Err(e) = self.provider.set(counter, EntityState::from_value(level as f64)) {
                error!("Publishing step counter to {counter} failed: {e}");
            }
        }

        self.emit(TrendEvent::CycleCompleted {
            sampled: report.sampled,
            skipped: report.skipped.len(),
            emitted: report.emitted.len(),
        });
        report
    }

    /// Swap in a reloaded config. Returns `true` if the effective interval
    /// changed. An invalid config is rejected and the current one kept.
    pub fn apply_config(&mut self, config: TrendConfig) -> Result<bool> {
        config.validate()?;

        let resolved = settings::resolve(&self.provider, &config.settings, file_settings(&config));
        let mut effective = config.clone();
        effective.steps = resolved.steps;
        self.ctx.apply_config(&effective)?;

        let interval_changed = resolved.interval_secs != self.settings.interval_secs;
        self.settings = resolved;
        self.config = config;

        info!(
            "Config applied: {} input(s), interval {}s, steps {}",
            self.ctx.len(),
            self.settings.interval_secs,
            self.settings.steps
        );
        self.emit(TrendEvent::ConfigApplied {
            interval_secs: self.settings.interval_secs,
            steps:         self.settings.steps,
        });
        Ok(interval_changed)
    }

    /// Spawn the polling loop on the current tokio runtime.
    pub fn spawn(
        self,
        config_rx: watch::Receiver<TrendConfig>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(config_rx, cancel))
    }

    /// The polling loop: startup barrier, then one cycle per tick until
    /// `cancel` fires. Config updates arrive over `config_rx`; an interval
    /// change restarts the ticker without restarting the task.
    pub async fn run(mut self, mut config_rx: watch::Receiver<TrendConfig>, cancel: CancellationToken) {
        if self.prepare(&cancel).await == Readiness::Cancelled {
            self.emit(TrendEvent::Stopped);
            return;
        }

        let mut ticker = new_ticker(self.interval(), false);
        let mut config_open = true;
        info!("Sampler running every {}s", self.settings.interval_secs);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                changed = config_rx.changed(), if config_open => {
                    if changed.is_err() {
                        debug!("Config channel closed; keeping current config");
                        config_open = false;
                        continue;
                    }
                    let config = config_rx.borrow_and_update().clone();
                    match self.apply_config(config) {
                        Ok(true) => {
                            info!("Interval changed to {}s; restarting ticker", self.settings.interval_secs);
                            ticker = new_ticker(self.interval(), true);
                        }
                        Ok(false) => {}
                        Err(e) => error!("Rejected config update: {e}"),
                    }
                }

                _ = ticker.tick() => {
                    let report = self.run_cycle();
                    if report.interval_changed {
                        info!("Interval changed to {}s; restarting ticker", self.settings.interval_secs);
                        ticker = new_ticker(self.interval(), true);
                    }
                }
            }
        }

        info!("Sampler stopped");
        self.emit(TrendEvent::Stopped);
    }

    fn sample(&mut self, id: &str) -> std::result::Result<Option<TrendResult>, SampleError> {
        let state = self
            .provider
            .get(id)
            .map_err(|e| SampleError::Provider(e.to_string()))?
            .ok_or(SampleError::Missing)?;
        let value = state.numeric()?;

        let Some(trend) = self.ctx.observe(id, value) else {
            debug!("{id}: buffered {value}");
            return Ok(None);
        };

        let output_id = self
            .ctx
            .get(id)
            .map(|input| input.output_id.clone())
            .ok_or(SampleError::Missing)?;

        let published = EntityState::from_value(trend).with_attributes(state.inherited_attributes());
        match self.provider.set(&output_id, published) {
            Ok(()) => info!("Updated trend for {id}: {trend}"),
            Err(e) => error!("Publishing trend to {output_id} failed: {e}"),
        }

        Ok(Some(TrendResult {
            input_id: id.to_string(),
            output_id,
            value: trend,
        }))
    }

    /// Adopt new runtime settings. Returns `true` if the interval changed.
    fn apply_settings(&mut self, next: RuntimeSettings) -> bool {
        if next == self.settings {
            return false;
        }

        let mut applied = next;
        if let Err(e) = self.ctx.set_steps(next.steps) {
            error!("Cannot apply step count {}: {e}", next.steps);
            applied.steps = self.settings.steps;
        }

        let interval_changed = applied.interval_secs != self.settings.interval_secs;
        info!(
            "Settings changed: interval {}s → {}s, steps {} → {}",
            self.settings.interval_secs, applied.interval_secs, self.settings.steps, applied.steps
        );
        self.settings = applied;
        self.emit(TrendEvent::SettingsChanged {
            interval_secs: applied.interval_secs,
            steps:         applied.steps,
        });
        interval_changed
    }

    fn emit(&self, event: TrendEvent) {
        let Some(tx) = &self.events else { return };
        if let Err(mpsc::error::TrySendError::Full(event)) = tx.try_send(event) {
            debug!("Event channel full; dropping {event:?}");
        }
    }
}

fn file_settings(config: &TrendConfig) -> RuntimeSettings {
    RuntimeSettings {
        interval_secs: config.interval_secs,
        steps:         config.steps,
    }
}

/// A ticker that fires immediately, or only after one full `period` when
/// `delayed` (used after a restart so the cycle that caused it isn't repeated).
fn new_ticker(period: Duration, delayed: bool) -> Interval {
    let start = if delayed { Instant::now() + period } else { Instant::now() };
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
