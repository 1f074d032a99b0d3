use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trend_config::{SettingsConfig, StartupConfig};
use trend_core::{EntityState, StateProvider};

use crate::context::TrendContext;

/// Outcome of the initialization barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every configured settings entity is present.
    Ready,
    /// Retries ran out; the engine proceeds with file values.
    TimedOut,
    /// Shutdown was requested while waiting.
    Cancelled,
}

/// Block until the runtime settings entities exist in the provider.
///
/// Checks once, then retries up to `startup.retries` times, sleeping
/// `startup.retry_delay_ms` between attempts.
pub async fn wait_for_settings<P>(
    provider: &P,
    settings: &SettingsConfig,
    startup: &StartupConfig,
    cancel: &CancellationToken,
) -> Readiness
where
    P: StateProvider + ?Sized,
{
    let required = settings.required_entities();
    if required.is_empty() {
        return Readiness::Ready;
    }

    for attempt in 0..=startup.retries {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|id| !matches!(provider.get(id), Ok(Some(_))))
            .collect();

        if missing.is_empty() {
            info!("Settings entities available after {} attempt(s)", attempt + 1);
            return Readiness::Ready;
        }
        if attempt == startup.retries {
            break;
        }

        info!(
            "Waiting for settings entities {missing:?} (attempt {}/{})",
            attempt + 1,
            startup.retries + 1
        );
        tokio::select! {
            _ = cancel.cancelled() => return Readiness::Cancelled,
            _ = tokio::time::sleep(startup.retry_delay()) => {}
        }
    }

    warn!("Settings entities {required:?} still missing; continuing with configured values");
    Readiness::TimedOut
}

/// Publish `0` to every trend entity so consumers see a defined value
/// before the first window fills.
pub fn seed_outputs<P>(provider: &P, ctx: &TrendContext)
where
    P: StateProvider + ?Sized,
{
    for input in ctx.inputs() {
        match provider.set(&input.output_id, EntityState::from_value(0.0)) {
            Ok(()) => info!("Initialized state for {} to 0.0", input.output_id),
            Err(e) => warn!("Could not seed {}: {e}", input.output_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use trend_config::TrendConfig;
    use trend_core::MemoryStore;

    fn settings() -> SettingsConfig {
        SettingsConfig {
            interval_entity: Some("number.interval".into()),
            steps_entity:    None,
            counter_entity:  None,
        }
    }

    fn startup(retries: u32) -> StartupConfig {
        StartupConfig {
            retries,
            retry_delay_ms: 1000,
            seed_outputs: true,
        }
    }

    #[tokio::test]
    async fn nothing_to_wait_for() {
        let store = MemoryStore::new();
        let ready = wait_for_settings(
            &store,
            &SettingsConfig::default(),
            &startup(0),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(ready, Readiness::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_bounded_retries() {
        let store = MemoryStore::new();
        let started = tokio::time::Instant::now();

        let ready =
            wait_for_settings(&store, &settings(), &startup(3), &CancellationToken::new()).await;

        assert_eq!(ready, Readiness::TimedOut);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn proceeds_once_entity_appears() {
        let store = Arc::new(MemoryStore::new());
        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            writer.insert("number.interval", EntityState::new("5"));
        });

        let ready =
            wait_for_settings(&store, &settings(), &startup(10), &CancellationToken::new()).await;
        assert_eq!(ready, Readiness::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_wait() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let ready = wait_for_settings(&store, &settings(), &startup(10), &cancel).await;
        assert_eq!(ready, Readiness::Cancelled);
    }

    #[test]
    fn seeds_every_output_with_zero() {
        let store = MemoryStore::new();
        let config = TrendConfig {
            inputs: vec!["sensor.a".into(), "sensor.b".into()],
            ..TrendConfig::default()
        };
        let ctx = TrendContext::from_config(&config).unwrap();

        seed_outputs(&store, &ctx);

        assert_eq!(store.state_of("sensor.a_trend").as_deref(), Some("0"));
        assert_eq!(store.state_of("sensor.b_trend").as_deref(), Some("0"));
    }
}
