use crate::{error::SampleError, state::TrendResult};

/// All messages (events) the sampler publishes while it runs.
///
/// Sources:
/// - Sampling cycle       → `TrendUpdated`, `SampleSkipped`, `CycleCompleted`
/// - Runtime settings     → `SettingsChanged`
/// - Config watcher task  → `ConfigApplied`
/// - Cancellation         → `Stopped`
#[derive(Debug, Clone, PartialEq)]
pub enum TrendEvent {
    // ── Sampling ──────────────────────────────────────────────────────────────
    /// A tracked input's window filled and produced a trend value.
    TrendUpdated(TrendResult),
    /// An input was skipped for this cycle.
    SampleSkipped {
        input_id: String,
        reason: SampleError,
    },
    /// One full pass over all tracked inputs finished.
    CycleCompleted {
        sampled: usize,
        skipped: usize,
        emitted: usize,
    },

    // ── Settings ──────────────────────────────────────────────────────────────
    /// Interval or step count changed; buffers were reinitialized if steps did.
    SettingsChanged { interval_secs: u64, steps: usize },

    // ── Config ────────────────────────────────────────────────────────────────
    /// A reloaded config file was applied to the running sampler.
    ConfigApplied { interval_secs: u64, steps: usize },

    // ── Internal ──────────────────────────────────────────────────────────────
    /// The polling loop exited after cancellation.
    Stopped,
}
