//! Trend engine: rolling-window trend calculation driven by a periodic
//! sampler over a host state provider.

pub mod calculator;
pub mod context;
pub mod sampler;
pub mod settings;
pub mod simulate;
pub mod startup;

pub use calculator::TrendCalculator;
pub use context::{TrackedInput, TrendContext};
pub use sampler::{CycleReport, Sampler};
pub use settings::RuntimeSettings;
pub use simulate::{SimulatedHost, Waveform};
pub use startup::Readiness;
