use thiserror::Error;

/// Top-level error type used across the entire workspace.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("config error: {0}")]
    Config(String),

    #[error("state provider error: {0}")]
    Provider(String),

    #[error("invalid step count {0}: must be at least 1")]
    InvalidSteps(usize),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = TrendError> = std::result::Result<T, E>;

/// Why a single input was skipped for one sampling cycle.
///
/// These never abort a cycle; the sampler logs them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// The entity does not exist in the state provider.
    #[error("entity not found")]
    Missing,

    /// The entity exists but reports `unknown`, `unavailable` or nothing.
    #[error("state unavailable ({0:?})")]
    Unavailable(String),

    /// The entity reports something that is not a finite number.
    #[error("state is not numeric ({0:?})")]
    NotNumeric(String),

    /// The provider call itself failed.
    #[error("provider failed: {0}")]
    Provider(String),
}
