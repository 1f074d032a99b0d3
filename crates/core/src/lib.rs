pub mod error;
pub mod event;
pub mod provider;
pub mod state;

pub use error::{Result, SampleError, TrendError};
pub use event::TrendEvent;
pub use provider::{MemoryStore, StateProvider};
pub use state::{trend_output_id, EntityState, TrendResult};
