//! Shared building blocks for the Beaty client: domain types, configuration,
//! the top-level error type and the UI event vocabulary.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::BeatyConfig;
pub use error::{BeatyError, Result};
pub use events::UiEvent;
pub use types::*;
