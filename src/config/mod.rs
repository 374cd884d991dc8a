//! Reactor configuration: buffer capacities and overflow policy.

mod loader;
mod types;

pub use loader::{ConfigError, CONFIG_ENV};
pub use types::{OverflowPolicy, ReactorConfig};
