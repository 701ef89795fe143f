//! Common types for the AFK Arena code redeemer

mod config;
mod error;

pub use config::{ApiConfig, Config, DEFAULT_BASE_URL, SessionConfig};
pub use error::{Error, Result};
