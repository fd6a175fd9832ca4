//! # On-Air Common Library
//!
//! Shared code for the On-Air station service:
//! - Error type shared by all crates
//! - Station event types (`RadioEvent`) and the `EventBus`
//! - Configuration file discovery and TOML loading

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, RadioEvent};
