//! # On-Air Station Library (onair-station)
//!
//! Live internet-radio broadcast engine.
//!
//! **Purpose:** Pick the next track (priority uploads first, otherwise a
//! regular rotation interleaved with a jingle), stream it in paced chunks to
//! every connected listener, and accept operator control over HTTP.
//!
//! **Architecture:** One producer task publishes chunks into a broadcaster
//! holding one bounded buffer per listener. Slow listeners lose chunks; the
//! producer never waits on them.

pub mod api;
pub mod config;
pub mod error;
pub mod radio;
pub mod services;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
