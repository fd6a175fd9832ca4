//! HTTP API for the station
//!
//! Exposes the live stream, skip control, schedule management, remote
//! conversion submission and an SSE event feed.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
