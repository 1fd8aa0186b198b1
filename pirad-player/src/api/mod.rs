//! REST API and status stream
//!
//! Endpoints live under `/api/v1`, plus `/health` and the `/events` SSE
//! stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext, HardwareInfo};
