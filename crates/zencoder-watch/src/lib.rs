//! Job watch engine for the Zencoder client.
//!
//! This crate provides:
//! - A polling scheduler that delivers exactly one terminal result per job
//! - State classification independent of the queue
//! - Callback and future based completion
//! - Bounded per-tick work and retry of transient poll failures
//! - Start/stop lifecycle with manually drivable ticks

pub mod backend;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod pending;


pub use backend::JobBackend;
pub use classify::{classify, Outcome, Transition};
pub use config::WatchConfig;
pub use engine::{TickSummary, WatchEngine};
pub use error::{WatchError, WatchResult};
pub use handle::WatchHandle;
