//! Connection Status Poller
//!
//! Adaptive-interval polling of an external messaging session's status,
//! backed by the shared [`CacheService`](crate::cache::CacheService). The
//! refresh interval of a subject depends on its last observed state; a
//! background [`StatusMonitor`] re-checks on that schedule and never fails
//! outward, degrading to an `Error` status instead.

mod http;
mod monitor;
mod poller;
mod provider;
mod schedule;
mod types;

pub use http::HttpStatusProvider;
pub use monitor::StatusMonitor;
pub use poller::StatusPoller;
pub use provider::{ConnectionStatusProvider, ScriptedStatusProvider};
pub use schedule::{refresh_interval, PollerConfig};
pub use types::{ConnectionState, ConnectionStatus, RawStatusPayload};
