//! practice-context: Unified Identity Context Resolution
//!
//! Resolves an authenticated principal (an account owner or a delegate acting
//! for one) into a single context, caches it with time-bound freshness,
//! decides route access from it, evaluates fine-grained permissions, and polls
//! the connection status of an external messaging session on an adaptive
//! schedule.

pub mod access;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod permissions;
pub mod resolver;
pub mod session;
pub mod status;
pub mod store;
pub mod types;
