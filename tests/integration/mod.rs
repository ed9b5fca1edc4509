//! Integration tests for practice-context

mod access_gate;
mod config_integration;
mod resolver_cache;
mod session;
mod sled_store;
mod status_poller;
mod test_utils;
