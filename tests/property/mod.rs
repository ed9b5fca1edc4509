//! Property-based tests for gate and permission guarantees

mod access_properties;
mod permission_properties;
