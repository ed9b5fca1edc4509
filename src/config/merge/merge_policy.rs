//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Section structs carry serde defaults too; the values here are the ones
/// operators most often override and are listed so `config` can type them.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("cache.context_ttl_secs", 300_i64)?
        .set_default("cache.forced_ttl_secs", 1_i64)?
        .set_default("resolver.max_attempts", 3_i64)?
        .set_default("resolver.attempt_timeout_secs", 15_i64)?
        .set_default("resolver.backoff_step_ms", 1000_i64)?
        .set_default("routes.app_prefix", "/app")?
        .set_default("routes.public_entry", "/")?
        .set_default("poller.throttle_secs", 5_i64)
}
