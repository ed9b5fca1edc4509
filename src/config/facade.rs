//! Entry point for loading a [`ContextConfig`].

use super::merge::builder_with_defaults;
use super::sources::{env, global_file, workspace_file};
use super::ContextConfig;
use crate::error::ApiError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest to highest: defaults, global file, workspace
    /// `config/config.toml`, workspace `config/{env}.toml`, environment.
    pub fn load(workspace_root: &Path) -> Result<ContextConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);

        let config: ContextConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "configuration loaded");
        Ok(config)
    }

    /// Load a single file over the defaults.
    pub fn load_from_file(path: &Path) -> Result<ContextConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Path of the user-level configuration file, if a home can be determined.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    pub fn default() -> ContextConfig {
        ContextConfig::default()
    }
}
