//! Command implementations.

mod admin;
mod discover;
mod info;
mod publish;
mod validate;

pub use admin::{run_channel, run_topic};
pub use discover::run_discover;
pub use info::run_info;
pub use publish::run_publish;
pub use validate::run_validate;

use std::path::Path;

use contracts::ManagerConfig;

use crate::error::{CliError, Result};

/// Load and validate the configuration at `path`
pub(crate) fn load_config(path: &Path) -> Result<ManagerConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    config_loader::ConfigLoader::load_from_path(path)
        .map_err(|e| CliError::config_load(path.display().to_string(), e))
}

/// Configuration of `category` only, or of every category when `None`
pub(crate) fn select_categories(
    config: ManagerConfig,
    category: Option<&str>,
) -> Result<ManagerConfig> {
    let Some(name) = category else {
        return Ok(config);
    };
    let selected = config
        .category(name)
        .cloned()
        .ok_or_else(|| CliError::unknown_category(name))?;
    Ok(ManagerConfig {
        categories: vec![selected],
    })
}
