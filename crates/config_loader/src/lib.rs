//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Fill defaults (addresses, timeouts, queue capacity)
//! - Validate configuration legality
//! - Produce a `ManagerConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("brokers.toml")).unwrap();
//! for category in &config.categories {
//!     println!("{}: {:?}", category.category, category.lookup_addresses());
//! }
//! ```

mod parser;
mod validator;

pub use contracts::ManagerConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ManagerConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ManagerConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already built configuration (defaults are filled first)
    pub fn validate(config: ManagerConfig) -> Result<ManagerConfig, ContractError> {
        let config = config.with_defaults();
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize ManagerConfig to TOML string
    pub fn to_toml(config: &ManagerConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ManagerConfig to JSON string
    pub fn to_json(config: &ManagerConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse, fill defaults, then validate
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ManagerConfig, ContractError> {
        let config = parser::parse(content, format)?;
        Self::validate(config)
    }
}
