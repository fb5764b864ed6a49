//! # Config Loader
//!
//! Reads a fleet configuration (TOML or JSON) into a validated
//! `FleetBlueprint`. Nothing downstream ever sees an unvalidated blueprint.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("fleet.toml")).unwrap();
//! for (index, robot) in blueprint.fleet.robots.iter().enumerate() {
//!     println!("[{index}] {robot}");
//! }
//! ```

mod parser;
mod validator;

pub use contracts::FleetBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a configuration file, choosing the parser by extension
    /// (`.toml` / `.json`)
    ///
    /// # Errors
    /// Unsupported extension, unreadable file, parse or validation failure.
    pub fn load_from_path(path: &Path) -> Result<FleetBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FleetBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &FleetBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Toml)
    }

    pub fn to_json(blueprint: &FleetBlueprint) -> Result<String, ContractError> {
        parser::render(blueprint, ConfigFormat::Json)
    }
}
