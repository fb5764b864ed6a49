//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use std::path::Path;

use contracts::{ContractError, FleetBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Format of the file at `path`, judged by its extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ContractError::config_parse(format!(
                "{} has no extension, expected .toml or .json",
                path.display()
            )));
        };
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }
}

pub fn parse_toml(content: &str) -> Result<FleetBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<FleetBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<FleetBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

/// Render a blueprint back to text
pub fn render(blueprint: &FleetBlueprint, format: ConfigFormat) -> Result<String, ContractError> {
    match format {
        ConfigFormat::Toml => toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}"))),
        ConfigFormat::Json => serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}"))),
    }
}
