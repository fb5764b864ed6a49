//! Synchronization engine configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How far a single position sample may advance a robot's step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// At most one step per sample
    #[default]
    SingleStep,
    /// Keep advancing while the sample is inside the next goal's tolerance
    MultiStep,
}

/// Synchronization engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Step advancement policy
    #[serde(default)]
    pub advance_policy: AdvancePolicy,

    /// Consecutive passes without progress before a robot is reported stalled
    #[serde(default = "default_stall_pass_threshold")]
    #[validate(range(min = 1, message = "stall_pass_threshold must be >= 1"))]
    pub stall_pass_threshold: u32,
}

fn default_stall_pass_threshold() -> u32 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            advance_policy: AdvancePolicy::default(),
            stall_pass_threshold: default_stall_pass_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.stall_pass_threshold, 50);
    }

    #[test]
    fn test_policy_snake_case() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"advance_policy": "multi_step"}"#).unwrap();
        assert_eq!(config.advance_policy, AdvancePolicy::MultiStep);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = EngineConfig {
            stall_pass_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
