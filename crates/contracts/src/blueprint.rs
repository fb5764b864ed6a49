//! FleetBlueprint - Config Loader output
//!
//! Describes the complete deployment: robot roster, topic names, engine
//! tuning and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{EngineConfig, RobotIndex, RobotName};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fleet configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FleetBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Robot roster; a robot's position in the list is its index
    #[validate(nested)]
    pub fleet: FleetConfig,

    #[serde(default)]
    #[validate(nested)]
    pub topics: TopicConfig,

    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Robot roster and coordinate frame
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FleetConfig {
    #[serde(default = "default_robots")]
    #[validate(length(min = 1, message = "fleet must contain at least one robot"))]
    pub robots: Vec<RobotName>,

    /// Frame stamped on every published path
    #[serde(default = "default_frame_id")]
    #[validate(length(min = 1, message = "frame_id must not be empty"))]
    pub frame_id: String,
}

fn default_robots() -> Vec<RobotName> {
    vec![RobotName::new("robot_0"), RobotName::new("robot_1")]
}

fn default_frame_id() -> String {
    "map".to_string()
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            robots: default_robots(),
            frame_id: default_frame_id(),
        }
    }
}

/// Per-robot topic names, namespaced under the robot name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TopicConfig {
    /// Output topic carrying synchronized paths
    #[serde(default = "default_path_topic")]
    #[validate(length(min = 1, message = "path_topic must not be empty"))]
    pub path_topic: String,

    /// Input topic carrying segmented plans
    #[serde(default = "default_seg_path_topic")]
    #[validate(length(min = 1, message = "seg_path_topic must not be empty"))]
    pub seg_path_topic: String,

    /// Input topic carrying position samples
    #[serde(default = "default_odom_topic")]
    #[validate(length(min = 1, message = "odom_topic must not be empty"))]
    pub odom_topic: String,
}

fn default_path_topic() -> String {
    "path_synced".to_string()
}

fn default_seg_path_topic() -> String {
    "seg_path".to_string()
}

fn default_odom_topic() -> String {
    "odom".to_string()
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            path_topic: default_path_topic(),
            seg_path_topic: default_seg_path_topic(),
            odom_topic: default_odom_topic(),
        }
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    #[validate(length(min = 1, message = "sink name must not be empty"))]
    pub name: String,

    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be >= 1"))]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output
    File,
    /// Network output (UDP)
    Network,
}

impl FleetBlueprint {
    pub fn fleet_size(&self) -> usize {
        self.fleet.robots.len()
    }

    /// Resolve a robot name to its roster index
    pub fn index_of(&self, name: &str) -> Option<RobotIndex> {
        self.fleet.robots.iter().position(|robot| robot == &name)
    }

    pub fn robot_name(&self, index: RobotIndex) -> Option<&RobotName> {
        self.fleet.robots.get(index)
    }

    /// Fully qualified topic for a robot, e.g. `robot_1/path_synced`
    pub fn path_topic_for(&self, index: RobotIndex) -> Option<String> {
        self.robot_name(index)
            .map(|name| name.topic(&self.topics.path_topic))
    }
}
