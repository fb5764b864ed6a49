//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::FleetBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    frame_id: String,
    robots: Vec<RobotInfo>,
    engine: EngineInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct RobotInfo {
    index: usize,
    name: String,
    path_topic: String,
    seg_path_topic: String,
    odom_topic: String,
}

#[derive(Serialize)]
struct EngineInfo {
    advance_policy: String,
    stall_pass_threshold: u32,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args.sinks);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args.sinks);
    }

    Ok(())
}

fn build_config_info(blueprint: &FleetBlueprint, with_sinks: bool) -> ConfigInfo {
    let topics = &blueprint.topics;
    let robots = blueprint
        .fleet
        .robots
        .iter()
        .enumerate()
        .map(|(index, robot)| RobotInfo {
            index,
            name: robot.to_string(),
            path_topic: robot.topic(&topics.path_topic),
            seg_path_topic: robot.topic(&topics.seg_path_topic),
            odom_topic: robot.topic(&topics.odom_topic),
        })
        .collect();

    let sinks = if with_sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
                params: s.params.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        frame_id: blueprint.fleet.frame_id.clone(),
        robots,
        engine: EngineInfo {
            advance_policy: format!("{:?}", blueprint.engine.advance_policy),
            stall_pass_threshold: blueprint.engine.stall_pass_threshold,
        },
        sinks,
    }
}

fn print_config_info(blueprint: &FleetBlueprint, with_sinks: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Route Sync Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let topics = &blueprint.topics;

    println!("🤖 Fleet ({} robots)", blueprint.fleet_size());
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Frame: {}", blueprint.fleet.frame_id);
    for (i, robot) in blueprint.fleet.robots.iter().enumerate() {
        let is_last = i == blueprint.fleet.robots.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} [{}] {}", prefix, i, robot);
        println!("   {}  ├─ in:  {}", child_prefix, robot.topic(&topics.seg_path_topic));
        println!("   {}  ├─ in:  {}", child_prefix, robot.topic(&topics.odom_topic));
        println!("   {}  └─ out: {}", child_prefix, robot.topic(&topics.path_topic));
    }

    println!("\n⚙️  Engine");
    println!("   ├─ Advance policy: {:?}", blueprint.engine.advance_policy);
    println!(
        "   └─ Stall threshold: {} observations",
        blueprint.engine.stall_pass_threshold
    );

    if blueprint.sinks.is_empty() {
        println!("\n📤 Sinks: none");
    } else {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if with_sinks {
                println!(
                    "   {} {} ({:?}, queue {}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_info_namespaces_topics() {
        let blueprint = FleetBlueprint::default();
        let info = build_config_info(&blueprint, false);

        assert_eq!(info.robots.len(), 2);
        assert_eq!(info.robots[1].path_topic, "robot_1/path_synced");
        assert_eq!(info.robots[1].odom_topic, "robot_1/odom");
        assert_eq!(info.engine.advance_policy, "SingleStep");
        assert!(info.sinks.is_empty());
    }
}
