//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{FleetBlueprint, SinkType};
use ingestion::Scenario;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    robot_count: usize,
    frame_id: String,
    advance_policy: String,
    sink_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario_events: Option<usize>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    let invalid = |error: String| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        error: Some(error),
        warnings: None,
        summary: None,
    };

    if !args.config.exists() {
        return invalid(format!("File not found: {}", args.config.display()));
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => return invalid(e.to_string()),
    };

    let mut warnings = collect_warnings(&blueprint);

    let scenario_events = match &args.scenario {
        Some(path) => match Scenario::load(path, &blueprint.fleet.robots) {
            Ok(scenario) => {
                warnings.extend(
                    scenario
                        .errors
                        .iter()
                        .map(|e| format!("Scenario record skipped: {}", e)),
                );
                Some(scenario.len())
            }
            Err(e) => return invalid(format!("Scenario {}: {}", path.display(), e)),
        },
        None => None,
    };

    ValidationResult {
        valid: true,
        config_path: config_path.clone(),
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            version: format!("{:?}", blueprint.version),
            robot_count: blueprint.fleet_size(),
            frame_id: blueprint.fleet.frame_id.clone(),
            advance_policy: format!("{:?}", blueprint.engine.advance_policy),
            sink_count: blueprint.sinks.len(),
            scenario_events,
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &FleetBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - synchronized paths will be dropped".to_string());
    }

    if blueprint.fleet_size() == 1 {
        warnings.push(
            "Fleet has a single robot - only self-referencing preconditions can gate it"
                .to_string(),
        );
    }

    if blueprint.engine.stall_pass_threshold < 5 {
        warnings.push(format!(
            "engine.stall_pass_threshold = {} - short waits will be reported as stalls",
            blueprint.engine.stall_pass_threshold
        ));
    }

    for sink in &blueprint.sinks {
        if sink.sink_type == SinkType::File && !sink.params.contains_key("base_path") {
            warnings.push(format!(
                "File sink '{}' has no base_path - writing to ./output",
                sink.name
            ));
        }
        if sink.queue_capacity < blueprint.fleet_size() {
            warnings.push(format!(
                "Sink '{}' queue_capacity = {} is below the fleet size {} - a slow sink may lose a robot's latest path",
                sink.name,
                sink.queue_capacity,
                blueprint.fleet_size()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Robots: {}", summary.robot_count);
            println!("  Frame: {}", summary.frame_id);
            println!("  Advance policy: {}", summary.advance_policy);
            println!("  Sinks: {}", summary.sink_count);
            if let Some(events) = summary.scenario_events {
                println!("  Scenario events: {}", events);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args(config: PathBuf, scenario: Option<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            config,
            scenario,
            json: true,
        }
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let result = validate_config(&args(PathBuf::from("/nonexistent/fleet.toml"), None));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_warnings_for_sinkless_single_robot_fleet() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("fleet.toml");
        std::fs::write(&config, "[fleet]\nrobots = [\"solo\"]\n").unwrap();

        let result = validate_config(&args(config, None));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("No sinks"));
        assert!(warnings[1].contains("single robot"));
    }

    #[test]
    fn test_warns_when_sink_queue_is_smaller_than_fleet() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("fleet.toml");
        std::fs::write(
            &config,
            "[fleet]\nrobots = [\"a\", \"b\", \"c\"]\n\n[[sinks]]\nname = \"log\"\nsink_type = \"log\"\nqueue_capacity = 2\n",
        )
        .unwrap();

        let result = validate_config(&args(config, None));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("queue_capacity = 2"));
    }

    #[test]
    fn test_scenario_errors_become_warnings() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("fleet.toml");
        std::fs::write(
            &config,
            "[fleet]\nrobots = [\"a\", \"b\"]\n\n[[sinks]]\nname = \"log\"\nsink_type = \"log\"\n",
        )
        .unwrap();
        let scenario = dir.path().join("scenario.jsonl");
        std::fs::write(
            &scenario,
            "{\"t\": 0.0, \"type\": \"position\", \"robot\": \"a\", \"x\": 0.0, \"y\": 0.0}\n\
             {\"t\": 0.0, \"type\": \"position\", \"robot\": \"zed\", \"x\": 0.0, \"y\": 0.0}\n",
        )
        .unwrap();

        let result = validate_config(&args(config, Some(scenario)));
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().scenario_events, Some(1));
        assert_eq!(result.warnings.unwrap().len(), 1);
    }
}
