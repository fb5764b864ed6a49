//! Configuration validation
//!
//! Rules:
//! - derive rules on the blueprint types (lengths, ranges)
//! - robot names unique and usable as topic namespaces
//! - sink names unique and non-empty
//! - network sinks carry a parseable `addr`

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, FleetBlueprint, SinkType};
use ::validator::Validate;

/// Validate a FleetBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &FleetBlueprint) -> Result<(), ContractError> {
    validate_derived(blueprint)?;
    validate_robot_names(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_derived(blueprint: &FleetBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Names end up in topics (`<robot>/path_synced`), so they must be unique
/// single path components.
fn validate_robot_names(blueprint: &FleetBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, robot) in blueprint.fleet.robots.iter().enumerate() {
        if robot.is_empty() {
            return Err(ContractError::config_validation(
                format!("fleet.robots[{}]", idx),
                "robot name cannot be empty",
            ));
        }
        if robot.contains('/') || robot.chars().any(char::is_whitespace) {
            return Err(ContractError::config_validation(
                format!("fleet.robots[{}]", idx),
                format!("robot name '{}' must not contain '/' or whitespace", robot),
            ));
        }
        if !seen.insert(robot.as_str()) {
            return Err(ContractError::config_validation(
                format!("fleet.robots[name={}]", robot),
                "duplicate robot name",
            ));
        }
    }
    Ok(())
}

fn validate_sinks(blueprint: &FleetBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::Network {
            validate_network_params(idx, &sink.name, sink.params.get("addr"))?;
        }
    }
    Ok(())
}

fn validate_network_params(
    idx: usize,
    name: &str,
    addr: Option<&String>,
) -> Result<(), ContractError> {
    let field = format!("sinks[{}].params.addr", idx);
    let addr = addr.ok_or_else(|| {
        ContractError::config_validation(&field, format!("network sink '{}' requires addr", name))
    })?;
    addr.parse::<SocketAddr>().map_err(|e| {
        ContractError::config_validation(&field, format!("invalid address '{}': {}", addr, e))
    })?;
    Ok(())
}
