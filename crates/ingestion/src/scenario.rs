//! Recorded scenario files (JSON Lines)
//!
//! One record per line; blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! {"t": 0.0, "type": "plan", "robot": "robot_0", "segments": [...]}
//! {"t": 0.5, "type": "position", "robot": "robot_0", "x": 1.0, "y": 0.0}
//! ```

use std::path::Path;

use contracts::{ContractError, Point2, RobotName, RouteEvent, RouteSegment};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{IngestionError, Result};

/// One scenario line as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    /// Seconds from scenario start
    #[serde(default)]
    pub t: f64,

    #[serde(flatten)]
    pub body: RecordBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordBody {
    Plan {
        robot: RobotName,
        segments: Vec<RouteSegment>,
    },
    Position {
        robot: RobotName,
        x: f64,
        y: f64,
    },
}

impl RecordBody {
    fn robot(&self) -> &RobotName {
        match self {
            RecordBody::Plan { robot, .. } | RecordBody::Position { robot, .. } => robot,
        }
    }
}

/// Event resolved against the roster, with its replay time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub t: f64,
    pub event: RouteEvent,
}

/// Parsed scenario
#[derive(Debug, Default)]
pub struct Scenario {
    pub events: Vec<TimedEvent>,

    /// Rejected records, in file order
    pub errors: Vec<ContractError>,
}

impl Scenario {
    /// Parse scenario text, resolving robot names through `roster`
    ///
    /// Malformed lines and unknown robots are collected in `errors` and
    /// skipped; they never abort the parse.
    pub fn parse(text: &str, roster: &[RobotName]) -> Self {
        let mut scenario = Scenario::default();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line_no, line, roster) {
                Ok(event) => scenario.events.push(event),
                Err(err) => {
                    warn!(line = line_no, error = %err, "skipping scenario record");
                    scenario.errors.push(err);
                }
            }
        }

        scenario
    }

    /// Read and parse a scenario file
    ///
    /// Fails when the file is unreadable or no record survives parsing.
    #[instrument(name = "scenario_load", skip(roster), fields(path = %path.display()))]
    pub fn load(path: &Path, roster: &[RobotName]) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| IngestionError::ScenarioRead {
            path: path.to_path_buf(),
            source,
        })?;

        let scenario = Self::parse(&text, roster);
        if scenario.events.is_empty() {
            return Err(IngestionError::EmptyScenario {
                path: path.to_path_buf(),
                errors: scenario.errors.len(),
            });
        }

        debug!(
            events = scenario.events.len(),
            errors = scenario.errors.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Replay duration in scenario seconds
    pub fn duration(&self) -> f64 {
        self.events.iter().map(|e| e.t).fold(0.0, f64::max)
    }
}

fn parse_line(
    line_no: usize,
    line: &str,
    roster: &[RobotName],
) -> std::result::Result<TimedEvent, ContractError> {
    let record: ScenarioRecord = serde_json::from_str(line)
        .map_err(|err| ContractError::scenario_parse(line_no, err.to_string()))?;

    if !record.t.is_finite() || record.t < 0.0 {
        return Err(ContractError::scenario_parse(
            line_no,
            format!("invalid timestamp {}", record.t),
        ));
    }

    let name = record.body.robot();
    let robot = roster
        .iter()
        .position(|candidate| candidate == name)
        .ok_or_else(|| ContractError::UnknownRobot {
            name: name.to_string(),
        })?;

    let event = match record.body {
        RecordBody::Plan { segments, .. } => RouteEvent::Plan { robot, segments },
        RecordBody::Position { x, y, .. } => RouteEvent::Position {
            robot,
            position: Point2::new(x, y),
        },
    };

    Ok(TimedEvent { t: record.t, event })
}
