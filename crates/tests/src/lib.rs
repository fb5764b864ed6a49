//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Contract snapshots (config and scenario formats)
//! - Replay e2e: scenario -> ingestion -> engine -> dispatcher -> file sink
//! - Deadlock observability across the whole pipeline

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AdvancePolicy, RouteEvent, SinkType};

    #[test]
    fn test_sample_config_loads() {
        let content = r#"
version = "V1"

[fleet]
robots = ["robot_0", "robot_1"]
frame_id = "map"

[engine]
advance_policy = "single_step"
stall_pass_threshold = 50

[[sinks]]
name = "console"
sink_type = "log"
"#;
        let blueprint = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.fleet_size(), 2);
        assert_eq!(blueprint.engine.advance_policy, AdvancePolicy::SingleStep);
        assert_eq!(blueprint.sinks[0].sink_type, SinkType::Log);
        assert_eq!(
            blueprint.path_topic_for(1).as_deref(),
            Some("robot_1/path_synced")
        );
    }

    #[test]
    fn test_route_event_wire_format() {
        let event = RouteEvent::Position {
            robot: 1,
            position: contracts::Point2::new(2.0, 3.0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "position");
        assert_eq!(json["robot"], 1);

        let back: RouteEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.robot(), 1);
        assert_eq!(back.kind(), "position");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    use contracts::{FleetBlueprint, FleetConfig, PathReady, SinkConfig, SinkType};
    use dispatcher::create_dispatcher;
    use ingestion::{IngestionPipeline, ReplaySource, Scenario};
    use sync_engine::{EngineConfig, SynchronizationEngine};
    use tokio::sync::mpsc;

    fn blueprint(robots: &[&str], out_dir: &Path, threshold: u32) -> FleetBlueprint {
        FleetBlueprint {
            fleet: FleetConfig {
                robots: robots.iter().map(|r| (*r).into()).collect(),
                frame_id: "map".to_string(),
            },
            engine: EngineConfig {
                stall_pass_threshold: threshold,
                ..Default::default()
            },
            sinks: vec![
                SinkConfig {
                    name: "disk".to_string(),
                    sink_type: SinkType::File,
                    queue_capacity: 64,
                    params: HashMap::from([(
                        "base_path".to_string(),
                        out_dir.display().to_string(),
                    )]),
                },
                SinkConfig {
                    name: "console".to_string(),
                    sink_type: SinkType::Log,
                    queue_capacity: 64,
                    params: HashMap::new(),
                },
            ],
            ..Default::default()
        }
    }

    /// Replays `scenario_text` through the full pipeline and returns the
    /// engine for inspection.
    async fn replay(blueprint: &FleetBlueprint, scenario_text: &str) -> SynchronizationEngine {
        let scenario = Scenario::parse(scenario_text, &blueprint.fleet.robots);
        assert!(scenario.errors.is_empty(), "{:?}", scenario.errors);

        let mut ingestion = IngestionPipeline::new(16);
        ingestion.register_event_source(
            "replay".to_string(),
            Box::new(ReplaySource::new("replay", scenario, 0.0)),
            None,
        );

        let (path_tx, path_rx) = mpsc::channel::<PathReady>(16);
        let dispatcher = create_dispatcher(blueprint, path_rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let event_rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut engine =
            SynchronizationEngine::new(blueprint.fleet_size(), blueprint.engine.clone());
        let engine_task = async {
            while let Ok(event) = event_rx.recv().await {
                for ready in engine.handle(event) {
                    path_tx.send(ready).await.unwrap();
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), engine_task)
            .await
            .expect("engine loop timed out");

        drop(path_tx);
        let sinks = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();
        assert!(sinks.iter().all(|(_, m)| m.failure_count == 0 && m.dropped_count == 0));

        engine
    }

    fn poses_in(dir: &Path, seq: u64) -> usize {
        let text = std::fs::read_to_string(dir.join(format!("{}.json", seq))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["poses"].as_array().unwrap().len()
    }

    /// Robot 0 drives three segments along +x; point i is gated on its own
    /// step reaching i, so the published path grows one point per step.
    #[tokio::test]
    async fn test_e2e_self_gated_path_grows_with_progress() {
        let out = tempfile::tempdir().unwrap();
        let blueprint = blueprint(&["robot_0", "robot_1"], out.path(), 50);

        let scenario = r#"{"type": "plan", "robot": "robot_0", "segments": [{"start": {"x": 0, "y": 0}, "end": {"x": 1, "y": 0}, "width": 0.5, "preconditions": [{"robot_id": 0, "required_step": 0}]}, {"start": {"x": 1, "y": 0}, "end": {"x": 2, "y": 0}, "width": 0.5, "preconditions": [{"robot_id": 0, "required_step": 1}]}, {"start": {"x": 2, "y": 0}, "end": {"x": 3, "y": 0}, "width": 0.5, "preconditions": [{"robot_id": 0, "required_step": 2}]}]}
{"t": 0.1, "type": "position", "robot": "robot_0", "x": 1.0, "y": 0.0}
{"t": 0.2, "type": "position", "robot": "robot_0", "x": 2.0, "y": 0.0}
{"t": 0.3, "type": "position", "robot": "robot_0", "x": 3.0, "y": 0.0}
"#;

        let engine = replay(&blueprint, scenario).await;
        assert_eq!(engine.step(0), Some(2));
        assert_eq!(engine.cursor(0), Some(3));
        assert!(engine.stalled_robots().is_empty());

        let topic_dir = out.path().join("robot_0").join("path_synced");
        assert_eq!(std::fs::read_dir(&topic_dir).unwrap().count(), 3);
        assert_eq!(poses_in(&topic_dir, 1), 1);
        assert_eq!(poses_in(&topic_dir, 2), 2);
        assert_eq!(poses_in(&topic_dir, 3), 3);
        assert!(!out.path().join("robot_1").exists());
    }

    /// Robot 1's second point waits for robot 0's step 1 and is released by
    /// robot 0's progress alone.
    #[tokio::test]
    async fn test_e2e_cross_robot_release() {
        let out = tempfile::tempdir().unwrap();
        let blueprint = blueprint(&["alpha", "beta"], out.path(), 50);

        let scenario = r#"{"type": "plan", "robot": "alpha", "segments": [{"start": {"x": 0, "y": 0}, "end": {"x": 1, "y": 0}, "width": 0.5}, {"start": {"x": 1, "y": 0}, "end": {"x": 2, "y": 0}, "width": 0.5}]}
{"type": "plan", "robot": "beta", "segments": [{"start": {"x": 0, "y": 3}, "end": {"x": 1, "y": 3}, "width": 0.5}, {"start": {"x": 1, "y": 3}, "end": {"x": 2, "y": 3}, "width": 0.5, "preconditions": [{"robot_id": 0, "required_step": 1}]}]}
{"t": 0.1, "type": "position", "robot": "alpha", "x": 1.0, "y": 0.1}
"#;

        let engine = replay(&blueprint, scenario).await;
        assert_eq!(engine.step(1), Some(0));
        assert_eq!(engine.cursor(1), Some(2));

        let beta_dir = out.path().join("beta").join("path_synced");
        assert_eq!(poses_in(&beta_dir, 1), 1);
        assert_eq!(poses_in(&beta_dir, 2), 2);

        let text = std::fs::read_to_string(beta_dir.join("2.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "beta/path_synced");
        assert_eq!(value["frame_id"], "map");
        assert_eq!(value["robot_name"], "beta");
    }

    /// Each robot's first point waits on the other: nothing is ever
    /// released and both robots are reported as a mutual wait.
    #[tokio::test]
    async fn test_e2e_cyclic_wait_reported() {
        let out = tempfile::tempdir().unwrap();
        let blueprint = blueprint(&["a", "b"], out.path(), 3);

        let scenario = r#"{"type": "plan", "robot": "a", "segments": [{"start": {"x": 0, "y": 0}, "end": {"x": 1, "y": 0}, "width": 0.5, "preconditions": [{"robot_id": 1, "required_step": 1}]}, {"start": {"x": 1, "y": 0}, "end": {"x": 2, "y": 0}, "width": 0.5}]}
{"type": "plan", "robot": "b", "segments": [{"start": {"x": 0, "y": 5}, "end": {"x": 1, "y": 5}, "width": 0.5, "preconditions": [{"robot_id": 0, "required_step": 1}]}, {"start": {"x": 1, "y": 5}, "end": {"x": 2, "y": 5}, "width": 0.5}]}
{"t": 0.1, "type": "position", "robot": "a", "x": 0.0, "y": 0.0}
{"t": 0.2, "type": "position", "robot": "b", "x": 0.0, "y": 5.0}
{"t": 0.3, "type": "position", "robot": "b", "x": 0.0, "y": 5.0}
"#;

        let engine = replay(&blueprint, scenario).await;
        assert_eq!(engine.cursor(0), Some(0));
        assert_eq!(engine.cursor(1), Some(0));
        assert_eq!(engine.stalled_robots(), vec![0, 1]);

        let a = engine.stall_report(0).unwrap();
        let b = engine.stall_report(1).unwrap();
        assert!(a.mutual_wait && b.mutual_wait);
        assert_eq!(b.blocking.len(), 1);
        assert_eq!(b.blocking[0].robot_id, 0);

        assert!(!out.path().join("a").exists());
        assert!(!out.path().join("b").exists());
    }
}
