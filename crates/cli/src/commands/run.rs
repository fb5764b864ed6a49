//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use contracts::FleetBlueprint;
use ingestion::Scenario;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineStats};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        robots = blueprint.fleet_size(),
        frame_id = %blueprint.fleet.frame_id,
        path_topic = %blueprint.topics.path_topic,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - validate config and scenario, then exit
    if args.dry_run {
        if !args.scenario.exists() {
            return Err(CliError::scenario_not_found(&args.scenario).into());
        }
        let scenario = Scenario::load(&args.scenario, &blueprint.fleet.robots)
            .with_context(|| format!("Failed to load scenario from {}", args.scenario.display()))?;
        info!("Dry run mode - configuration and scenario are valid, exiting");
        print_config_summary(&blueprint, &scenario);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        scenario_path: args.scenario.clone(),
        speed: args.speed,
        max_events: if args.max_events == 0 {
            None
        } else {
            Some(args.max_events)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        drop_policy: args.drop_policy.into(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");

    let stats: PipelineStats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        stop_reason = %stats.stop_reason,
        events_handled = stats.events_handled,
        paths_emitted = stats.paths_emitted,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline finished"
    );
    stats.print_summary();

    info!("Route Sync finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &FleetBlueprint, scenario: &Scenario) {
    println!("\n=== Configuration Summary ===\n");
    println!("Fleet ({} robots, frame '{}'):", blueprint.fleet_size(), blueprint.fleet.frame_id);
    for (index, robot) in blueprint.fleet.robots.iter().enumerate() {
        println!(
            "  [{}] {} -> {}",
            index,
            robot,
            robot.topic(&blueprint.topics.path_topic)
        );
    }

    println!("\nEngine:");
    println!("  Advance policy: {:?}", blueprint.engine.advance_policy);
    println!(
        "  Stall threshold: {} observations",
        blueprint.engine.stall_pass_threshold
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nScenario:");
    println!("  Events: {}", scenario.len());
    println!("  Rejected records: {}", scenario.errors.len());
    println!("  Duration: {:.2}s", scenario.duration());

    println!();
}
