//! # WFOS ICS Container
//!
//! Boots an in-process instrument control setup: a location service, the
//! configured gripper HCDs, and the bgrx assembly on top of them. Drives
//! the component lifecycle the way an observatory sequencer would: bring
//! everything online, run a demonstration `moveGrism`, then keep serving
//! until Ctrl+C and shut down in reverse order (assembly first).

use clap::Parser;
use ics_bgrx_assembly::{BgrxConfig, BgrxHandlers};
use ics_common::prelude::*;
use ics_framework::{Component, ComponentRef, LocationService};
use ics_lgrip_hcd::LgripHandlers;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// WFOS ICS — in-process instrument control container
#[derive(Parser, Debug)]
#[command(name = "ics")]
#[command(version)]
#[command(about = "Runs the bgrx assembly and its gripper HCDs in one process")]
struct Args {
    /// Path to the config directory (expects bgrx.toml).
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Grism angle for the demonstration command.
    #[arg(long, default_value_t = 30.0)]
    demo_angle: f64,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, &config);

    info!("WFOS ICS container v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config).await {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("WFOS ICS container shutdown complete");
}

fn load_config(args: &Args) -> Result<BgrxConfig, ConfigError> {
    let config = match &args.config_dir {
        Some(dir) => BgrxConfig::load_from_dir(dir, "bgrx.toml")?,
        None => BgrxConfig::simulated(&["wfos.lgrip1", "wfos.lgrip2"]),
    };
    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber from CLI arguments and the config log level.
fn setup_tracing(args: &Args, config: &BgrxConfig) {
    let default_level = if args.verbose {
        "debug"
    } else {
        config.shared.log_level.as_filter_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

async fn run(args: &Args, config: BgrxConfig) -> Result<(), Box<dyn std::error::Error>> {
    let location = LocationService::new();

    // Gripper HCDs first, so the assembly finds them tracked at startup.
    let mut grippers: Vec<ComponentRef> = Vec::new();
    for name in &config.grippers {
        let hcd = Component::spawn(ComponentId::hcd(name.clone()), LgripHandlers::new(), &location)
            .await?;
        location.register(hcd.clone());
        grippers.push(hcd);
    }

    let assembly_id = ComponentId::assembly(config.shared.component_name.clone());
    let assembly = Component::spawn(
        assembly_id.clone(),
        BgrxHandlers::new(config)?,
        &location,
    )
    .await?;
    location.register(assembly.clone());

    // Demonstration command, the same path a sequencer would drive.
    let command = Command::new(assembly_id, "moveGrism")
        .with_param("angle", ParamValue::Float(args.demo_angle));
    let validation = assembly.validate(command.clone()).await?;
    info!("validate: {}", serde_json::to_string(&validation)?);
    if validation.is_accepted() {
        let response = assembly.submit_and_wait(command).await?;
        info!("moveGrism: {}", serde_json::to_string(&response)?);
    }

    info!("serving; press Ctrl+C to shut down");
    match signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => error!("unable to listen for shutdown signal: {e}"),
    }

    // Reverse-startup order: assembly first, then the HCDs.
    location.unregister(assembly.id());
    assembly.shutdown().await?;
    for hcd in &grippers {
        location.unregister(hcd.id());
        hcd.shutdown().await?;
    }
    Ok(())
}
