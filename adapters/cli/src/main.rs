#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs scripted Outpost sessions headlessly.

mod scenarios;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use outpost_core::ObjectKind;
use outpost_world::WorldConfig;
use tracing::info;

use crate::scenarios::Report;

#[derive(Parser)]
#[command(name = "outpost", version, about = "Runs scripted buildable-object sessions")]
struct Cli {
    /// TOML file overriding tuning constants and the object catalogue.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Prints the final report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand)]
enum Scenario {
    /// An engineer places and constructs an object.
    Build {
        /// Kind of object to build.
        #[arg(long, value_enum, default_value_t = KindArg::SentryGun)]
        kind: KindArg,
        /// Seconds to simulate after committing the ghost.
        #[arg(long, default_value_t = 25)]
        seconds: u32,
    },
    /// A spy saps a sentry and its engineer removes the sapper.
    Sap,
    /// A teammate shoots a dispenser protected by a shield.
    FriendlyFire,
}

#[derive(ValueEnum, Clone, Copy)]
enum KindArg {
    SentryGun,
    Dispenser,
    TeleporterEntrance,
    TeleporterExit,
}

impl From<KindArg> for ObjectKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::SentryGun => ObjectKind::SentryGun,
            KindArg::Dispenser => ObjectKind::Dispenser,
            KindArg::TeleporterEntrance => ObjectKind::TeleporterEntrance,
            KindArg::TeleporterExit => ObjectKind::TeleporterExit,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<WorldConfig> {
    match path {
        Some(path) => {
            let config = WorldConfig::load(path)
                .with_context(|| format!("loading world config from {}", path.display()))?;
            info!(path = %path.display(), seed = config.seed, "world config loaded");
            Ok(config)
        }
        None => Ok(WorldConfig::default()),
    }
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(report).context("serialising scenario report")?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "{}: {} frames, {:.1}s simulated, {} events",
        report.scenario, report.frames, report.elapsed_seconds, report.events
    );
    for object in &report.objects {
        println!(
            "  #{} {} [{}] team {:?} health {}/{} built {:.0}%{}{}",
            object.index,
            object.kind,
            object.phase,
            object.team,
            object.health,
            object.max_health,
            object.percent_constructed * 100.0,
            if object.disabled { " disabled" } else { "" },
            if object.children > 0 {
                format!(" children {}", object.children)
            } else {
                String::new()
            },
        );
    }
    for player in &report.players {
        println!("  player {} team {} metal {}", player.id, player.team, player.metal);
    }
    if report.debris > 0 {
        println!("  {} debris fragments on the ground", report.debris);
    }
    Ok(())
}

/// Entry point for the Outpost command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let report = match cli.scenario {
        Scenario::Build { kind, seconds } => scenarios::build(config, kind.into(), seconds),
        Scenario::Sap => scenarios::sap(config),
        Scenario::FriendlyFire => scenarios::friendly_fire(config),
    };
    print_report(&report, cli.json)
}
