//! arbiter-sim: replays an arbitration scenario and prints the engine's events.
//!
//! A scenario file describes a timeline of controller snapshots, pointer
//! events, visibility changes and configuration patches (see
//! `arbiter_engine::infrastructure::scenario`).  The simulator feeds it to a
//! fresh engine and prints every event, which makes it easy to see how a
//! given deadzone or hysteresis setting behaves without a browser.
//!
//! # Usage
//!
//! ```text
//! arbiter-sim [OPTIONS] <SCENARIO>
//!
//! Arguments:
//!   <SCENARIO>         Path to a scenario TOML file
//!
//! Options:
//!   --config <PATH>    Config patch layered under the scenario's own config
//!   --json             Print one JSON object per event
//!   --realtime         Pace frames on the wall clock instead of virtual time
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                          |
//! |-------------------|--------------------------------------|
//! | `ARBITER_CONFIG`  | Same as `--config`                   |
//! | `RUST_LOG`        | Log filter (default `info`), stderr  |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbiter_core::ConfigPatch;
use arbiter_engine::infrastructure::scenario::{load_scenario, Replay, ScenarioReport};
use arbiter_engine::infrastructure::storage::config::load_config;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Cursor arbiter scenario simulator.
///
/// Replays a scenario file against the arbitration engine and prints the
/// events it emits.
#[derive(Debug, Parser)]
#[command(
    name = "arbiter-sim",
    about = "Replay input-ownership scenarios against the arbitration engine",
    version
)]
struct Cli {
    /// Scenario TOML file to replay.
    scenario: PathBuf,

    /// TOML config patch applied under the scenario's own `[config]`.
    ///
    /// A missing file is treated as an empty patch.
    #[arg(long, env = "ARBITER_CONFIG")]
    config: Option<PathBuf>,

    /// Print events as JSON lines instead of a readable summary.
    #[arg(long)]
    json: bool,

    /// Wait one real frame interval between frames.
    #[arg(long)]
    realtime: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConfigPatch::default(),
    };
    let scenario = load_scenario(&cli.scenario)
        .with_context(|| format!("failed to load scenario {}", cli.scenario.display()))?;

    info!(scenario = %cli.scenario.display(), steps = scenario.steps.len(), "replaying scenario");

    let mut replay = Replay::new(scenario, &base).context("failed to build engine")?;
    if cli.realtime {
        run_realtime(&mut replay).await?;
    } else {
        while replay.advance()? {}
    }
    let report = replay.finish();

    print_report(&report, cli.json)?;
    Ok(())
}

/// Advances one frame per real frame interval until done or Ctrl+C.
///
/// Steps stay keyed to virtual frame times; only the pacing is real.  Hosts
/// that tick a live engine use `infrastructure::frame_driver::drive_frames`.
async fn run_realtime(replay: &mut Replay) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C; ending replay early");
            flag.store(true, Ordering::Relaxed);
        }
    });

    // `interval` panics on a zero period.
    let period = replay.frame_interval().max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        if interrupted.load(Ordering::Relaxed) || !replay.advance()? {
            break;
        }
    }
    Ok(())
}

fn print_report(report: &ScenarioReport, json: bool) -> anyhow::Result<()> {
    if json {
        for recorded in &report.events {
            println!("{}", serde_json::to_string(recorded)?);
        }
        return Ok(());
    }

    for recorded in &report.events {
        println!("[{:>8.1} ms] {}", recorded.at, recorded.event);
    }
    let state = &report.final_state;
    println!(
        "-- {} frames, {} events; final ownership {} at {}, {} controller(s) connected",
        report.frames,
        report.events.len(),
        state.ownership,
        state.cursor,
        state.connected.len()
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_only_scenario() {
        let cli = Cli::parse_from(["arbiter-sim", "demo.toml"]);

        assert_eq!(cli.scenario, PathBuf::from("demo.toml"));
        assert!(!cli.json);
        assert!(!cli.realtime);
    }

    #[test]
    fn test_cli_json_flag() {
        let cli = Cli::parse_from(["arbiter-sim", "--json", "demo.toml"]);
        assert!(cli.json);
    }

    #[test]
    fn test_cli_config_override() {
        let cli = Cli::parse_from(["arbiter-sim", "--config", "tuned.toml", "demo.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("tuned.toml")));
    }
}
