//! `fairsignal`: command-line front end for the intersection simulation.
//!
//! All simulation logic lives in the `simulation` crate; this binary only
//! parses arguments, installs logging, and moves JSON in and out.

mod agent_mode;
mod run_mode;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bevy::log::{Level, LogPlugin};
use bevy::prelude::{default, info, App};
use clap::{Parser, Subcommand};

use simulation::episode::Episode;
use simulation::evaluation::evaluate;
use simulation::intersection_params::IntersectionParams;
use simulation::registry::AgentKind;
use simulation::replay::{verify_replay, ReplayFile};

/// Command-line arguments for the `fairsignal` binary.
#[derive(Parser, Debug)]
#[command(name = "fairsignal", version)]
struct Cli {
    /// Log level for stderr output.
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the newline-delimited JSON protocol on stdin/stdout.
    Agent {
        /// Seed for episodes created without an explicit one is
        /// `seed_base + episode_id`.
        #[arg(long, default_value_t = 1000)]
        seed_base: u64,

        /// JSON params applied to every `init` without its own params.
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// Run the baseline and mitigated agents side by side on one seed.
    Run {
        #[arg(long, default_value_t = 139)]
        seed: u64,

        /// Pace ticks at the 160 ms fixed interval instead of running flat out.
        #[arg(long)]
        realtime: bool,

        /// JSON params for both sides; the mitigated side keeps its reward
        /// weights, safety model and controller.
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// Evaluate one agent over consecutive seeds and print a JSON summary.
    Evaluate {
        #[arg(long, value_enum, default_value = "mitigated")]
        agent: AgentArg,

        #[arg(long, default_value_t = 20)]
        episodes: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// JSON params replacing the agent preset entirely.
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// Run one episode and write its replay (`.json` for JSON, else bitcode).
    Record {
        #[arg(long, value_enum, default_value = "baseline")]
        agent: AgentArg,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long)]
        params: Option<PathBuf>,

        #[arg(long)]
        out: PathBuf,
    },

    /// Re-run a replay file and check it reproduces the recorded state hash.
    Replay { path: PathBuf },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum AgentArg {
    Baseline,
    Mitigated,
    FixedCycle,
}

impl From<AgentArg> for AgentKind {
    fn from(arg: AgentArg) -> Self {
        match arg {
            AgentArg::Baseline => AgentKind::Baseline,
            AgentArg::Mitigated => AgentKind::Mitigated,
            AgentArg::FixedCycle => AgentKind::FixedCycle,
        }
    }
}

/// `LogPlugin` installs the global stderr subscriber when built; the app
/// itself is discarded. Stdout stays reserved for JSON.
fn install_logging(level: Level) {
    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level,
        ..default()
    });
}

fn load_params(path: &Path) -> Result<IntersectionParams> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    IntersectionParams::from_json(&json)
        .with_context(|| format!("parsing params from {}", path.display()))
}

fn params_or_preset(path: Option<&Path>, agent: AgentKind) -> Result<IntersectionParams> {
    match path {
        Some(path) => load_params(path),
        None => Ok(agent.params()),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_logging(cli.log_level);

    match cli.command {
        Command::Agent { seed_base, params } => {
            let params = params.as_deref().map(load_params).transpose()?;
            agent_mode::run_agent_mode(seed_base, params)
        }

        Command::Run {
            seed,
            realtime,
            params,
        } => {
            let (baseline, mitigated) = match params.as_deref() {
                Some(path) => {
                    let base = load_params(path)?;
                    let preset = IntersectionParams::mitigated();
                    let mitigated = IntersectionParams {
                        reward: preset.reward,
                        safety: preset.safety,
                        controller: preset.controller,
                        ..base.clone()
                    };
                    (base, mitigated)
                }
                None => (
                    IntersectionParams::baseline(),
                    IntersectionParams::mitigated(),
                ),
            };
            let summaries = run_mode::run_side_by_side(
                vec![
                    ("baseline".to_string(), baseline),
                    ("mitigated".to_string(), mitigated),
                ],
                seed,
                realtime,
            )?;
            print_json(&summaries)
        }

        Command::Evaluate {
            agent,
            episodes,
            seed,
            params,
        } => {
            let params = params_or_preset(params.as_deref(), agent.into())?;
            let summary = evaluate(&params, episodes, seed)?;
            print_json(&summary)
        }

        Command::Record {
            agent,
            seed,
            params,
            out,
        } => {
            let params = params_or_preset(params.as_deref(), agent.into())?;
            let mut episode = Episode::new(params, seed)?;
            episode.start_recording();
            while episode.is_running() {
                episode.step()?;
            }
            let Some(replay) = episode.finish_recording() else {
                bail!("recording was not started");
            };
            let bytes = if is_json(&out) {
                replay.to_json().into_bytes()
            } else {
                replay.to_bytes()
            };
            fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;
            info!(
                "Wrote {} ticks of seed {} to {}",
                replay.footer.end_tick,
                seed,
                out.display()
            );
            Ok(())
        }

        Command::Replay { path } => {
            let replay = if is_json(&path) {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ReplayFile::from_json(&json)
            } else {
                let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                ReplayFile::from_bytes(&bytes)
            }
            .map_err(anyhow::Error::msg)?;
            let verdict = verify_replay(&replay).map_err(anyhow::Error::msg)?;
            print_json(&verdict)?;
            if !verdict.matches {
                bail!(
                    "replay diverged: expected hash {:#x}, got {:#x}",
                    verdict.expected_hash,
                    verdict.actual_hash
                );
            }
            Ok(())
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
