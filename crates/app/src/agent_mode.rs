//! Headless `agent` mode: a blocking synchronous loop that reads JSON
//! commands from stdin and writes JSON responses to stdout.
//!
//! Commands operate on the `EpisodeRegistry` resource of a headless Bevy
//! app; episodes only advance through `step` / `run` commands, never on
//! their own.
//!
//! ## Protocol
//!
//! Each line of stdin is a JSON object with a `"cmd"` discriminator.
//! Each line of stdout is a JSON response with `"protocol_version"` and
//! `"type"` fields. See [`simulation::agent_protocol`] for the full schema.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use bevy::prelude::*;

use simulation::agent_protocol::{
    dispatch, make_response, AgentCommand, AgentResponse, ResponsePayload, PROTOCOL_VERSION,
};
use simulation::intersection_params::IntersectionParams;
use simulation::registry::EpisodeRegistry;

pub fn run_agent_mode(seed_base: u64, params: Option<IntersectionParams>) -> Result<()> {
    let mut app = simulation::headless_app();
    app.insert_resource(EpisodeRegistry::with_seed_base(seed_base));
    // Initial update so Startup systems execute and resources initialize.
    app.update();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    // Send the "ready" message so the external program knows we are live.
    write_response(&mut stdout, &make_response(ResponsePayload::Ready))?;
    info!("agent mode v{} ready, waiting for commands on stdin", PROTOCOL_VERSION);

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let cmd: AgentCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                let resp = make_response(ResponsePayload::Error {
                    message: format!("Parse error: {e}"),
                });
                write_response(&mut stdout, &resp)?;
                continue;
            }
        };
        let cmd = apply_default_params(cmd, params.as_ref());

        let response = {
            let mut registry = app.world_mut().resource_mut::<EpisodeRegistry>();
            dispatch(&mut registry, cmd)
        };
        let is_goodbye = matches!(response.payload, ResponsePayload::Goodbye);
        write_response(&mut stdout, &response)?;
        if is_goodbye {
            break;
        }
    }

    info!("agent mode shutting down");
    Ok(())
}

/// A `--params` file applies to every `init` that does not carry its own.
fn apply_default_params(cmd: AgentCommand, params: Option<&IntersectionParams>) -> AgentCommand {
    match (cmd, params) {
        (
            AgentCommand::Init {
                agent,
                seed,
                params: None,
            },
            Some(defaults),
        ) => AgentCommand::Init {
            agent,
            seed,
            params: Some(defaults.clone()),
        },
        (cmd, _) => cmd,
    }
}

fn write_response(out: &mut impl Write, response: &AgentResponse) -> Result<()> {
    let json = serde_json::to_string(response).context("serialising response")?;
    writeln!(out, "{json}").context("writing to stdout")?;
    out.flush().context("flushing stdout")?;
    Ok(())
}
