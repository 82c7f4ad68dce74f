//! Agent text protocol types for the headless `agent` mode.
//!
//! Defines the JSON command/response envelope that external programs (UI
//! shells, training scripts, test harnesses) use to drive episodes over
//! newline-delimited JSON on stdin/stdout.
//!
//! These types and [`dispatch`] live in the `simulation` crate so they can
//! be unit-tested without pulling in the app binary. The actual I/O loop
//! lives in `crates/app/src/agent_mode.rs`.

use serde::{Deserialize, Serialize};

use crate::episode::EpisodeState;
use crate::intersection_params::IntersectionParams;
use crate::registry::{AgentKind, EpisodeId, EpisodeRegistry, InitResponse, StepResponse};

/// Upper bound on ticks advanced by a single `run` command.
pub const MAX_RUN_TICKS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Commands (stdin → simulation)
// ---------------------------------------------------------------------------

/// A single command sent by the external agent over stdin.
///
/// Each line of stdin is parsed as one `AgentCommand`. The `cmd` field acts as
/// the discriminator tag.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd")]
pub enum AgentCommand {
    /// Create an episode. `params`, when present, replaces the preset for
    /// `agent` entirely.
    #[serde(rename = "init")]
    Init {
        agent: AgentKind,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        params: Option<IntersectionParams>,
    },

    /// Advance one episode by a single tick.
    #[serde(rename = "step")]
    Step { episode_id: EpisodeId },

    /// Advance one episode by up to `ticks` ticks, stopping at the horizon.
    #[serde(rename = "run")]
    Run { episode_id: EpisodeId, ticks: u64 },

    /// Request the current snapshot of an episode.
    #[serde(rename = "observe")]
    Observe { episode_id: EpisodeId },

    /// Re-initialise an episode from its seed.
    #[serde(rename = "reset")]
    Reset { episode_id: EpisodeId },

    /// Drop every episode.
    #[serde(rename = "reset_all")]
    ResetAll,

    /// Gracefully shut down the agent session.
    #[serde(rename = "quit")]
    Quit,
}

// ---------------------------------------------------------------------------
// Responses (simulation → stdout)
// ---------------------------------------------------------------------------

/// Every response includes the protocol version and a tagged payload.
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    /// Monotonically increasing protocol version (currently 1).
    pub protocol_version: u32,
    /// The response payload, flattened into this object.
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// Tagged payload variants for agent responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ResponsePayload {
    /// The simulation is ready to accept commands.
    #[serde(rename = "ready")]
    Ready,

    /// An episode was created or reset.
    #[serde(rename = "initialized")]
    Initialized(InitResponse),

    /// Result of a single `step`.
    #[serde(rename = "stepped")]
    Stepped(StepResponse),

    /// Episode snapshot (`observe`, and the final state after `run`).
    #[serde(rename = "snapshot")]
    Snapshot {
        episode_id: EpisodeId,
        state: EpisodeState,
    },

    /// Generic success acknowledgement.
    #[serde(rename = "ok")]
    Ok,

    /// An error occurred while processing the command.
    #[serde(rename = "error")]
    Error { message: String },

    /// The session is ending (response to `quit`).
    #[serde(rename = "goodbye")]
    Goodbye,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current protocol version. Bump when the command/response schema changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Convenience constructor that wraps a payload with the current protocol version.
pub fn make_response(payload: ResponsePayload) -> AgentResponse {
    AgentResponse {
        protocol_version: PROTOCOL_VERSION,
        payload,
    }
}

fn error_response(err: impl std::fmt::Display) -> AgentResponse {
    make_response(ResponsePayload::Error {
        message: err.to_string(),
    })
}

/// Execute one command against the registry.
pub fn dispatch(registry: &mut EpisodeRegistry, cmd: AgentCommand) -> AgentResponse {
    match cmd {
        AgentCommand::Init {
            agent,
            seed,
            params,
        } => {
            let result = match params {
                Some(params) => registry.init_params(params, seed),
                None => registry.init_episode(agent, seed),
            };
            match result {
                Ok(init) => make_response(ResponsePayload::Initialized(init)),
                Err(e) => error_response(e),
            }
        }

        AgentCommand::Step { episode_id } => match registry.step(episode_id) {
            Ok(step) => make_response(ResponsePayload::Stepped(step)),
            Err(e) => error_response(e),
        },

        AgentCommand::Run { episode_id, ticks } => {
            let n = ticks.min(MAX_RUN_TICKS);
            for _ in 0..n {
                match registry.get(episode_id) {
                    Ok(ep) if !ep.is_running() => break,
                    Ok(_) => {}
                    Err(e) => return error_response(e),
                }
                if let Err(e) = registry.step(episode_id) {
                    return error_response(e);
                }
            }
            match registry.snapshot(episode_id) {
                Ok(state) => make_response(ResponsePayload::Snapshot { episode_id, state }),
                Err(e) => error_response(e),
            }
        }

        AgentCommand::Observe { episode_id } => match registry.snapshot(episode_id) {
            Ok(state) => make_response(ResponsePayload::Snapshot { episode_id, state }),
            Err(e) => error_response(e),
        },

        AgentCommand::Reset { episode_id } => match registry.reset_episode(episode_id) {
            Ok(init) => make_response(ResponsePayload::Initialized(init)),
            Err(e) => error_response(e),
        },

        AgentCommand::ResetAll => {
            registry.reset_all();
            make_response(ResponsePayload::Ok)
        }

        AgentCommand::Quit => make_response(ResponsePayload::Goodbye),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AgentCommand {
        serde_json::from_str(json).unwrap()
    }

    fn to_json(resp: &AgentResponse) -> serde_json::Value {
        serde_json::to_value(resp).unwrap()
    }

    #[test]
    fn deserialize_init_command() {
        let cmd = parse(r#"{"cmd":"init","agent":"mitigated","seed":42}"#);
        if let AgentCommand::Init { agent, seed, params } = cmd {
            assert_eq!(agent, AgentKind::Mitigated);
            assert_eq!(seed, Some(42));
            assert!(params.is_none());
        } else {
            panic!("expected Init");
        }
    }

    #[test]
    fn deserialize_init_without_seed() {
        let cmd = parse(r#"{"cmd":"init","agent":"fixed_cycle"}"#);
        assert!(matches!(cmd, AgentCommand::Init { seed: None, .. }));
    }

    #[test]
    fn deserialize_run_command() {
        let cmd = parse(r#"{"cmd":"run","episode_id":3,"ticks":100}"#);
        if let AgentCommand::Run { episode_id, ticks } = cmd {
            assert_eq!(episode_id, EpisodeId(3));
            assert_eq!(ticks, 100);
        } else {
            panic!("expected Run");
        }
    }

    #[test]
    fn deserialize_quit_and_reset_all() {
        assert!(matches!(parse(r#"{"cmd":"quit"}"#), AgentCommand::Quit));
        assert!(matches!(
            parse(r#"{"cmd":"reset_all"}"#),
            AgentCommand::ResetAll
        ));
    }

    #[test]
    fn invalid_command_returns_parse_error() {
        let result = serde_json::from_str::<AgentCommand>(r#"{"cmd":"nonexistent"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_agent_kind_is_parse_error() {
        let result = serde_json::from_str::<AgentCommand>(r#"{"cmd":"init","agent":"magic"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serialize_ready_response() {
        let json = serde_json::to_string(&make_response(ResponsePayload::Ready)).unwrap();
        assert!(json.contains("\"protocol_version\":1"));
        assert!(json.contains("\"type\":\"ready\""));
    }

    #[test]
    fn dispatch_init_then_step() {
        let mut reg = EpisodeRegistry::default();
        let init = to_json(&dispatch(
            &mut reg,
            parse(r#"{"cmd":"init","agent":"baseline","seed":7}"#),
        ));
        assert_eq!(init["type"], "initialized");
        assert_eq!(init["episode_id"], 0);
        assert_eq!(init["seed"], 7);
        assert_eq!(init["observation"].as_array().unwrap().len(), 9);

        let step = to_json(&dispatch(&mut reg, parse(r#"{"cmd":"step","episode_id":0}"#)));
        assert_eq!(step["type"], "stepped");
        assert_eq!(step["info"]["tick"], 1);
        assert!(step["reward"].is_number());
        assert_eq!(step["done"], false);
        assert!(step["info"]["fairness_gap"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn dispatch_run_stops_at_horizon() {
        let mut reg = EpisodeRegistry::default();
        dispatch(&mut reg, parse(r#"{"cmd":"init","agent":"fixed_cycle","seed":1}"#));
        let snap = to_json(&dispatch(
            &mut reg,
            parse(r#"{"cmd":"run","episode_id":0,"ticks":5000}"#),
        ));
        assert_eq!(snap["type"], "snapshot");
        assert_eq!(snap["state"]["tick"], 200);
        assert_eq!(snap["state"]["status"], "Done");

        let err = to_json(&dispatch(&mut reg, parse(r#"{"cmd":"step","episode_id":0}"#)));
        assert_eq!(err["type"], "error");
        assert!(err["message"].as_str().unwrap().contains("finished"));
    }

    #[test]
    fn dispatch_unknown_episode_is_error() {
        let mut reg = EpisodeRegistry::default();
        let resp = to_json(&dispatch(
            &mut reg,
            parse(r#"{"cmd":"observe","episode_id":12}"#),
        ));
        assert_eq!(resp["type"], "error");
        assert!(resp["message"].as_str().unwrap().contains("ep-12"));
    }

    #[test]
    fn dispatch_init_with_invalid_params_is_error() {
        let mut reg = EpisodeRegistry::default();
        let resp = to_json(&dispatch(
            &mut reg,
            parse(r#"{"cmd":"init","agent":"baseline","params":{"horizon":0}}"#),
        ));
        assert_eq!(resp["type"], "error");
        assert!(reg.is_empty());
    }

    #[test]
    fn dispatch_reset_returns_fresh_episode() {
        let mut reg = EpisodeRegistry::default();
        dispatch(&mut reg, parse(r#"{"cmd":"init","agent":"mitigated","seed":2}"#));
        dispatch(&mut reg, parse(r#"{"cmd":"run","episode_id":0,"ticks":30}"#));
        let resp = to_json(&dispatch(&mut reg, parse(r#"{"cmd":"reset","episode_id":0}"#)));
        assert_eq!(resp["type"], "initialized");
        assert_eq!(resp["info"]["tick"], 0);
        assert_eq!(reg.snapshot(EpisodeId(0)).unwrap().tick, 0);
    }

    #[test]
    fn dispatch_reset_all_and_quit() {
        let mut reg = EpisodeRegistry::default();
        dispatch(&mut reg, parse(r#"{"cmd":"init","agent":"baseline"}"#));
        let ok = to_json(&dispatch(&mut reg, parse(r#"{"cmd":"reset_all"}"#)));
        assert_eq!(ok["type"], "ok");
        assert!(reg.is_empty());
        let bye = to_json(&dispatch(&mut reg, parse(r#"{"cmd":"quit"}"#)));
        assert_eq!(bye["type"], "goodbye");
    }
}
