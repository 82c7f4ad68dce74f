//! Replay player: re-runs a recorded episode through a scripted controller
//! and checks that it lands on the recorded state hash.

use bevy::log::info;
use serde::Serialize;

use crate::episode::Episode;
use crate::phase_controller::ScriptedController;

use super::format::ReplayFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayVerdict {
    pub ticks: u64,
    pub expected_hash: u64,
    pub actual_hash: u64,
    pub matches: bool,
}

/// Rebuild the recorded episode at tick 0 with a controller that replays
/// the recorded axes.
pub fn replay_episode(replay: &ReplayFile) -> Result<Episode, String> {
    replay.validate()?;
    let params = replay.params()?;
    let axes = replay.entries.iter().map(|e| e.axis).collect();
    Episode::with_controller(
        params,
        Box::new(ScriptedController::new(axes)),
        replay.header.seed,
    )
    .map(|ep| ep.with_tag(format!("replay-{}", replay.header.seed)))
    .map_err(|e| e.to_string())
}

pub fn verify_replay(replay: &ReplayFile) -> Result<ReplayVerdict, String> {
    let mut episode = replay_episode(replay)?;
    for _ in 0..replay.footer.end_tick {
        episode.step().map_err(|e| e.to_string())?;
    }
    let actual_hash = episode.state_hash();
    let verdict = ReplayVerdict {
        ticks: episode.state().tick,
        expected_hash: replay.footer.final_state_hash,
        actual_hash,
        matches: actual_hash == replay.footer.final_state_hash,
    };
    info!(
        "Replay of seed {} ({}): {} ticks, hash match = {}",
        replay.header.seed, replay.header.controller, verdict.ticks, verdict.matches
    );
    Ok(verdict)
}
