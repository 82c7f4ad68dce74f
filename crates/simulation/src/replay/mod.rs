//! Deterministic replay format with recorder and player.
//!
//! Operates at the decision level: records the green axis chosen on each
//! tick and replays it through the same episode clock.

pub mod format;
pub mod player;
pub mod recorder;

pub use format::{ReplayEntry, ReplayFile, ReplayFooter, ReplayHeader};
pub use player::{replay_episode, verify_replay, ReplayVerdict};
pub use recorder::ReplayRecorder;
