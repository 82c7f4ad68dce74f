//! Replay recorder: captures the applied axis of every tick of one episode.

use crate::axis::Axis;
use crate::intersection_params::IntersectionParams;

use super::format::{ReplayEntry, ReplayFile, ReplayFooter, ReplayHeader, CURRENT_FORMAT_VERSION};

#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    header: ReplayHeader,
    entries: Vec<ReplayEntry>,
}

impl ReplayRecorder {
    pub fn new(seed: u64, controller: &str, params: &IntersectionParams) -> Self {
        Self {
            header: ReplayHeader {
                format_version: CURRENT_FORMAT_VERSION,
                seed,
                controller: controller.to_string(),
                params_json: serde_json::to_string(params).unwrap_or_default(),
            },
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, tick: u64, axis: Axis, degraded: bool) {
        self.entries.push(ReplayEntry {
            tick,
            axis,
            degraded,
        });
    }

    /// Drop captured entries; used when the episode is reset.
    pub fn restart(&mut self) {
        self.entries.clear();
    }

    /// Number of entries recorded so far.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Produce the finalized `ReplayFile`. `state_hash` is the hash of the
    /// episode at `end_tick`.
    pub fn finish(self, end_tick: u64, state_hash: u64) -> ReplayFile {
        let entry_count = self.entries.len() as u64;
        ReplayFile {
            header: self.header,
            entries: self.entries,
            footer: ReplayFooter {
                end_tick,
                final_state_hash: state_hash,
                entry_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_counts_entries() {
        let mut recorder = ReplayRecorder::new(1, "fixed_cycle", &IntersectionParams::default());
        recorder.record(0, Axis::EastWest, false);
        recorder.record(1, Axis::EastWest, true);
        assert_eq!(recorder.entry_count(), 2);
        let file = recorder.finish(2, 99);
        assert_eq!(file.footer.entry_count, 2);
        assert_eq!(file.footer.final_state_hash, 99);
        assert!(file.entries[1].degraded);
        file.validate().unwrap();
    }

    #[test]
    fn test_restart_clears_entries() {
        let mut recorder = ReplayRecorder::new(1, "fixed_cycle", &IntersectionParams::default());
        recorder.record(0, Axis::NorthSouth, false);
        recorder.restart();
        assert_eq!(recorder.entry_count(), 0);
    }
}
