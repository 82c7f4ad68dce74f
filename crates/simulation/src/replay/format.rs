//! Core data types for the deterministic replay file format.
//!
//! A replay captures the axis that was green on every tick of one episode,
//! plus the seed and params it ran under. Feeding the axes back through a
//! scripted controller with the same seed reproduces the episode exactly;
//! the footer's state hash proves it.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::intersection_params::IntersectionParams;

/// Format version for forward-compatibility checks.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Header metadata written at the start of a replay file.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq)]
pub struct ReplayHeader {
    /// Format version (start at 1, bump on breaking changes).
    pub format_version: u32,
    /// Episode seed.
    pub seed: u64,
    /// Label of the controller that produced the run.
    pub controller: String,
    /// `IntersectionParams` as JSON.
    pub params_json: String,
}

/// The axis applied on one tick.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq)]
pub struct ReplayEntry {
    /// Zero-based tick index.
    pub tick: u64,
    pub axis: Axis,
    /// The decision failed on this tick and the phase was held.
    pub degraded: bool,
}

/// Footer metadata written after all entries.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq)]
pub struct ReplayFooter {
    /// Tick count when recording stopped.
    pub end_tick: u64,
    /// Hash of the final episode state.
    pub final_state_hash: u64,
    /// Number of entries in the replay (for validation).
    pub entry_count: u64,
}

/// Complete replay file: header + entries + footer.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq)]
pub struct ReplayFile {
    pub header: ReplayHeader,
    pub entries: Vec<ReplayEntry>,
    pub footer: ReplayFooter,
}

impl ReplayFile {
    /// Encode the replay file to compact binary bytes via bitcode.
    pub fn to_bytes(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    /// Decode a replay file from bitcode bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bitcode::decode(bytes).map_err(|e| format!("bitcode decode error: {e}"))
    }

    /// Serialize to JSON for human-readable debugging output.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("JSON decode error: {e}"))
    }

    pub fn params(&self) -> Result<IntersectionParams, String> {
        IntersectionParams::from_json(&self.header.params_json).map_err(|e| e.to_string())
    }

    /// Validate internal consistency:
    /// - the format version is one this build understands
    /// - `footer.entry_count` matches `entries.len()`
    /// - entries cover ticks `0..end_tick` exactly once, in order
    /// - the embedded params parse and validate
    pub fn validate(&self) -> Result<(), String> {
        if self.header.format_version != CURRENT_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.header.format_version, CURRENT_FORMAT_VERSION
            ));
        }

        if self.footer.entry_count != self.entries.len() as u64 {
            return Err(format!(
                "entry_count mismatch: footer says {} but found {} entries",
                self.footer.entry_count,
                self.entries.len()
            ));
        }

        if self.footer.end_tick != self.entries.len() as u64 {
            return Err(format!(
                "end_tick {} does not match {} recorded ticks",
                self.footer.end_tick,
                self.entries.len()
            ));
        }

        for (expected, entry) in self.entries.iter().enumerate() {
            if entry.tick != expected as u64 {
                return Err(format!(
                    "entries not contiguous: expected tick {} but found {}",
                    expected, entry.tick
                ));
            }
        }

        self.params().map(|_| ())
    }
}
