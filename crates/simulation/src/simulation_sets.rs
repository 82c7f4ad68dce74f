//! Deterministic tick ordering via `SystemSet` phases.
//!
//! Every system the intersection plugins add to `FixedUpdate` belongs to one
//! of these sets, configured as a chain:
//!
//! ```text
//! Decide  →  Advance  →  Publish
//! ```
//!
//! * **Decide** – Dispatch offloaded external decisions to the async compute
//!   pool for episodes that have none outstanding.
//! * **Advance** – Step every running episode exactly once. Episodes whose
//!   offloaded decision is still outstanding and within its deadline do not
//!   advance this tick.
//! * **Publish** – Read-only: refresh `LatestSnapshots` from the tick's
//!   `EpisodeTicked` events and count faults. Never mutates episodes.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Decide,
    Advance,
    Publish,
}
