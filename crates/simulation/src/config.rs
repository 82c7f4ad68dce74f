use std::time::Duration;

/// Wall-clock cadence of one simulation tick when driven by the Bevy clock.
pub const TICK_INTERVAL: Duration = Duration::from_millis(160);

/// Episode length in ticks. No early termination exists.
pub const DEFAULT_HORIZON: u64 = 200;

/// Per-approach queue cap.
pub const DEFAULT_MAX_QUEUE: u32 = 20;

/// Vehicles served per approach per tick at full visibility.
pub const DEFAULT_MAX_FLOW: u32 = 3;

pub const DEFAULT_MIN_GREEN_TICKS: u32 = 6;

/// Time-to-collision scale: ttc = visibility * TTC_VISIBILITY_SCALE.
pub const TTC_VISIBILITY_SCALE: f64 = 3.5;

/// Width of the observation vector handed to decision ports.
pub const OBSERVATION_WIDTH: usize = 9;

/// How long an offloaded external decision may stay outstanding before the
/// episode falls back to holding its phase.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(2);

/// Fairness gap above which a tick marks its scenario as a hard case.
pub const HARD_CASE_GAP: f64 = 3.0;
