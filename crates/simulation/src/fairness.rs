//! Running per-axis wait accumulation and the fairness gap derived from it.
//!
//! Each tick the vehicles still queued after service are added to their
//! axis' cumulative wait. Average wait is `cum / max(1, t)` over the whole
//! episode rather than a sliding window, so the gap reacts slowly to recent
//! improvement.

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::queue_model::QueueModel;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FairnessAccumulator {
    pub cum_wait_ew: f64,
    pub cum_wait_ns: f64,
}

/// Derived metrics, recomputed from the accumulator every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FairnessMetrics {
    pub wait_ew: f64,
    pub wait_ns: f64,
    /// `|wait_ns - wait_ew|`, never negative.
    pub gap: f64,
    /// `(wait_ns + 1) / (wait_ew + 1)`; 1.0 when balanced.
    pub ratio: f64,
}

impl FairnessAccumulator {
    /// Fold the post-service queues into a new accumulator.
    pub fn update(&self, queues: &QueueModel) -> FairnessAccumulator {
        FairnessAccumulator {
            cum_wait_ew: self.cum_wait_ew + queues.axis_total(Axis::EastWest) as f64,
            cum_wait_ns: self.cum_wait_ns + queues.axis_total(Axis::NorthSouth) as f64,
        }
    }

    pub fn cum_wait(&self, axis: Axis) -> f64 {
        match axis {
            Axis::EastWest => self.cum_wait_ew,
            Axis::NorthSouth => self.cum_wait_ns,
        }
    }

    pub fn metrics(&self, elapsed_ticks: u64) -> FairnessMetrics {
        let t = elapsed_ticks.max(1) as f64;
        let wait_ew = self.cum_wait_ew / t;
        let wait_ns = self.cum_wait_ns / t;
        FairnessMetrics {
            wait_ew,
            wait_ns,
            gap: (wait_ns - wait_ew).abs(),
            ratio: (wait_ns + 1.0) / (wait_ew + 1.0),
        }
    }
}

impl FairnessMetrics {
    pub fn wait(&self, axis: Axis) -> f64 {
        match axis {
            Axis::EastWest => self.wait_ew,
            Axis::NorthSouth => self.wait_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Approach;

    #[test]
    fn test_update_accumulates_remaining_queue() {
        let mut queues = QueueModel::new(20);
        queues.set_approach(Approach::North, 2);
        queues.set_approach(Approach::South, 1);
        queues.set_approach(Approach::East, 4);
        let acc = FairnessAccumulator::default().update(&queues).update(&queues);
        assert_eq!(acc.cum_wait_ns, 6.0);
        assert_eq!(acc.cum_wait_ew, 8.0);
    }

    #[test]
    fn test_metrics_divide_by_elapsed() {
        let acc = FairnessAccumulator {
            cum_wait_ew: 10.0,
            cum_wait_ns: 30.0,
        };
        let m = acc.metrics(10);
        assert_eq!(m.wait_ew, 1.0);
        assert_eq!(m.wait_ns, 3.0);
        assert_eq!(m.gap, 2.0);
        assert_eq!(m.ratio, 2.0);
    }

    #[test]
    fn test_zero_elapsed_treated_as_one() {
        let acc = FairnessAccumulator {
            cum_wait_ew: 2.0,
            cum_wait_ns: 0.0,
        };
        let m = acc.metrics(0);
        assert_eq!(m.wait_ew, 2.0);
        assert_eq!(m.gap, 2.0);
    }

    #[test]
    fn test_equal_waits_give_zero_gap() {
        let acc = FairnessAccumulator {
            cum_wait_ew: 7.5,
            cum_wait_ns: 7.5,
        };
        let m = acc.metrics(3);
        assert_eq!(m.gap, 0.0);
        assert_eq!(m.ratio, 1.0);
    }

    #[test]
    fn test_gap_symmetric() {
        let a = FairnessAccumulator {
            cum_wait_ew: 4.0,
            cum_wait_ns: 1.0,
        };
        let b = FairnessAccumulator {
            cum_wait_ew: 1.0,
            cum_wait_ns: 4.0,
        };
        assert_eq!(a.metrics(5).gap, b.metrics(5).gap);
        assert!(a.metrics(5).gap >= 0.0);
    }
}
