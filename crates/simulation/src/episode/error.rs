use std::fmt;

use crate::axis::Approach;

/// A broken simulation invariant. Indicates a programming defect; the
/// affected episode is faulted and refuses further steps.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    QueueOverCap {
        approach: Approach,
        length: u32,
        cap: u32,
    },
    /// Vehicles served plus vehicles remaining did not account for the
    /// vehicles queued before service.
    QueueUnderflow { queued: u32, served: u32, remaining: u32 },
    WaitDecreased {
        axis: &'static str,
        before: f64,
        after: f64,
    },
    NonFiniteMetric { metric: &'static str, value: f64 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::QueueOverCap {
                approach,
                length,
                cap,
            } => write!(f, "queue {approach:?} holds {length} vehicles, cap is {cap}"),
            InvariantViolation::QueueUnderflow {
                queued,
                served,
                remaining,
            } => write!(
                f,
                "queue underflow: {queued} queued, {served} served, {remaining} remaining"
            ),
            InvariantViolation::WaitDecreased {
                axis,
                before,
                after,
            } => write!(f, "cumulative {axis} wait decreased from {before} to {after}"),
            InvariantViolation::NonFiniteMetric { metric, value } => {
                write!(f, "{metric} is not finite ({value})")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Why an episode refused to step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepError {
    /// The horizon has been reached; reset to run again.
    Finished,
    /// A previous step broke an invariant.
    Faulted(InvariantViolation),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Finished => write!(f, "episode already finished"),
            StepError::Faulted(violation) => write!(f, "episode faulted: {violation}"),
        }
    }
}

impl std::error::Error for StepError {}
