//! Data returned by solve calls

use crate::{Float, status::Status};

/// Outcome of one successful `solve` call.
///
/// The accepted state and derivative are written into the slices the
/// caller passed to `solve`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Time actually reached.
    pub tret: Float,
    /// `Success`, or `StopTimeReached` once the horizon is hit.
    pub status: Status,
}

/// Counters kept by a problem since its last `init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of right-hand side evaluations
    pub rhs_evals: usize,
    /// Number of accepted steps
    pub accepted: usize,
    /// Number of rejected trial steps
    pub rejected: usize,
}

impl Stats {
    /// Accepted plus rejected trial steps.
    pub fn steps(&self) -> usize {
        self.accepted + self.rejected
    }
}
