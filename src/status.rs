//! Status codes shared with the host

use std::fmt;

/// Status vocabulary returned to the host by every lifecycle operation.
///
/// The discriminants are the integer codes the host expects. `Success`,
/// `Warning` and `StopTimeReached` are reported through `Ok`; the rest are
/// carried by [`crate::Error`] and recovered with [`crate::Error::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    Warning = 1,
    /// The configured stop time has been reached; no further progress is possible.
    StopTimeReached = 2,
    OutOfMemory = 3,
    /// Failure without a more specific code (numerical breakdown, callback abort).
    Failure = 4,
    InvalidInput = 5,
    /// The right-hand side callback reported an error.
    RhsFailure = 6,
    /// The DAE residual callback reported an error.
    ResidualFailure = 7,
}

impl Status {
    /// Integer code of this status.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// `true` for the codes that mean the operation did its job.
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            Status::Success | Status::Warning | Status::StopTimeReached
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Success => "success",
            Status::Warning => "warning",
            Status::StopTimeReached => "stop time reached",
            Status::OutOfMemory => "out of memory",
            Status::Failure => "failure",
            Status::InvalidInput => "invalid input",
            Status::RhsFailure => "right-hand side failure",
            Status::ResidualFailure => "residual failure",
        };
        f.write_str(text)
    }
}
