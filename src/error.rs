//! Errors for the solver and problem lifecycle

use crate::{Float, alloc::Pool, callback::CallbackError, status::Status};

/// Failures reported by solver and problem operations.
///
/// Each variant maps onto exactly one host status code through
/// [`Error::status`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("allocation of {bytes} bytes from the {pool} pool was refused")]
    OutOfMemory { pool: Pool, bytes: usize },

    #[error("both a right-hand side and a residual callback were supplied")]
    ConflictingCallbacks,

    #[error("neither a right-hand side nor a residual callback was supplied")]
    MissingCallback,

    #[error("{algorithm} integrates ODEs and needs a right-hand side callback")]
    UnsupportedForm { algorithm: &'static str },

    #[error("tolerances are not defined")]
    ToleranceUndefined,

    #[error("{which} tolerance has {len} entries, problem dimension is {dimension}")]
    ToleranceTooShort {
        which: &'static str,
        len: usize,
        dimension: usize,
    },

    #[error("{which} tolerance entry {index} must be finite and non-negative (got {value})")]
    InvalidTolerance {
        which: &'static str,
        index: usize,
        value: Float,
    },

    #[error("relative and absolute tolerance of component {index} are both zero")]
    ZeroTolerance { index: usize },

    #[error("option {name} is out of range (got {value})")]
    InvalidOption { name: &'static str, value: Float },

    #[error("{what} has {len} entries, problem dimension is {dimension}")]
    LengthMismatch {
        what: &'static str,
        len: usize,
        dimension: usize,
    },

    #[error("step size must be positive and finite (got {0})")]
    InvalidStepSize(Float),

    #[error("problem has not been initialized")]
    NotInitialized,

    #[error("an algorithm named '{0}' is already registered")]
    DuplicateName(String),

    #[error("right-hand side failed at t = {t}: {source}")]
    Rhs {
        t: Float,
        #[source]
        source: CallbackError,
    },

    #[error("residual failed at t = {t}: {source}")]
    Residual {
        t: Float,
        #[source]
        source: CallbackError,
    },

    #[error("step-finished callback rejected the step at t = {t}: {source}")]
    StepFinished {
        t: Float,
        #[source]
        source: CallbackError,
    },

    #[error("step size {h} is too small for t = {t}")]
    StepSizeTooSmall { t: Float, h: Float },

    #[error("{rejections} consecutive step rejections at t = {t}")]
    TooManyRejections { t: Float, rejections: usize },
}

impl Error {
    /// Host status code carried by this error.
    pub fn status(&self) -> Status {
        match self {
            Error::OutOfMemory { .. } => Status::OutOfMemory,
            Error::ConflictingCallbacks
            | Error::MissingCallback
            | Error::UnsupportedForm { .. }
            | Error::ToleranceUndefined
            | Error::ToleranceTooShort { .. }
            | Error::InvalidTolerance { .. }
            | Error::ZeroTolerance { .. }
            | Error::InvalidOption { .. }
            | Error::LengthMismatch { .. }
            | Error::InvalidStepSize(_)
            | Error::NotInitialized
            | Error::DuplicateName(_) => Status::InvalidInput,
            Error::Rhs { .. } => Status::RhsFailure,
            Error::Residual { .. } => Status::ResidualFailure,
            Error::StepFinished { .. }
            | Error::StepSizeTooSmall { .. }
            | Error::TooManyRejections { .. } => Status::Failure,
        }
    }
}

impl From<&Error> for Status {
    fn from(err: &Error) -> Self {
        err.status()
    }
}
