//! Pluggable integration algorithms for initial value problems.
//!
//! A host simulation engine drives an algorithm through a fixed lifecycle:
//! it creates a [`Solver`] once, creates one [`Problem`] per simulated
//! system, initializes it, then advances it one accepted step per
//! [`Problem::solve`] call and samples the last step with
//! [`Problem::interpolate`]. Memory and logging go through host supplied
//! [`Utilities`]. Every failure maps onto one of the [`Status`] codes.
//!
//! Two algorithms ship with the crate: the adaptive Runge-Kutta-Fehlberg
//! 4(5) method ([`Rkf45`]) and the fixed-step Heun method ([`Heun`]).

pub mod alloc;
pub mod callback;
mod error;
pub mod interpolate;
pub mod methods;
pub mod options;
pub mod prelude;
pub mod registry;
mod result;
pub mod solver;
mod status;
pub mod utilities;

pub use crate::alloc::{Allocator, Pool, SystemAllocator};
pub use callback::{CallbackError, CallbackResult, Callbacks};
pub use error::Error;
pub use interpolate::{Interpolant, Interpolate};
pub use methods::{ErrorNorm, Heun, Rkf45};
pub use options::{Options, Tolerance, Tolerances};
pub use registry::{Registration, Registry, register_builtins};
pub use result::{Stats, StepResult};
pub use solver::{IvpType, Problem, Properties, Solver, destroy_solver};
pub use status::Status;
pub use utilities::{LogFacade, Logger, Utilities};

// Prevent selecting two incompatible float precision features at once.
#[cfg(all(feature = "f32", feature = "f64"))]
compile_error!(
    "features 'f32' and 'f64' cannot both be enabled; pick exactly one Float precision feature"
);

/// Change this to f128, f64, f32 as desired.
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f64")]
pub type Float = f64;
