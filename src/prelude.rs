//! Convenient prelude: import the most commonly used traits, types, and functions.
//!
//! Bring this into scope with:
//!
//! ```rust
//! use ivp_plugins::prelude::*;
//! ```
//!
//! Re-exports included:
//! - The contract: `Solver`, `Problem`, `Status`, `Error`.
//! - Problem setup: `Callbacks`, `CallbackError`, `Options`, `Tolerance`, `Tolerances`.
//! - Algorithms and lookup: `Rkf45`, `Heun`, `Registry`, `Utilities`.

pub use crate::{
    Float,
    callback::{CallbackError, CallbackResult, Callbacks},
    error::Error,
    methods::{Heun, Rkf45},
    options::{Options, Tolerance, Tolerances},
    registry::Registry,
    solver::{Problem, Solver},
    status::Status,
    utilities::Utilities,
};
