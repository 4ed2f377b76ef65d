//! The solver / problem contract the host drives.
//!
//! An algorithm family implements [`Solver`]; each simulated system gets its
//! own [`Problem`] created by that solver. The host drives a problem as
//!
//! ```text
//! create_problem -> init -> solve / interpolate ... -> (init again on restart) -> drop
//! ```
//!
//! Destroying is dropping: every buffer is held by a lease and goes back to
//! the host allocator exactly once.

use std::fmt;

use crate::{
    Float,
    callback::Callbacks,
    error::Error,
    options::Options,
    result::{Stats, StepResult},
    status::Status,
    utilities::Utilities,
};

/// Problem form an algorithm integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IvpType {
    /// `y' = f(t, y)`
    Ode,
    /// `F(t, y, y') = 0`
    Dae,
}

/// Property record registered alongside an algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    /// Unique, case-insensitive name.
    pub name: String,
    /// Human readable description.
    pub description: String,
    /// `true` for fixed-step algorithms.
    pub fixed_step: bool,
    pub ivp_type: IvpType,
}

impl Properties {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        fixed_step: bool,
        ivp_type: IvpType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fixed_step,
            ivp_type,
        }
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stepping = if self.fixed_step { "fixed" } else { "adaptive" };
        write!(
            f,
            "{} ({:?}, {} step): {}",
            self.name, self.ivp_type, stepping, self.description
        )
    }
}

/// An integration algorithm instance.
///
/// Holds the host utilities and nothing problem specific, so one instance
/// serves any number of problems.
pub trait Solver {
    fn properties(&self) -> Properties;

    fn utilities(&self) -> &Utilities;

    /// Creates a problem of `dimension` states.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] when the host refuses an allocation (nothing
    /// stays allocated), or an invalid-input variant when the callbacks or
    /// options do not fit the algorithm.
    fn create_problem(
        &self,
        dimension: usize,
        callbacks: Callbacks,
        options: Options,
    ) -> Result<Box<dyn Problem>, Error>;

    /// Releases a problem created by this solver. `None` is a no-op.
    fn destroy_problem(&self, problem: Option<Box<dyn Problem>>) {
        if let Some(problem) = problem {
            log::debug!(
                "destroying {} problem of dimension {}",
                self.properties().name,
                problem.dimension()
            );
        }
    }
}

/// One integration run.
pub trait Problem {
    fn dimension(&self) -> usize;

    /// Sets the initial point. `yp0` is used as the initial derivative when
    /// given; otherwise the right-hand side is evaluated at `(t0, y0)`.
    ///
    /// Fresh initialization and restart (`is_reinit`) behave identically:
    /// step-size adaptation and statistics start over.
    fn init(
        &mut self,
        t0: Float,
        y0: &[Float],
        yp0: Option<&[Float]>,
        is_reinit: bool,
    ) -> Result<Status, Error>;

    /// Advances by one accepted step starting at `t`.
    ///
    /// `step_size` is the fixed step, or the first trial step of an
    /// adaptive algorithm. On success the accepted state and derivative are
    /// written to `yret` and `ypret`; on failure both are left untouched.
    fn solve(
        &mut self,
        step_size: Float,
        t: Float,
        tout: Float,
        yret: &mut [Float],
        ypret: &mut [Float],
    ) -> Result<StepResult, Error>;

    /// Writes the dense-output approximation at `tout` into `yret`.
    ///
    /// Only meaningful within the last accepted step; other times are
    /// extrapolated.
    fn interpolate(&self, tout: Float, yret: &mut [Float]) -> Result<Status, Error>;

    fn stats(&self) -> Stats;
}

/// Constructor registered for an algorithm. `None` means the host
/// allocator refused the solver instance.
pub type CreateSolver = fn(Utilities) -> Option<Box<dyn Solver>>;

/// Releases a solver instance. `None` is a no-op.
pub fn destroy_solver(solver: Option<Box<dyn Solver>>) {
    if let Some(solver) = solver {
        log::debug!("destroying solver {}", solver.properties().name);
    }
}
