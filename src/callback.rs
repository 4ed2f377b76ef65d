//! Numeric callbacks supplied by the model side.
//!
//! The integrator calls back into the host for the right-hand side
//! `y' = f(t, y)` and, after each accepted step, for an optional
//! step-finished notification. The DAE residual and the Jacobian are part of
//! the protocol so hosts can hand over a complete callback set, but no
//! explicit algorithm in this crate evaluates them.
//!
//! Every callback kind is a trait with a blanket implementation for closures
//! of the matching signature, so either a struct or a closure can be used.
//!
//! # Example
//!
//! ```ignore
//! let callbacks = Callbacks::new()
//!     .rhs(|_t, y, yp| {
//!         yp[0] = -y[0];
//!         Ok(())
//!     })
//!     .step_finished(|t, y| {
//!         println!("t = {t}, y = {y:?}");
//!         Ok(())
//!     });
//! ```

use crate::{Float, error::Error};

/// Failure reported by a model callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of a model callback.
pub type CallbackResult = Result<(), CallbackError>;

/// Right-hand side of the ODE `y' = f(t, y)`.
///
/// `y` is read-only and never aliases `yp`; fill every entry of `yp`.
pub trait Rhs {
    fn rhs(&mut self, t: Float, y: &[Float], yp: &mut [Float]) -> CallbackResult;
}

impl<F> Rhs for F
where
    F: FnMut(Float, &[Float], &mut [Float]) -> CallbackResult,
{
    fn rhs(&mut self, t: Float, y: &[Float], yp: &mut [Float]) -> CallbackResult {
        self(t, y, yp)
    }
}

/// Residual `delta = F(t, y, y')` of a DAE.
pub trait Residual {
    fn residual(
        &mut self,
        t: Float,
        y: &[Float],
        yp: &[Float],
        delta: &mut [Float],
    ) -> CallbackResult;
}

impl<F> Residual for F
where
    F: FnMut(Float, &[Float], &[Float], &mut [Float]) -> CallbackResult,
{
    fn residual(
        &mut self,
        t: Float,
        y: &[Float],
        yp: &[Float],
        delta: &mut [Float],
    ) -> CallbackResult {
        self(t, y, yp, delta)
    }
}

/// Jacobian `pd = dF/dy + cj dF/dy'` (DAE) or `pd = df/dy` (ODE), column major.
pub trait Jacobian {
    fn jacobian(
        &mut self,
        t: Float,
        y: &[Float],
        yp: &[Float],
        cj: Float,
        pd: &mut [Float],
    ) -> CallbackResult;
}

impl<F> Jacobian for F
where
    F: FnMut(Float, &[Float], &[Float], Float, &mut [Float]) -> CallbackResult,
{
    fn jacobian(
        &mut self,
        t: Float,
        y: &[Float],
        yp: &[Float],
        cj: Float,
        pd: &mut [Float],
    ) -> CallbackResult {
        self(t, y, yp, cj, pd)
    }
}

/// Notification that a step ending at `t` with state `y` was accepted.
///
/// Returning an error aborts the step: nothing is committed and the solve
/// call fails.
pub trait StepFinished {
    fn step_finished(&mut self, t: Float, y: &[Float]) -> CallbackResult;
}

impl<F> StepFinished for F
where
    F: FnMut(Float, &[Float]) -> CallbackResult,
{
    fn step_finished(&mut self, t: Float, y: &[Float]) -> CallbackResult {
        self(t, y)
    }
}

/// The callback set handed to `create_problem`.
///
/// Exactly one of the right-hand side and residual slots must be filled.
#[derive(Default)]
pub struct Callbacks {
    pub(crate) rhs: Option<Box<dyn Rhs>>,
    pub(crate) residual: Option<Box<dyn Residual>>,
    pub(crate) jacobian: Option<Box<dyn Jacobian>>,
    pub(crate) step_finished: Option<Box<dyn StepFinished>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the right-hand side from a closure.
    pub fn rhs<F>(self, f: F) -> Self
    where
        F: FnMut(Float, &[Float], &mut [Float]) -> CallbackResult + 'static,
    {
        self.rhs_system(f)
    }

    /// Sets the right-hand side from any [`Rhs`] implementor.
    pub fn rhs_system<R: Rhs + 'static>(mut self, rhs: R) -> Self {
        self.rhs = Some(Box::new(rhs));
        self
    }

    /// Sets the DAE residual.
    pub fn residual<F>(mut self, f: F) -> Self
    where
        F: FnMut(Float, &[Float], &[Float], &mut [Float]) -> CallbackResult + 'static,
    {
        self.residual = Some(Box::new(f));
        self
    }

    pub fn jacobian<F>(mut self, f: F) -> Self
    where
        F: FnMut(Float, &[Float], &[Float], Float, &mut [Float]) -> CallbackResult + 'static,
    {
        self.jacobian = Some(Box::new(f));
        self
    }

    pub fn step_finished<F>(mut self, f: F) -> Self
    where
        F: FnMut(Float, &[Float]) -> CallbackResult + 'static,
    {
        self.step_finished = Some(Box::new(f));
        self
    }

    pub fn has_rhs(&self) -> bool {
        self.rhs.is_some()
    }

    pub fn has_residual(&self) -> bool {
        self.residual.is_some()
    }

    /// Validates the set for an explicit ODE algorithm named `algorithm`.
    pub(crate) fn into_ode(self, algorithm: &'static str) -> Result<OdeCallbacks, Error> {
        match (self.rhs, self.residual) {
            (Some(_), Some(_)) => Err(Error::ConflictingCallbacks),
            (None, None) => Err(Error::MissingCallback),
            (None, Some(_)) => Err(Error::UnsupportedForm { algorithm }),
            (Some(rhs), None) => Ok(OdeCallbacks {
                rhs,
                _jacobian: self.jacobian,
                step_finished: self.step_finished,
            }),
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("rhs", &self.has_rhs())
            .field("residual", &self.has_residual())
            .field("jacobian", &self.jacobian.is_some())
            .field("step_finished", &self.step_finished.is_some())
            .finish()
    }
}

/// Callbacks of an ODE problem after validation.
pub(crate) struct OdeCallbacks {
    rhs: Box<dyn Rhs>,
    // Kept so the host's Jacobian lives as long as the problem; explicit methods ignore it.
    _jacobian: Option<Box<dyn Jacobian>>,
    step_finished: Option<Box<dyn StepFinished>>,
}

impl OdeCallbacks {
    pub(crate) fn rhs(&mut self, t: Float, y: &[Float], yp: &mut [Float]) -> Result<(), Error> {
        self.rhs
            .rhs(t, y, yp)
            .map_err(|source| Error::Rhs { t, source })
    }

    pub(crate) fn step_finished(&mut self, t: Float, y: &[Float]) -> Result<(), Error> {
        match self.step_finished.as_mut() {
            Some(cb) => cb
                .step_finished(t, y)
                .map_err(|source| Error::StepFinished { t, source }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay() -> Callbacks {
        Callbacks::new().rhs(|_t, y, yp| {
            yp[0] = -y[0];
            Ok(())
        })
    }

    #[test]
    fn rhs_only_is_a_valid_ode_set() {
        let mut cbs = decay().into_ode("test").unwrap();
        let mut yp = [0.0];
        cbs.rhs(0.0, &[2.0], &mut yp).unwrap();
        assert_eq!(yp, [-2.0]);
        assert!(cbs.step_finished(0.0, &[2.0]).is_ok());
    }

    #[test]
    fn rhs_and_residual_conflict() {
        let cbs = decay().residual(|_t, _y, _yp, _delta| Ok(()));
        assert!(cbs.has_rhs() && cbs.has_residual());
        assert!(matches!(cbs.into_ode("test"), Err(Error::ConflictingCallbacks)));
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(!Callbacks::new().has_rhs());
        assert!(!Callbacks::new().has_residual());
        assert!(matches!(
            Callbacks::new().into_ode("test"),
            Err(Error::MissingCallback)
        ));
    }

    #[test]
    fn residual_only_is_unsupported_for_ode_methods() {
        let cbs = Callbacks::new().residual(|_t, _y, _yp, _delta| Ok(()));
        assert!(matches!(
            cbs.into_ode("rkf45"),
            Err(Error::UnsupportedForm { algorithm: "rkf45" })
        ));
    }

    #[test]
    fn callback_errors_carry_the_evaluation_time() {
        let mut cbs = Callbacks::new()
            .rhs(|_t, _y, _yp| Err(CallbackError::new("singular")))
            .into_ode("test")
            .unwrap();
        let err = cbs.rhs(1.5, &[0.0], &mut [0.0]).unwrap_err();
        let Error::Rhs { t, source } = &err else {
            panic!("unexpected error {err}");
        };
        assert_eq!(*t, 1.5);
        assert_eq!(source.message(), "singular");
    }

    struct Spring {
        k: Float,
    }

    impl Rhs for Spring {
        fn rhs(&mut self, _t: Float, y: &[Float], yp: &mut [Float]) -> CallbackResult {
            yp[0] = y[1];
            yp[1] = -self.k * y[0];
            Ok(())
        }
    }

    #[test]
    fn struct_systems_plug_in_as_rhs() {
        let mut cbs = Callbacks::new()
            .rhs_system(Spring { k: 4.0 })
            .into_ode("test")
            .unwrap();
        let mut yp = [0.0; 2];
        cbs.rhs(0.0, &[1.0, 0.5], &mut yp).unwrap();
        assert_eq!(yp, [0.5, -4.0]);
    }
}
