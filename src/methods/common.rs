//! State and lifecycle shared by the explicit ODE methods

use std::rc::Rc;

use crate::{
    Float,
    alloc::{Allocator, Buffer, Lease, Pool},
    callback::{Callbacks, OdeCallbacks},
    error::Error,
    interpolate::{CubicHermite, Interpolant, Interpolate, Linear},
    options::Options,
    result::{Stats, StepResult},
    status::Status,
    utilities::Utilities,
};

/// Per-method scratch vectors, allocated once per problem.
pub(crate) trait Scratch: Sized {
    fn allocate(allocator: &Rc<dyn Allocator>, n: usize) -> Result<Self, Error>;
}

/// The last accepted step: endpoints, states and derivatives.
pub(crate) struct Trajectory {
    pub(crate) t_prev: Float,
    pub(crate) t_cur: Float,
    pub(crate) y_prev: Buffer,
    pub(crate) y_cur: Buffer,
    pub(crate) yp_prev: Buffer,
    pub(crate) yp_cur: Buffer,
}

impl Trajectory {
    fn allocate(allocator: &Rc<dyn Allocator>, n: usize) -> Result<Self, Error> {
        Ok(Self {
            t_prev: 0.0,
            t_cur: 0.0,
            y_prev: Buffer::zeroed(allocator, Pool::Data, n)?,
            y_cur: Buffer::zeroed(allocator, Pool::Data, n)?,
            yp_prev: Buffer::zeroed(allocator, Pool::Data, n)?,
            yp_cur: Buffer::zeroed(allocator, Pool::Data, n)?,
        })
    }

    /// Collapses the trajectory onto the point `(t0, y0)`, taking the
    /// derivative already held in `yp_cur`.
    fn seed(&mut self, t0: Float, y0: &[Float]) {
        self.t_prev = t0;
        self.t_cur = t0;
        self.y_prev.copy_from_slice(y0);
        self.y_cur.copy_from_slice(y0);
        self.yp_prev.copy_from_slice(&self.yp_cur);
    }

    /// Makes `[t_start, t_new]` the last accepted step.
    pub(crate) fn commit(
        &mut self,
        t_start: Float,
        t_new: Float,
        y_new: &[Float],
        yp_new: &[Float],
    ) {
        std::mem::swap(&mut self.y_prev, &mut self.y_cur);
        std::mem::swap(&mut self.yp_prev, &mut self.yp_cur);
        self.y_cur.copy_from_slice(y_new);
        self.yp_cur.copy_from_slice(yp_new);
        self.t_prev = t_start;
        self.t_cur = t_new;
    }

    /// Copies the current state and derivative to the host.
    pub(crate) fn publish(&self, yret: &mut [Float], ypret: &mut [Float]) {
        let n = self.y_cur.len();
        yret[..n].copy_from_slice(&self.y_cur);
        ypret[..n].copy_from_slice(&self.yp_cur);
    }

    /// Dense output at `tout`. Returns `false` if `tout` lies outside the
    /// last step and the value was extrapolated.
    fn interpolate(&self, tout: Float, interpolant: Interpolant, yret: &mut [Float]) -> bool {
        let (t0, t1) = (self.t_prev, self.t_cur);
        if tout == t1 || t0 == t1 {
            yret.copy_from_slice(&self.y_cur);
            return tout == t1;
        }
        if tout == t0 {
            yret.copy_from_slice(&self.y_prev);
            return true;
        }
        match interpolant {
            Interpolant::Linear => {
                Linear::new(t0, t1, &self.y_prev, &self.y_cur).interpolate(tout, yret)
            }
            Interpolant::Hermite => CubicHermite::new(
                t0,
                t1,
                &self.y_prev,
                &self.y_cur,
                &self.yp_prev,
                &self.yp_cur,
            )
            .interpolate(tout, yret),
        }
        tout >= t0.min(t1) && tout <= t0.max(t1)
    }
}

/// Buffers of a problem with at least one state.
pub(crate) struct Work<S> {
    pub(crate) trajectory: Trajectory,
    pub(crate) scratch: S,
}

/// Problem instance state common to the explicit ODE methods.
///
/// `work` is `None` exactly when the dimension is zero; such problems own no
/// vectors and every operation on them succeeds immediately.
pub(crate) struct OdeCore<S> {
    pub(crate) algorithm: &'static str,
    pub(crate) dimension: usize,
    pub(crate) options: Options,
    pub(crate) callbacks: OdeCallbacks,
    pub(crate) utilities: Utilities,
    pub(crate) work: Option<Work<S>>,
    pub(crate) initialized: bool,
    /// Step proposed by the controller for the next solve call.
    pub(crate) h_next: Option<Float>,
    pub(crate) h_max: Float,
    pub(crate) stats: Stats,
    pub(crate) _data: Lease,
    pub(crate) _control: Lease,
}

impl<S: Scratch> OdeCore<S> {
    /// Validates the inputs, then leases the problem record `P`, its data
    /// block and every vector. Validation happens before the first lease.
    pub(crate) fn create<P>(
        algorithm: &'static str,
        utilities: &Utilities,
        dimension: usize,
        callbacks: Callbacks,
        options: Options,
        tolerance_required: bool,
    ) -> Result<Self, Error> {
        let callbacks = callbacks.into_ode(algorithm)?;
        options.validate(dimension, tolerance_required)?;

        let allocator = utilities.allocator();
        let control = Lease::of::<P>(allocator, Pool::Control)?;
        let data = Lease::of::<Work<S>>(allocator, Pool::Data)?;
        let work = if dimension > 0 {
            Some(Work {
                trajectory: Trajectory::allocate(allocator, dimension)?,
                scratch: S::allocate(allocator, dimension)?,
            })
        } else {
            None
        };

        log::debug!("created {algorithm} problem of dimension {dimension}");
        Ok(Self {
            algorithm,
            dimension,
            h_max: options.step_cap(0.0),
            options,
            callbacks,
            utilities: utilities.clone(),
            work,
            initialized: false,
            h_next: None,
            stats: Stats::default(),
            _data: data,
            _control: control,
        })
    }

    pub(crate) fn init(
        &mut self,
        t0: Float,
        y0: &[Float],
        yp0: Option<&[Float]>,
        is_reinit: bool,
    ) -> Result<Status, Error> {
        self.initialized = false;
        self.h_next = None;
        self.h_max = self.options.step_cap(t0);
        self.stats = Stats::default();

        let n = self.dimension;
        let Some(work) = self.work.as_mut() else {
            self.initialized = true;
            return Ok(Status::Success);
        };
        check_len("y0", y0.len(), n)?;
        let y0 = &y0[..n];

        let trajectory = &mut work.trajectory;
        match yp0 {
            Some(yp0) => {
                check_len("yp0", yp0.len(), n)?;
                trajectory.yp_cur.copy_from_slice(&yp0[..n]);
            }
            None => {
                self.callbacks.rhs(t0, y0, &mut trajectory.yp_cur)?;
                self.stats.rhs_evals += 1;
            }
        }
        trajectory.seed(t0, y0);

        log::debug!(
            "{} at t0 = {t0}, dimension {n}",
            if is_reinit { "reinitialized" } else { "initialized" }
        );
        self.initialized = true;
        Ok(Status::Success)
    }

    /// Dense output over the last accepted step.
    pub(crate) fn interpolate(&self, tout: Float, yret: &mut [Float]) -> Result<Status, Error> {
        let Some(work) = self.work.as_ref() else {
            return Ok(Status::Success);
        };
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        check_len("yret", yret.len(), self.dimension)?;

        let within = work.trajectory.interpolate(
            tout,
            self.options.interpolant,
            &mut yret[..self.dimension],
        );
        if within {
            return Ok(Status::Success);
        }
        let message = format!(
            "extrapolating to t = {tout} outside the last step [{}, {}]",
            work.trajectory.t_prev, work.trajectory.t_cur
        );
        let origin = format!("{}::interpolate", self.algorithm);
        self.utilities.logger().log(Status::Warning, &origin, &message);
        Ok(Status::Warning)
    }

    /// Checks shared by every solve call. Returns the result directly when
    /// no step needs to be taken; at the stop time the current state is
    /// published as is.
    pub(crate) fn enter(
        &self,
        t: Float,
        tout: Float,
        yret: &mut [Float],
        ypret: &mut [Float],
    ) -> Result<Option<StepResult>, Error> {
        if self.work.is_none() {
            return Ok(Some(StepResult {
                tret: tout,
                status: Status::Success,
            }));
        }
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        check_len("yret", yret.len(), self.dimension)?;
        check_len("ypret", ypret.len(), self.dimension)?;

        match (self.options.stop_time, self.work.as_ref()) {
            (Some(stop), Some(work)) if t >= stop => {
                log::debug!("t = {t} is at or past the stop time {stop}");
                work.trajectory.publish(yret, ypret);
                Ok(Some(StepResult {
                    tret: stop,
                    status: Status::StopTimeReached,
                }))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn report(&self, origin: &str, err: &Error) {
        self.utilities.report(origin, err);
    }
}

/// Runs the step-finished hook, then commits the step and publishes it.
/// Nothing is committed or published if the hook fails.
#[allow(clippy::too_many_arguments)]
pub(crate) fn accept_step(
    callbacks: &mut OdeCallbacks,
    trajectory: &mut Trajectory,
    t_start: Float,
    t_new: Float,
    y_new: &[Float],
    yp_new: &[Float],
    yret: &mut [Float],
    ypret: &mut [Float],
) -> Result<(), Error> {
    callbacks.step_finished(t_new, y_new)?;
    trajectory.commit(t_start, t_new, y_new, yp_new);
    trajectory.publish(yret, ypret);
    Ok(())
}

/// `StopTimeReached` once `t` lands on or past the stop time.
pub(crate) fn stop_status(stop: Option<Float>, t: Float) -> Status {
    match stop {
        Some(stop) if t >= stop => Status::StopTimeReached,
        _ => Status::Success,
    }
}

pub(crate) fn check_len(what: &'static str, len: usize, dimension: usize) -> Result<(), Error> {
    if len < dimension {
        return Err(Error::LengthMismatch {
            what,
            len,
            dimension,
        });
    }
    Ok(())
}
