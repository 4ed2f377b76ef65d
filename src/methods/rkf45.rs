//! Runge-Kutta-Fehlberg 4(5) adaptive-step integrator.

use std::rc::Rc;

use crate::{
    Float,
    alloc::{Allocator, Buffer, Lease, Pool},
    callback::{Callbacks, OdeCallbacks},
    error::Error,
    methods::common::{OdeCore, Scratch, Work, accept_step, stop_status},
    options::Options,
    registry::Registration,
    result::{Stats, StepResult},
    solver::{IvpType, Problem, Properties, Solver},
    status::Status,
    utilities::Utilities,
};

/// The Runge-Kutta-Fehlberg 4(5) algorithm.
///
/// Each solve call takes exactly one accepted step. The local error of the
/// fourth order solution is estimated from the embedded fifth order one and
/// drives the next step size; the state is advanced with the fifth order
/// solution. Dense output is cubic Hermite over the last step.
pub struct Rkf45 {
    utilities: Utilities,
    _lease: Lease,
}

impl Rkf45 {
    pub const NAME: &'static str = "rkf45";

    /// Property record under which the algorithm registers.
    pub fn record() -> Properties {
        Properties::new(
            Self::NAME,
            "Runge-Kutta-Fehlberg 4(5), adaptive step with error control",
            false,
            IvpType::Ode,
        )
    }

    pub fn registration() -> Registration {
        Registration::new(Self::record(), Self::create)
    }

    /// Creates a solver instance, leasing its record from the control pool.
    pub fn create(utilities: Utilities) -> Option<Box<dyn Solver>> {
        match Lease::of::<Self>(utilities.allocator(), Pool::Control) {
            Ok(lease) => Some(Box::new(Self {
                utilities,
                _lease: lease,
            })),
            Err(err) => {
                utilities.report("rkf45::create", &err);
                None
            }
        }
    }
}

impl Solver for Rkf45 {
    fn properties(&self) -> Properties {
        Self::record()
    }

    fn utilities(&self) -> &Utilities {
        &self.utilities
    }

    fn create_problem(
        &self,
        dimension: usize,
        callbacks: Callbacks,
        options: Options,
    ) -> Result<Box<dyn Problem>, Error> {
        match OdeCore::create::<Rkf45Problem>(
            Self::NAME,
            &self.utilities,
            dimension,
            callbacks,
            options,
            true,
        ) {
            Ok(core) => Ok(Box::new(Rkf45Problem { core })),
            Err(err) => {
                self.utilities.report("rkf45::create_problem", &err);
                Err(err)
            }
        }
    }
}

/// An RKF45 problem instance.
pub struct Rkf45Problem {
    core: OdeCore<Stages>,
}

/// Stage derivatives, the states they are evaluated at, and the trial step.
pub(crate) struct Stages {
    k1: Buffer,
    k2: Buffer,
    k3: Buffer,
    k4: Buffer,
    k5: Buffer,
    k6: Buffer,
    k2y: Buffer,
    k3y: Buffer,
    k4y: Buffer,
    k5y: Buffer,
    k6y: Buffer,
    y_new: Buffer,
    yp_new: Buffer,
    d: Buffer,
}

impl Scratch for Stages {
    fn allocate(allocator: &Rc<dyn Allocator>, n: usize) -> Result<Self, Error> {
        let buffer = || Buffer::zeroed(allocator, Pool::Data, n);
        Ok(Self {
            k1: buffer()?,
            k2: buffer()?,
            k3: buffer()?,
            k4: buffer()?,
            k5: buffer()?,
            k6: buffer()?,
            k2y: buffer()?,
            k3y: buffer()?,
            k4y: buffer()?,
            k5y: buffer()?,
            k6y: buffer()?,
            y_new: buffer()?,
            yp_new: buffer()?,
            d: buffer()?,
        })
    }
}

impl Rkf45Problem {
    fn step(
        &mut self,
        step_size: Float,
        t: Float,
        tout: Float,
        yret: &mut [Float],
        ypret: &mut [Float],
    ) -> Result<StepResult, Error> {
        if let Some(done) = self.core.enter(t, tout, yret, ypret)? {
            return Ok(done);
        }
        let OdeCore {
            options,
            callbacks,
            work,
            stats,
            h_next,
            h_max,
            ..
        } = &mut self.core;
        let Some(Work {
            trajectory,
            scratch: st,
        }) = work.as_mut()
        else {
            return Ok(StepResult {
                tret: tout,
                status: Status::Success,
            });
        };
        let tol = options.tolerance.as_ref().ok_or(Error::ToleranceUndefined)?;
        let stop = options.stop_time;

        // The host step only seeds the controller.
        let mut h = match *h_next {
            Some(h) => h,
            None if step_size.is_finite() && step_size > 0.0 => step_size,
            None => options.default_initial_step(),
        };
        if !(h.is_finite() && h > 0.0) {
            return Err(Error::InvalidStepSize(h));
        }
        h = h.min(*h_max);

        let mut rejections = 0;
        loop {
            if 0.1 * h <= t.abs() * options.uround {
                return Err(Error::StepSizeTooSmall { t, h });
            }

            // Check for last step adjustment
            let mut t_new = t + h;
            if let Some(stop) = stop {
                if t + 1.01 * h >= stop && stop - t <= *h_max {
                    h = stop - t;
                    t_new = stop;
                }
            }

            st.k1.copy_from_slice(&trajectory.yp_cur);
            stages(callbacks, stats, &trajectory.y_cur, st, t, h)?;

            let err = options
                .error_norm
                .measure(&st.d, &trajectory.y_cur, &st.y_new, h, tol);
            let factor = step_factor(err);

            if options.error_norm.accepts(err) {
                // Derivative at the new point, first stage of the next step
                callbacks.rhs(t_new, &st.y_new, &mut st.yp_new)?;
                stats.rhs_evals += 1;

                accept_step(
                    callbacks,
                    trajectory,
                    t,
                    t_new,
                    &st.y_new,
                    &st.yp_new,
                    yret,
                    ypret,
                )?;
                stats.accepted += 1;
                *h_next = Some((h * factor).min(*h_max));
                log::trace!("accepted t = {t_new}, h = {h}, err = {err}");

                return Ok(StepResult {
                    tret: t_new,
                    status: stop_status(stop, t_new),
                });
            }

            // Step rejected
            stats.rejected += 1;
            rejections += 1;
            log::trace!("rejected t = {t}, h = {h}, err = {err}");
            if rejections > options.max_rejections {
                return Err(Error::TooManyRejections { t, rejections });
            }
            h *= factor;
        }
    }
}

impl Problem for Rkf45Problem {
    fn dimension(&self) -> usize {
        self.core.dimension
    }

    fn init(
        &mut self,
        t0: Float,
        y0: &[Float],
        yp0: Option<&[Float]>,
        is_reinit: bool,
    ) -> Result<Status, Error> {
        let result = self.core.init(t0, y0, yp0, is_reinit);
        if let Err(err) = &result {
            self.core.report("rkf45::init", err);
        }
        result
    }

    fn solve(
        &mut self,
        step_size: Float,
        t: Float,
        tout: Float,
        yret: &mut [Float],
        ypret: &mut [Float],
    ) -> Result<StepResult, Error> {
        let result = self.step(step_size, t, tout, yret, ypret);
        if let Err(err) = &result {
            self.core.report("rkf45::solve", err);
        }
        result
    }

    fn interpolate(&self, tout: Float, yret: &mut [Float]) -> Result<Status, Error> {
        let result = self.core.interpolate(tout, yret);
        if let Err(err) = &result {
            self.core.report("rkf45::interpolate", err);
        }
        result
    }

    fn stats(&self) -> Stats {
        self.core.stats
    }
}

/// Stages 2 to 6 of a trial step of size `h` from `(t, y)`, given `k1` in
/// `st.k1`. Leaves the fifth order solution in `st.y_new` and the local
/// error estimate in `st.d`.
fn stages(
    callbacks: &mut OdeCallbacks,
    stats: &mut Stats,
    y: &[Float],
    st: &mut Stages,
    t: Float,
    h: Float,
) -> Result<(), Error> {
    let n = y.len();

    // Stage 2
    for i in 0..n {
        st.k2y[i] = y[i] + h * A21 * st.k1[i];
    }
    callbacks.rhs(t + C2 * h, &st.k2y, &mut st.k2)?;

    // Stage 3
    for i in 0..n {
        st.k3y[i] = y[i] + h * (A31 * st.k1[i] + A32 * st.k2[i]);
    }
    callbacks.rhs(t + C3 * h, &st.k3y, &mut st.k3)?;

    // Stage 4
    for i in 0..n {
        st.k4y[i] = y[i] + h * (A41 * st.k1[i] + A42 * st.k2[i] + A43 * st.k3[i]);
    }
    callbacks.rhs(t + C4 * h, &st.k4y, &mut st.k4)?;

    // Stage 5
    for i in 0..n {
        st.k5y[i] =
            y[i] + h * (A51 * st.k1[i] + A52 * st.k2[i] + A53 * st.k3[i] + A54 * st.k4[i]);
    }
    callbacks.rhs(t + C5 * h, &st.k5y, &mut st.k5)?;

    // Stage 6
    for i in 0..n {
        st.k6y[i] = y[i]
            + h * (A61 * st.k1[i]
                + A62 * st.k2[i]
                + A63 * st.k3[i]
                + A64 * st.k4[i]
                + A65 * st.k5[i]);
    }
    callbacks.rhs(t + C6 * h, &st.k6y, &mut st.k6)?;

    stats.rhs_evals += 5;

    // Error estimate and fifth order solution
    for i in 0..n {
        st.d[i] = h
            * (E1 * st.k1[i] + E3 * st.k3[i] + E4 * st.k4[i] + E5 * st.k5[i] + E6 * st.k6[i]);
        st.y_new[i] =
            y[i] + h * (B1 * st.k1[i] + B3 * st.k3[i] + B4 * st.k4[i] + B5 * st.k5[i]) + st.d[i];
    }
    Ok(())
}

/// Factor applied to `h` for a normalized error `err`, within
/// `[MIN_SCALE, MAX_SCALE]`.
pub(crate) fn step_factor(err: Float) -> Float {
    if err.is_nan() {
        return MIN_SCALE;
    }
    let q = SAFETY * err.powf(-0.25);
    if q <= 0.1 {
        MIN_SCALE
    } else if q >= MAX_SCALE {
        MAX_SCALE
    } else {
        q.max(MIN_SCALE)
    }
}

const SAFETY: Float = 0.84;
const MIN_SCALE: Float = 0.2;
const MAX_SCALE: Float = 4.0;

// RKF45 Butcher tableau coefficients
const C2: Float = 1.0 / 4.0;
const C3: Float = 3.0 / 8.0;
const C4: Float = 12.0 / 13.0;
const C5: Float = 1.0;
const C6: Float = 1.0 / 2.0;

const A21: Float = 1.0 / 4.0;
const A31: Float = 3.0 / 32.0;
const A32: Float = 9.0 / 32.0;
const A41: Float = 1932.0 / 2197.0;
const A42: Float = -7200.0 / 2197.0;
const A43: Float = 7296.0 / 2197.0;
const A51: Float = 439.0 / 216.0;
const A52: Float = -8.0;
const A53: Float = 3680.0 / 513.0;
const A54: Float = -845.0 / 4104.0;
const A61: Float = -8.0 / 27.0;
const A62: Float = 2.0;
const A63: Float = -3544.0 / 2565.0;
const A64: Float = 1859.0 / 4104.0;
const A65: Float = -11.0 / 40.0;

// Fourth order weights
const B1: Float = 25.0 / 216.0;
const B3: Float = 1408.0 / 2565.0;
const B4: Float = 2197.0 / 4104.0;
const B5: Float = -1.0 / 5.0;

// Fifth minus fourth order weights
const E1: Float = 1.0 / 360.0;
const E3: Float = -128.0 / 4275.0;
const E4: Float = -2197.0 / 75240.0;
const E5: Float = 1.0 / 50.0;
const E6: Float = 2.0 / 55.0;
