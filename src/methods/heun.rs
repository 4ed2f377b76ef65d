//! Heun's method (explicit trapezoidal rule), fixed step.

use std::rc::Rc;

use crate::{
    Float,
    alloc::{Allocator, Buffer, Lease, Pool},
    callback::Callbacks,
    error::Error,
    methods::common::{OdeCore, Scratch, Work, accept_step, stop_status},
    options::Options,
    registry::Registration,
    result::{Stats, StepResult},
    solver::{IvpType, Problem, Properties, Solver},
    status::Status,
    utilities::Utilities,
};

/// Heun's second order predictor/corrector with a fixed step.
pub struct Heun {
    utilities: Utilities,
    _lease: Lease,
}

impl Heun {
    pub const NAME: &'static str = "heun";

    pub fn record() -> Properties {
        Properties::new(
            Self::NAME,
            "Heun's method (explicit trapezoidal rule), fixed step",
            true,
            IvpType::Ode,
        )
    }

    pub fn registration() -> Registration {
        Registration::new(Self::record(), Self::create)
    }

    pub fn create(utilities: Utilities) -> Option<Box<dyn Solver>> {
        match Lease::of::<Self>(utilities.allocator(), Pool::Control) {
            Ok(lease) => Some(Box::new(Self {
                utilities,
                _lease: lease,
            })),
            Err(err) => {
                utilities.report("heun::create", &err);
                None
            }
        }
    }
}

impl Solver for Heun {
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
        OdeCore::create::<HeunProblem>(
            Self::NAME,
            &self.utilities,
            dimension,
            callbacks,
            options,
            false,
        )
        .map(|core| Box::new(HeunProblem { core }) as Box<dyn Problem>)
        .inspect_err(|err| self.utilities.report("heun::create_problem", err))
    }
}

pub struct HeunProblem {
    core: OdeCore<Predictor>,
}

pub(crate) struct Predictor {
    k2y: Buffer,
    k2: Buffer,
    y_new: Buffer,
    yp_new: Buffer,
}

impl Scratch for Predictor {
    fn allocate(allocator: &Rc<dyn Allocator>, n: usize) -> Result<Self, Error> {
        Ok(Self {
            k2y: Buffer::zeroed(allocator, Pool::Data, n)?,
            k2: Buffer::zeroed(allocator, Pool::Data, n)?,
            y_new: Buffer::zeroed(allocator, Pool::Data, n)?,
            yp_new: Buffer::zeroed(allocator, Pool::Data, n)?,
        })
    }
}

impl HeunProblem {
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
            h_max,
            ..
        } = &mut self.core;
        let Some(Work {
            trajectory,
            scratch: p,
        }) = work.as_mut()
        else {
            return Ok(StepResult {
                tret: tout,
                status: Status::Success,
            });
        };
        let stop = options.stop_time;

        let mut h = if step_size > 0.0 {
            step_size
        } else {
            options.default_initial_step()
        };
        if !h.is_finite() {
            return Err(Error::InvalidStepSize(h));
        }
        h = h.min(*h_max);
        if 0.1 * h <= t.abs() * options.uround {
            return Err(Error::StepSizeTooSmall { t, h });
        }

        let mut t_new = t + h;
        if let Some(stop) = stop {
            if t + 1.01 * h >= stop && stop - t <= *h_max {
                h = stop - t;
                t_new = stop;
            }
        }

        let y = &trajectory.y_cur;
        let k1 = &trajectory.yp_cur;
        let n = y.len();

        // Predictor
        for i in 0..n {
            p.k2y[i] = y[i] + h * k1[i];
        }
        callbacks.rhs(t_new, &p.k2y, &mut p.k2)?;

        // Corrector
        for i in 0..n {
            p.y_new[i] = y[i] + 0.5 * h * (k1[i] + p.k2[i]);
        }
        callbacks.rhs(t_new, &p.y_new, &mut p.yp_new)?;
        stats.rhs_evals += 2;

        accept_step(
            callbacks,
            trajectory,
            t,
            t_new,
            &p.y_new,
            &p.yp_new,
            yret,
            ypret,
        )?;
        stats.accepted += 1;
        log::trace!("accepted t = {t_new}, h = {h}");

        Ok(StepResult {
            tret: t_new,
            status: stop_status(stop, t_new),
        })
    }
}

impl Problem for HeunProblem {
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
        self.core
            .init(t0, y0, yp0, is_reinit)
            .inspect_err(|err| self.core.report("heun::init", err))
    }

    fn solve(
        &mut self,
        step_size: Float,
        t: Float,
        tout: Float,
        yret: &mut [Float],
        ypret: &mut [Float],
    ) -> Result<StepResult, Error> {
        self.step(step_size, t, tout, yret, ypret)
            .inspect_err(|err| self.core.report("heun::solve", err))
    }

    fn interpolate(&self, tout: Float, yret: &mut [Float]) -> Result<Status, Error> {
        self.core
            .interpolate(tout, yret)
            .inspect_err(|err| self.core.report("heun::interpolate", err))
    }

    fn stats(&self) -> Stats {
        self.core.stats
    }
}
