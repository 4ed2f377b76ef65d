#![allow(dead_code)]

use std::{
    alloc::Layout,
    cell::{Cell, RefCell},
    rc::Rc,
};

use ivp_plugins::{Allocator, Logger, Pool, prelude::*};

/// Allocator that counts every request and can refuse the N-th one.
///
/// Panics on a release that does not match an outstanding grant.
#[derive(Default)]
pub struct CountingAllocator {
    pub requests: Cell<usize>,
    pub fail_at: Cell<Option<usize>>,
    pub outstanding: RefCell<Vec<(Pool, Layout)>>,
}

impl CountingAllocator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.borrow().len()
    }

    /// Refuses the `n`-th request from now on (1-based).
    pub fn fail_after(&self, n: usize) {
        self.fail_at.set(Some(self.requests.get() + n));
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, pool: Pool, layout: Layout) -> bool {
        let request = self.requests.get() + 1;
        self.requests.set(request);
        if self.fail_at.get() == Some(request) {
            return false;
        }
        self.outstanding.borrow_mut().push((pool, layout));
        true
    }

    fn release(&self, pool: Pool, layout: Layout) {
        let mut outstanding = self.outstanding.borrow_mut();
        let Some(index) = outstanding.iter().position(|&grant| grant == (pool, layout)) else {
            panic!("release of {} bytes to the {pool} pool was never granted", layout.size());
        };
        outstanding.swap_remove(index);
    }
}

/// Logger that keeps every record.
#[derive(Default)]
pub struct RecordingLogger {
    pub records: RefCell<Vec<(Status, String, String)>>,
}

impl Logger for RecordingLogger {
    fn log(&self, status: Status, origin: &str, message: &str) {
        self.records
            .borrow_mut()
            .push((status, origin.to_string(), message.to_string()));
    }
}

pub fn utilities(allocator: &Rc<CountingAllocator>) -> Utilities {
    Utilities::default().with_allocator(allocator.clone())
}

/// `y' = -rate * y`
pub fn decay(rate: Float) -> Callbacks {
    Callbacks::new().rhs(move |_t, y, yp| {
        for i in 0..y.len() {
            yp[i] = -rate * y[i];
        }
        Ok(())
    })
}

/// `y' = -y`, counting evaluations and failing evaluation number `fail_on`.
pub fn flaky_decay(calls: Rc<Cell<usize>>, fail_on: Rc<Cell<Option<usize>>>) -> Callbacks {
    Callbacks::new().rhs(move |_t, y, yp| {
        let call = calls.get() + 1;
        calls.set(call);
        if fail_on.get() == Some(call) {
            // Scribble over the output to make partial writes observable
            yp.fill(Float::NAN);
            return Err(CallbackError::new("model evaluation failed"));
        }
        for i in 0..y.len() {
            yp[i] = -y[i];
        }
        Ok(())
    })
}

/// Simple harmonic oscillator `y0' = y1, y1' = -y0`.
pub fn oscillator() -> Callbacks {
    Callbacks::new().rhs(|_t, y, yp| {
        yp[0] = y[1];
        yp[1] = -y[0];
        Ok(())
    })
}

/// Trajectory of accepted steps: `(tret, y)` per solve call.
pub type Trajectory = Vec<(Float, Vec<Float>)>;

/// Solves from `t0` until the stop time is reached.
pub fn run_to_stop(
    problem: &mut dyn Problem,
    t0: Float,
    tout: Float,
    step_size: Float,
) -> Trajectory {
    let n = problem.dimension();
    let mut y = vec![0.0; n];
    let mut yp = vec![0.0; n];
    let mut t = t0;
    let mut trajectory = Vec::new();
    for _ in 0..100_000 {
        let step = problem.solve(step_size, t, tout, &mut y, &mut yp).unwrap();
        assert!(step.tret > t, "no progress at t = {t}");
        trajectory.push((step.tret, y.clone()));
        t = step.tret;
        if step.status == Status::StopTimeReached {
            return trajectory;
        }
        assert_eq!(step.status, Status::Success);
    }
    panic!("stop time was never reached");
}
