use std::{cell::Cell, rc::Rc};

use ivp_plugins::prelude::*;

mod common;
use common::{RecordingLogger, decay, flaky_decay};

fn options() -> Options {
    Options::builder()
        .stop_time(2.0)
        .tolerance(Tolerances::new(1e-6, 1e-8))
        .build()
}

#[test]
fn failing_stage_leaves_the_step_uncommitted() {
    let solver = Rkf45::create(Utilities::default()).unwrap();

    let calls = Rc::new(Cell::new(0));
    let fail_on = Rc::new(Cell::new(None));
    let mut flaky = solver
        .create_problem(1, flaky_decay(calls.clone(), fail_on.clone()), options())
        .unwrap();
    let mut reference = solver.create_problem(1, decay(1.0), options()).unwrap();

    flaky.init(0.0, &[1.0], None, false).unwrap();
    reference.init(0.0, &[1.0], None, false).unwrap();

    let (mut y, mut yp) = ([0.0], [0.0]);
    let (mut y_ref, mut yp_ref) = ([0.0], [0.0]);
    let mut t = 0.0;
    for _ in 0..3 {
        let step = flaky.solve(0.0, t, 2.0, &mut y, &mut yp).unwrap();
        let step_ref = reference.solve(0.0, t, 2.0, &mut y_ref, &mut yp_ref).unwrap();
        assert_eq!(step, step_ref);
        t = step.tret;
    }
    let (y_good, yp_good) = (y, yp);
    let stats = flaky.stats();

    // Fail the third stage of the next trial step
    fail_on.set(Some(calls.get() + 2));
    let err = flaky.solve(0.0, t, 2.0, &mut y, &mut yp).unwrap_err();
    let Error::Rhs { t: t_fail, source } = &err else {
        panic!("unexpected error {err}");
    };
    assert!(*t_fail > t);
    assert_eq!(source.message(), "model evaluation failed");
    assert_eq!(err.status(), Status::RhsFailure);
    assert_eq!((y, yp), (y_good, yp_good));
    assert_eq!(flaky.stats().accepted, stats.accepted);

    let mut yi = [0.0];
    flaky.interpolate(t, &mut yi).unwrap();
    assert_eq!(yi, y_good);

    // Resuming takes exactly the step the failure interrupted
    fail_on.set(None);
    let step = flaky.solve(0.0, t, 2.0, &mut y, &mut yp).unwrap();
    let step_ref = reference.solve(0.0, t, 2.0, &mut y_ref, &mut yp_ref).unwrap();
    assert_eq!(step, step_ref);
    assert_eq!(y, y_ref);
    assert_eq!(yp, yp_ref);
}

#[test]
fn failing_initial_derivative_aborts_init() {
    let solver = Rkf45::create(Utilities::default()).unwrap();
    let calls = Rc::new(Cell::new(0));
    let fail_on = Rc::new(Cell::new(Some(1)));
    let mut problem = solver
        .create_problem(1, flaky_decay(calls, fail_on), options())
        .unwrap();

    let err = problem.init(0.0, &[1.0], None, false).unwrap_err();
    assert_eq!(err.status(), Status::RhsFailure);
    assert!(matches!(
        problem.solve(0.0, 0.0, 2.0, &mut [0.0], &mut [0.0]),
        Err(Error::NotInitialized)
    ));
}

#[test]
fn step_finished_sees_every_accepted_step_and_can_veto_it() {
    let solver = Heun::create(Utilities::default()).unwrap();
    let seen = Rc::new(Cell::new(0));
    let counter = seen.clone();
    let callbacks = decay(1.0).step_finished(move |t, y| {
        counter.set(counter.get() + 1);
        if t > 0.25 {
            return Err(CallbackError::new(format!("vetoed y = {}", y[0])));
        }
        Ok(())
    });
    let mut problem = solver.create_problem(1, callbacks, options()).unwrap();
    problem.init(0.0, &[1.0], None, false).unwrap();

    let (mut y, mut yp) = ([0.0], [0.0]);
    let mut t = 0.0;
    for _ in 0..2 {
        t = problem.solve(0.125, t, 2.0, &mut y, &mut yp).unwrap().tret;
    }
    assert_eq!(seen.get(), 2);
    let y_good = y;

    let err = problem.solve(0.125, t, 2.0, &mut y, &mut yp).unwrap_err();
    assert!(matches!(err, Error::StepFinished { .. }));
    assert_eq!(err.status(), Status::Failure);
    assert_eq!(y, y_good);
    assert_eq!(seen.get(), 3);
    assert_eq!(problem.stats().accepted, 2);
}

#[test]
fn failures_reach_the_host_logger() {
    let logger = Rc::new(RecordingLogger::default());
    let utilities = Utilities::default().with_logger(logger.clone());
    let solver = Rkf45::create(utilities).unwrap();

    let calls = Rc::new(Cell::new(0));
    let fail_on = Rc::new(Cell::new(None));
    let mut problem = solver
        .create_problem(1, flaky_decay(calls.clone(), fail_on.clone()), options())
        .unwrap();
    problem.init(0.0, &[1.0], None, false).unwrap();
    assert!(logger.records.borrow().is_empty());

    fail_on.set(Some(calls.get() + 1));
    let _ = problem.solve(0.0, 0.0, 2.0, &mut [0.0], &mut [0.0]);

    let records = logger.records.borrow();
    assert_eq!(records.len(), 1);
    let (status, origin, message) = &records[0];
    assert_eq!(*status, Status::RhsFailure);
    assert_eq!(origin, "rkf45::solve");
    assert!(message.contains("model evaluation failed"), "{message}");
}

#[test]
fn degenerate_right_hand_side_exhausts_the_rejections() {
    let solver = Rkf45::create(Utilities::default()).unwrap();
    let callbacks = Callbacks::new().rhs(|_t, _y, yp| {
        yp[0] = Float::NAN;
        Ok(())
    });
    let options = Options::builder()
        .stop_time(2.0)
        .tolerance(Tolerances::new(1e-6, 1e-8))
        .max_rejections(5)
        .build();
    let mut problem = solver.create_problem(1, callbacks, options).unwrap();
    problem.init(0.0, &[1.0], None, false).unwrap();

    let (mut y, mut yp) = ([7.0], [7.0]);
    let err = problem.solve(0.0, 0.0, 2.0, &mut y, &mut yp).unwrap_err();
    assert!(matches!(err, Error::TooManyRejections { rejections: 6, .. }));
    assert_eq!(err.status(), Status::Failure);
    assert_eq!((y, yp), ([7.0], [7.0]));
    assert_eq!(problem.stats().rejected, 6);
}

#[test]
fn step_size_below_the_rounding_unit_fails() {
    let options = Options::builder()
        .stop_time(2e10)
        .tolerance(Tolerances::new(1e-6, 1e-8))
        .max_step(1e-8)
        .build();

    let rkf45 = Rkf45::create(Utilities::default()).unwrap();
    let heun = Heun::create(Utilities::default()).unwrap();
    for solver in [rkf45, heun] {
        let mut problem = solver
            .create_problem(1, decay(1.0), options.clone())
            .unwrap();
        problem.init(1e10, &[1.0], None, false).unwrap();

        // t + h rounds back onto t
        let (mut y, mut yp) = ([7.0], [7.0]);
        let err = problem.solve(1e-8, 1e10, 2e10, &mut y, &mut yp).unwrap_err();
        assert!(matches!(err, Error::StepSizeTooSmall { h, .. } if h == 1e-8), "{err}");
        assert_eq!(err.status(), Status::Failure);
        assert_eq!((y, yp), ([7.0], [7.0]));
        assert_eq!(problem.stats().accepted, 0);
        assert_eq!(problem.stats().rhs_evals, 1);

        let mut yi = [0.0];
        problem.interpolate(1e10, &mut yi).unwrap();
        assert_eq!(yi, [1.0]);
    }
}
