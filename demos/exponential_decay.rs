//! # Example: Exponential Decay
//!
//! Drive the RKF45 plugin the way a host engine does: look it up by name,
//! create a problem, then advance it step by step up to the stop time while
//! sampling the dense output on a fixed grid.
//!
//! Equations:
//! dy/dt = -y
//!
//! Initial condition: y(0) = 1.0
//!

use ivp_plugins::prelude::*;

fn main() {
    let registry = Registry::with_builtins();
    let Some(solver) = registry.create_solver("RKF45", Utilities::default()) else {
        eprintln!("rkf45 is not registered");
        return;
    };
    println!("{}", solver.properties());

    let callbacks = Callbacks::new().rhs(|_t, y, yp| {
        // Example: dy/dt = -y (exponential decay)
        for i in 0..y.len() {
            yp[i] = -y[i];
        }
        Ok(())
    });
    let options = Options::builder()
        .stop_time(5.0)
        .tolerance(Tolerances::new(1e-6, 1e-8))
        .build();

    let mut problem = match solver.create_problem(1, callbacks, options) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("Problem creation failed: {e} (status {})", e.status().code());
            return;
        }
    };

    let y0 = [1.0];
    if let Err(e) = problem.init(0.0, &y0, None, false) {
        eprintln!("Initialization failed: {e}");
        return;
    }

    let mut t = 0.0;
    let mut y = [0.0];
    let mut yp = [0.0];
    let mut sample = 0.0;
    let mut yi = [0.0];
    loop {
        let step = match problem.solve(0.0, t, 5.0, &mut y, &mut yp) {
            Ok(step) => step,
            Err(e) => {
                eprintln!("Integration failed at t = {t}: {e} (status {})", e.status().code());
                return;
            }
        };

        // Print sampled values inside the step just taken
        while sample <= step.tret {
            if problem.interpolate(sample, &mut yi).is_ok() {
                println!("t = {:.4}, y = {:.8}, exact = {:.8}", sample, yi[0], (-sample).exp());
            }
            sample += 0.5;
        }

        t = step.tret;
        if step.status == Status::StopTimeReached {
            break;
        }
    }

    let stats = problem.stats();
    println!("Final state: t = {:.5}, y = {:?}", t, y);
    println!("Number of function evaluations: {}", stats.rhs_evals);
    println!("Number of steps taken: {}", stats.steps());
    println!("Number of accepted steps: {}", stats.accepted);
    println!("Number of rejected steps: {}", stats.rejected);
}
