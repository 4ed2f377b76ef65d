// Numerical methods

mod common;

pub mod heun;
pub mod norm;
pub mod rkf45;

pub use heun::{Heun, HeunProblem};
pub use norm::ErrorNorm;
pub use rkf45::{Rkf45, Rkf45Problem};
