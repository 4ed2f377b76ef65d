//! Dense output over the last accepted step

use crate::Float;

/// Trait for interpolating the solution within a step.
pub trait Interpolate {
    /// Interpolate the solution at the given abscissa `xi`.
    fn interpolate(&self, xi: Float, yi: &mut [Float]);
}

/// Dense output selection for `interpolate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolant {
    /// Straight line between the step endpoints.
    Linear,
    /// Cubic Hermite through the endpoint states and derivatives.
    #[default]
    Hermite,
}

/// Linear interpolation between `(x0, y0)` and `(x1, y1)`.
pub struct Linear<'a> {
    x0: Float,
    x1: Float,
    y0: &'a [Float],
    y1: &'a [Float],
}

impl<'a> Linear<'a> {
    pub fn new(x0: Float, x1: Float, y0: &'a [Float], y1: &'a [Float]) -> Self {
        Self { x0, x1, y0, y1 }
    }
}

impl Interpolate for Linear<'_> {
    fn interpolate(&self, xi: Float, yi: &mut [Float]) {
        let t = (xi - self.x0) / (self.x1 - self.x0);
        for i in 0..self.y0.len() {
            yi[i] = self.y0[i] + (self.y1[i] - self.y0[i]) * t;
        }
    }
}

/// Cubic Hermite interpolation on `[x0, x0 + h]`.
pub struct CubicHermite<'a> {
    x0: Float,
    h: Float,
    y0: &'a [Float],
    y1: &'a [Float],
    dy0: &'a [Float],
    dy1: &'a [Float],
}

impl<'a> CubicHermite<'a> {
    pub fn new(
        x0: Float,
        x1: Float,
        y0: &'a [Float],
        y1: &'a [Float],
        dy0: &'a [Float],
        dy1: &'a [Float],
    ) -> Self {
        Self {
            x0,
            h: x1 - x0,
            y0,
            y1,
            dy0,
            dy1,
        }
    }
}

impl Interpolate for CubicHermite<'_> {
    fn interpolate(&self, xi: Float, yi: &mut [Float]) {
        let t = (xi - self.x0) / self.h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        for i in 0..self.y0.len() {
            yi[i] = h00 * self.y0[i]
                + h10 * self.h * self.dy0[i]
                + h01 * self.y1[i]
                + h11 * self.h * self.dy1[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn linear_hits_the_midpoint() {
        let interp = Linear::new(1.0, 3.0, &[0.0, 10.0], &[2.0, 20.0]);
        let mut yi = [0.0; 2];
        interp.interpolate(2.0, &mut yi);
        assert_relative_eq!(yi[0], 1.0);
        assert_relative_eq!(yi[1], 15.0);
    }

    #[test]
    fn hermite_reproduces_cubics() {
        // y = x^3 on [0, 2]
        let interp = CubicHermite::new(0.0, 2.0, &[0.0], &[8.0], &[0.0], &[12.0]);
        let mut yi = [0.0];
        for &x in &[0.25, 0.5, 1.0, 1.7] {
            interp.interpolate(x, &mut yi);
            assert_relative_eq!(yi[0], x * x * x, epsilon = 1e-12);
        }
    }

    #[test]
    fn hermite_is_exact_at_the_right_endpoint() {
        let x0 = 0.1;
        let x1 = 0.1 + 0.7;
        let interp = CubicHermite::new(x0, x1, &[1.0], &[0.3], &[-2.0], &[-0.4]);
        let mut yi = [0.0];
        interp.interpolate(x1, &mut yi);
        assert_eq!(yi[0], 0.3);
    }
}
