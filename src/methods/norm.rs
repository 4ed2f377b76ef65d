//! Reduction of the local error estimate to a scalar

use crate::{Float, options::Tolerances};

/// How the per-component local error estimate `D` is reduced.
///
/// All variants produce a normalized error `err` where `err <= 1` means the
/// step meets the tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorNorm {
    /// Largest tolerance-scaled component,
    /// `max |D_i| / (atol_i + rtol_i * max(|y_i|, |y_new_i|))`.
    #[default]
    Max,
    /// Root mean square of the tolerance-scaled components.
    Rms,
    /// Smallest `|D_i| / h` against the first absolute tolerance entry.
    ///
    /// Reproduces the controller of the first RKF45 plugin release: the step
    /// is driven by the least erroneous component and accepted only when
    /// strictly below tolerance.
    LegacyMinComponent,
}

impl ErrorNorm {
    /// Normalized error of the step `y -> y_new` of size `h` with local error `d`.
    pub fn measure(
        self,
        d: &[Float],
        y: &[Float],
        y_new: &[Float],
        h: Float,
        tol: &Tolerances,
    ) -> Float {
        if d.iter().chain(y_new).any(|v| !v.is_finite()) {
            return Float::INFINITY;
        }
        match self {
            ErrorNorm::Max => (0..d.len())
                .map(|i| scaled(d[i], y[i], y_new[i], tol, i))
                .fold(0.0, Float::max),
            ErrorNorm::Rms => {
                if d.is_empty() {
                    return 0.0;
                }
                let sum: Float = (0..d.len())
                    .map(|i| scaled(d[i], y[i], y_new[i], tol, i).powi(2))
                    .sum();
                (sum / d.len() as Float).sqrt()
            }
            ErrorNorm::LegacyMinComponent => {
                let smallest = d.iter().map(|di| di.abs()).fold(Float::INFINITY, Float::min);
                if !smallest.is_finite() {
                    return 0.0;
                }
                let r = smallest / h;
                let atol = tol.absolute[0];
                if r == 0.0 { 0.0 } else { r / atol }
            }
        }
    }

    /// Acceptance test for a normalized error produced by [`Self::measure`].
    pub fn accepts(self, err: Float) -> bool {
        match self {
            ErrorNorm::LegacyMinComponent => err < 1.0,
            ErrorNorm::Max | ErrorNorm::Rms => err <= 1.0,
        }
    }
}

fn scaled(d: Float, y: Float, y_new: Float, tol: &Tolerances, i: usize) -> Float {
    let sk = tol.absolute[i] + tol.relative[i] * y.abs().max(y_new.abs());
    if sk > 0.0 {
        d.abs() / sk
    } else if d == 0.0 {
        0.0
    } else {
        Float::INFINITY
    }
}
