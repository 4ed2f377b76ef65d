//! Integration options supplied when a problem is created

use std::ops::Index;

use bon::Builder;

use crate::{Float, error::Error, interpolate::Interpolant, methods::norm::ErrorNorm};

/// Options for a problem instance.
///
/// Every host option can be left undefined; algorithms check before use.
///
/// ```ignore
/// let options = Options::builder()
///     .stop_time(10.0)
///     .tolerance(Tolerances::new(1e-6, 1e-8))
///     .max_step(0.5)
///     .build();
/// ```
#[derive(Builder, Clone, Debug)]
pub struct Options {
    /// End of the integration horizon.
    pub stop_time: Option<Float>,
    /// Relative and absolute tolerances.
    #[builder(into)]
    pub tolerance: Option<Tolerances>,
    /// Maximal step size. Defaults to the span from the initial time to the
    /// stop time, or unbounded without a stop time.
    pub max_step: Option<Float>,
    /// First trial step when the host passes no usable step size.
    /// Defaults to a thousandth of the stop time.
    pub initial_step: Option<Float>,
    /// Reduction of the local error estimate to a scalar.
    #[builder(default)]
    pub error_norm: ErrorNorm,
    /// Dense output used by `interpolate`.
    #[builder(default)]
    pub interpolant: Interpolant,
    /// Rejected trial steps tolerated within one solve call.
    #[builder(default = 100)]
    pub max_rejections: usize,
    /// The rounding unit of the working precision.
    #[builder(default = Float::EPSILON)]
    pub uround: Float,
}

impl Default for Options {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Options {
    /// Fallback first step when the stop time is not usable.
    pub const FALLBACK_INITIAL_STEP: Float = 1e-3;

    /// First trial step: `initial_step`, else a thousandth of the stop time.
    pub fn default_initial_step(&self) -> Float {
        self.initial_step
            .or_else(|| {
                self.stop_time
                    .map(|stop| stop.abs() / 1000.0)
                    .filter(|h| h.is_finite() && *h > 0.0)
            })
            .unwrap_or(Self::FALLBACK_INITIAL_STEP)
    }

    /// Step cap for an integration starting at `t0`.
    pub fn step_cap(&self, t0: Float) -> Float {
        match (self.max_step, self.stop_time) {
            (Some(hmax), _) => hmax,
            (None, Some(stop)) if stop != t0 => (stop - t0).abs(),
            _ => Float::INFINITY,
        }
    }

    /// Checks every defined option for a problem of `dimension` states.
    ///
    /// Out of range values are rejected, never clamped. `tolerance_required`
    /// is set by error-controlled algorithms.
    pub(crate) fn validate(&self, dimension: usize, tolerance_required: bool) -> Result<(), Error> {
        if let Some(stop) = self.stop_time {
            if !stop.is_finite() {
                return Err(Error::InvalidOption {
                    name: "stop_time",
                    value: stop,
                });
            }
        }
        for (name, value) in [
            ("max_step", self.max_step),
            ("initial_step", self.initial_step),
        ] {
            match value {
                Some(h) if !(h.is_finite() && h > 0.0) => {
                    return Err(Error::InvalidOption { name, value: h });
                }
                _ => {}
            }
        }
        if !(self.uround.is_finite() && self.uround >= 0.0) {
            return Err(Error::InvalidOption {
                name: "uround",
                value: self.uround,
            });
        }

        match &self.tolerance {
            Some(tol) => tol.check(dimension),
            None if tolerance_required && dimension > 0 => Err(Error::ToleranceUndefined),
            None => Ok(()),
        }
    }
}

/// Relative and absolute tolerance pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Tolerances {
    pub relative: Tolerance,
    pub absolute: Tolerance,
}

impl Tolerances {
    pub fn new(relative: impl Into<Tolerance>, absolute: impl Into<Tolerance>) -> Self {
        Self {
            relative: relative.into(),
            absolute: absolute.into(),
        }
    }

    fn check(&self, dimension: usize) -> Result<(), Error> {
        for (which, tol) in [("relative", &self.relative), ("absolute", &self.absolute)] {
            if !tol.covers(dimension) {
                return Err(Error::ToleranceTooShort {
                    which,
                    len: tol.len(),
                    dimension,
                });
            }
            if let Some((index, &value)) = tol
                .entries()
                .iter()
                .enumerate()
                .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
            {
                return Err(Error::InvalidTolerance {
                    which,
                    index,
                    value,
                });
            }
        }
        // A component with both tolerances zero can never pass the error test
        match (0..dimension).find(|&i| self.relative[i] + self.absolute[i] <= 0.0) {
            Some(index) => Err(Error::ZeroTolerance { index }),
            None => Ok(()),
        }
    }
}

/// Tolerance enum to allow scalar or vector tolerances
/// using [`Into`] trait for easy conversion from `Float`, `[Float; N]`, or `Vec<Float>`.
#[derive(Clone, Debug, PartialEq)]
pub enum Tolerance {
    Scalar(Float),
    Vector(Vec<Float>),
}

impl Tolerance {
    /// Number of explicit entries; a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            Tolerance::Scalar(_) => 1,
            Tolerance::Vector(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Tolerance::Vector(vs) if vs.is_empty())
    }

    /// The explicit entries.
    pub fn entries(&self) -> &[Float] {
        match self {
            Tolerance::Scalar(v) => std::slice::from_ref(v),
            Tolerance::Vector(vs) => vs,
        }
    }

    /// `true` if indices `0..dimension` are all defined.
    pub fn covers(&self, dimension: usize) -> bool {
        match self {
            Tolerance::Scalar(_) => true,
            Tolerance::Vector(vs) => vs.len() >= dimension,
        }
    }
}

impl From<Float> for Tolerance {
    fn from(val: Float) -> Self {
        Tolerance::Scalar(val)
    }
}

impl From<&[Float]> for Tolerance {
    fn from(val: &[Float]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<const N: usize> From<[Float; N]> for Tolerance {
    fn from(val: [Float; N]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl From<Vec<Float>> for Tolerance {
    fn from(val: Vec<Float>) -> Self {
        Tolerance::Vector(val)
    }
}

impl Index<usize> for Tolerance {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &vs[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let options = Options::default();
        assert!(options.stop_time.is_none());
        assert!(options.tolerance.is_none());
        assert_eq!(options.error_norm, ErrorNorm::Max);
        assert_eq!(options.interpolant, Interpolant::Hermite);
        assert_eq!(options.max_rejections, 100);
        assert_eq!(options.uround, Float::EPSILON);
        assert!(options.validate(3, false).is_ok());
    }

    #[test]
    fn initial_step_derives_from_stop_time() {
        let options = Options::builder().stop_time(2.0).build();
        assert_eq!(options.default_initial_step(), 0.002);

        let options = Options::builder().stop_time(2.0).initial_step(0.1).build();
        assert_eq!(options.default_initial_step(), 0.1);

        let options = Options::builder().stop_time(0.0).build();
        assert_eq!(options.default_initial_step(), Options::FALLBACK_INITIAL_STEP);
    }

    #[test]
    fn step_cap_prefers_max_step() {
        let options = Options::builder().stop_time(5.0).build();
        assert_eq!(options.step_cap(1.0), 4.0);

        let options = Options::builder().stop_time(5.0).max_step(0.25).build();
        assert_eq!(options.step_cap(1.0), 0.25);

        assert_eq!(Options::default().step_cap(0.0), Float::INFINITY);
    }

    #[test]
    fn short_tolerance_vectors_are_rejected() {
        let options = Options::builder()
            .tolerance(Tolerances::new(1e-6, vec![1e-8, 1e-8]))
            .build();
        assert!(options.validate(2, true).is_ok());
        assert!(matches!(
            options.validate(3, true),
            Err(Error::ToleranceTooShort {
                which: "absolute",
                len: 2,
                dimension: 3
            })
        ));
    }

    #[test]
    fn undefined_tolerance_only_matters_when_required() {
        let options = Options::default();
        assert!(matches!(
            options.validate(1, true),
            Err(Error::ToleranceUndefined)
        ));
        assert!(options.validate(0, true).is_ok());
        assert!(options.validate(4, false).is_ok());
    }

    #[test]
    fn negative_max_step_is_rejected_not_flipped() {
        let options = Options::builder().stop_time(5.0).max_step(-0.25).build();
        assert_eq!(options.step_cap(0.0), -0.25);
        assert!(matches!(
            options.validate(1, false),
            Err(Error::InvalidOption { name: "max_step", value }) if value == -0.25
        ));
    }

    #[test]
    fn tolerance_entries_must_be_finite_and_non_negative() {
        let options = Options::builder()
            .tolerance(Tolerances::new(vec![1e-6, Float::NAN], 1e-8))
            .build();
        assert!(matches!(
            options.validate(2, true),
            Err(Error::InvalidTolerance { which: "relative", index: 1, .. })
        ));

        // Both zero in one component
        let options = Options::builder()
            .tolerance(Tolerances::new(vec![1e-6, 0.0], vec![0.0, 0.0]))
            .build();
        assert!(matches!(
            options.validate(2, true),
            Err(Error::ZeroTolerance { index: 1 })
        ));

        // A pure absolute tolerance is fine
        let options = Options::builder()
            .tolerance(Tolerances::new(0.0, 1e-8))
            .build();
        assert!(options.validate(2, true).is_ok());
    }

    #[test]
    fn scalar_tolerance_indexes_every_component() {
        let tol = Tolerance::from(1e-4);
        assert_eq!(tol[0], 1e-4);
        assert_eq!(tol[17], 1e-4);
        assert!(tol.covers(100));
        assert_eq!(tol.entries(), &[1e-4]);
        assert!(!tol.is_empty());
    }

    #[test]
    fn empty_vector_tolerance_covers_only_dimension_zero() {
        let tol = Tolerance::from(Vec::<Float>::new());
        assert!(tol.is_empty());
        assert!(tol.covers(0));
        assert!(!tol.covers(1));
    }
}
