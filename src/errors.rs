use std::fmt;

use thiserror::Error;

/// Boxed source error coming from the spline engine internals.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Which parametrization an out-of-range abscissa was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDomain {
    /// Arc length parametrization in meters.
    Meters,
    /// The underlying spline parametrization.
    Native,
}

impl fmt::Display for ParameterDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterDomain::Meters => write!(f, "meters"),
            ParameterDomain::Native => write!(f, "native"),
        }
    }
}

/// Error type for arc length curve operations.
///
/// Each failing operation also records the matching [`CurveStatus`] code on
/// the curve it was called on, so the most recent failure kind can be
/// queried after the fact.
#[derive(Debug, Error)]
pub enum CurveError {
    /// An abscissa fell outside the curve domain by more than the geometric
    /// tolerance of the curve.
    #[error("{domain} abscissa {value} is out of range [{min}, {max}]")]
    OutOfRange {
        domain: ParameterDomain,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A structurally invalid input, independent of the curve domain.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The spline engine failed to evaluate the curve.
    #[error("evaluation failed")]
    Evaluation {
        #[source]
        source: EngineError,
    },

    /// The requested quantity is undefined at the given abscissa.
    #[error("degenerate curve: {reason}")]
    DegenerateCurve { reason: String },

    /// An iterative search terminated without producing a solution.
    #[error("no solution found: {reason}")]
    NoSolution { reason: String },

    /// The curve could not be built from the given geometry.
    #[error("curve construction failed")]
    Construction {
        #[source]
        source: EngineError,
    },
}

impl CurveError {
    pub(crate) fn out_of_range<T: num_traits::ToPrimitive>(
        domain: ParameterDomain,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        let cast = |v: T| v.to_f64().unwrap_or(f64::NAN);
        CurveError::OutOfRange {
            domain,
            value: cast(value),
            min: cast(min),
            max: cast(max),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        CurveError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn evaluation(source: anyhow::Error) -> Self {
        CurveError::Evaluation {
            source: source.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        CurveError::DegenerateCurve {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_solution(reason: impl Into<String>) -> Self {
        CurveError::NoSolution {
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(source: anyhow::Error) -> Self {
        CurveError::Construction {
            source: source.into(),
        }
    }

    /// The status code matching this error kind.
    pub fn status(&self) -> CurveStatus {
        match self {
            CurveError::OutOfRange { .. } => CurveStatus::OutOfRange,
            CurveError::InvalidArgument { .. } => CurveStatus::InvalidArgument,
            CurveError::Evaluation { .. } => CurveStatus::Evaluation,
            CurveError::DegenerateCurve { .. } => CurveStatus::DegenerateCurve,
            CurveError::NoSolution { .. } => CurveStatus::NoSolution,
            CurveError::Construction { .. } => CurveStatus::Construction,
        }
    }
}

/// Diagnostic code left behind by the most recent operation on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveStatus {
    /// The most recent operation completed without error.
    #[default]
    Ok,
    OutOfRange,
    InvalidArgument,
    Evaluation,
    DegenerateCurve,
    NoSolution,
    Construction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display() {
        let e = CurveError::out_of_range(ParameterDomain::Meters, 12.5, 0.0, 10.0);
        assert_eq!(
            e.to_string(),
            "meters abscissa 12.5 is out of range [0, 10]"
        );
    }

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(
            CurveError::invalid_argument("count must be positive").status(),
            CurveStatus::InvalidArgument
        );
        assert_eq!(
            CurveError::no_solution("newton iteration diverged").status(),
            CurveStatus::NoSolution
        );
        assert_eq!(
            CurveError::degenerate("vanishing first derivative").status(),
            CurveStatus::DegenerateCurve
        );
    }
}
