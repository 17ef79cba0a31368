//! Errors raised by the optimizer and the NMF driver

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A configuration scalar is outside its admissible range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// The objective returned NaN or infinity at a point the optimizer
    /// would otherwise have accepted.
    #[error("objective value is not finite ({value})")]
    NonFiniteValue { value: f64 },

    /// The gradient written by the objective has a NaN or infinite entry.
    #[error("gradient entry {index} is not finite")]
    NonFiniteGradient { index: usize },

    /// The step size was shrunk `max_backtracks` times without reaching
    /// sufficient decrease.
    #[error(
        "no sufficient decrease after {max_backtracks} step reductions (step size {alpha:e})"
    )]
    BacktrackLimit { max_backtracks: usize, alpha: f64 },

    /// Arrays handed to the same problem do not agree in shape.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

impl Error {
    /// True for the failures that come out of the numerics rather than
    /// from how the problem was set up.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Error::NonFiniteValue { .. }
                | Error::NonFiniteGradient { .. }
                | Error::BacktrackLimit { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = Error::InvalidParameter {
            name: "beta",
            value: 1.5,
            reason: "must lie in (0, 1)",
        };
        assert_eq!(
            e.to_string(),
            "invalid parameter `beta` = 1.5: must lie in (0, 1)"
        );
        assert!(!e.is_numerical());

        let e = Error::BacktrackLimit {
            max_backtracks: 3,
            alpha: 0.125,
        };
        assert!(e.to_string().contains("after 3 step reductions"));
        assert!(e.is_numerical());
    }
}
