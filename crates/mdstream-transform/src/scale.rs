//! Memory scaling of a transformation relative to its input size.

/// How a transformation's working memory grows with the bytes it reads.
///
/// Applied to the per-configuration input cost by the memory manager.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ScaleFunction {
    /// Memory equals the input size.
    #[default]
    Identity,
    /// `scale * x`.
    Linear {
        /// Multiplier.
        scale: f64,
    },
    /// `outer * (inner * x)^2`.
    Quadratic {
        /// Multiplier inside the square.
        inner: f64,
        /// Multiplier outside the square.
        outer: f64,
    },
    /// `sum_i coefficients[i] * x^i`.
    Polynomial {
        /// Coefficients, constant term first.
        coefficients: Vec<f64>,
    },
}

impl ScaleFunction {
    /// Evaluate at `x` bytes.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            ScaleFunction::Identity => x,
            ScaleFunction::Linear { scale } => scale * x,
            ScaleFunction::Quadratic { inner, outer } => {
                let y = inner * x;
                outer * y * y
            }
            ScaleFunction::Polynomial { coefficients } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * x + c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_evaluate() {
        assert_eq!(ScaleFunction::Identity.apply(24.0), 24.0);
        assert_eq!(ScaleFunction::Linear { scale: 2.5 }.apply(4.0), 10.0);
        assert_eq!(
            ScaleFunction::Quadratic {
                inner: 2.0,
                outer: 3.0
            }
            .apply(5.0),
            300.0
        );
        assert_eq!(
            ScaleFunction::Polynomial {
                coefficients: vec![1.0, 0.0, 2.0]
            }
            .apply(3.0),
            19.0
        );
    }

    #[test]
    fn empty_polynomial_is_zero() {
        assert_eq!(
            ScaleFunction::Polynomial {
                coefficients: vec![]
            }
            .apply(8.0),
            0.0
        );
    }
}
