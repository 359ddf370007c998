//! Scoring of tree outputs.
//!
//! A [`ScoreFunction`] maps one tree's per-sample predictions (and, for
//! supervised problems, the per-sample targets) to a single fitness value.
//! Higher is better. Numerical stability is the scorer's job: non-finite
//! predictions are passed through untouched.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fitness of a prediction vector.
pub trait ScoreFunction {
    /// Score `output`, optionally against `targets` of the same length.
    fn score(&self, output: &Array1<f64>, targets: Option<&Array1<f64>>) -> f64;
}

impl<F> ScoreFunction for F
where
    F: Fn(&Array1<f64>, Option<&Array1<f64>>) -> f64,
{
    fn score(&self, output: &Array1<f64>, targets: Option<&Array1<f64>>) -> f64 {
        self(output, targets)
    }
}

/// `Σ 1 / ((prediction - target)² + epsilon)`.
///
/// Without targets the predictions are compared against zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseSquaredError {
    /// Added to every squared error so exact hits stay finite.
    pub epsilon: f64,
}

impl Default for InverseSquaredError {
    fn default() -> Self {
        Self { epsilon: 1e-80 }
    }
}

impl ScoreFunction for InverseSquaredError {
    fn score(&self, output: &Array1<f64>, targets: Option<&Array1<f64>>) -> f64 {
        residuals(output, targets)
            .map(|r| 1.0 / (r * r + self.epsilon))
            .sum()
    }
}

/// Negated mean squared error, so that higher is better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeMeanSquaredError;

impl ScoreFunction for NegativeMeanSquaredError {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, output: &Array1<f64>, targets: Option<&Array1<f64>>) -> f64 {
        if output.is_empty() {
            return 0.0;
        }
        let total: f64 = residuals(output, targets).map(|r| r * r).sum();
        -total / output.len() as f64
    }
}

/// Scorer selectable from a run file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scorer {
    /// See [`InverseSquaredError`].
    InverseSquaredError {
        /// Stabilizing term.
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    /// See [`NegativeMeanSquaredError`].
    NegativeMse,
}

fn default_epsilon() -> f64 {
    InverseSquaredError::default().epsilon
}

impl Default for Scorer {
    fn default() -> Self {
        Self::InverseSquaredError {
            epsilon: default_epsilon(),
        }
    }
}

impl ScoreFunction for Scorer {
    fn score(&self, output: &Array1<f64>, targets: Option<&Array1<f64>>) -> f64 {
        match *self {
            Self::InverseSquaredError { epsilon } => {
                InverseSquaredError { epsilon }.score(output, targets)
            }
            Self::NegativeMse => NegativeMeanSquaredError.score(output, targets),
        }
    }
}

fn residuals<'a>(
    output: &'a Array1<f64>,
    targets: Option<&'a Array1<f64>>,
) -> impl Iterator<Item = f64> + 'a {
    output.iter().enumerate().map(move |(i, &x)| {
        let y = targets.and_then(|t| t.get(i)).copied().unwrap_or(0.0);
        x - y
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_inverse_squared_error_rewards_hits() {
        let scorer = InverseSquaredError { epsilon: 1e-6 };
        let targets = array![6.0, 14.0, 24.0];
        let exact = scorer.score(&array![6.0, 14.0, 24.0], Some(&targets));
        let off = scorer.score(&array![5.0, 14.0, 20.0], Some(&targets));
        assert!(exact > off);
        assert!((exact - 3e6).abs() < 1.0);
    }

    #[test]
    fn test_inverse_squared_error_passes_nan_through() {
        let scorer = InverseSquaredError::default();
        let score = scorer.score(&array![f64::NAN], Some(&array![1.0]));
        assert!(score.is_nan());
    }

    #[test]
    fn test_negative_mse() {
        let score = NegativeMeanSquaredError.score(&array![1.0, 3.0], Some(&array![1.0, 1.0]));
        assert!((score + 2.0).abs() < 1e-12);
        assert!(NegativeMeanSquaredError.score(&array![2.0], None) < 0.0);
    }

    #[test]
    fn test_closure_scorer() {
        let sum = |out: &Array1<f64>, _targets: Option<&Array1<f64>>| out.sum();
        assert!((sum.score(&array![1.0, 2.0], None) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_scorer_from_json() {
        let scorer: Scorer = serde_json::from_str(r#"{"kind": "negative_mse"}"#).unwrap();
        assert_eq!(scorer, Scorer::NegativeMse);
        let scorer: Scorer = serde_json::from_str(r#"{"kind": "inverse_squared_error"}"#).unwrap();
        assert_eq!(scorer, Scorer::default());
    }
}
