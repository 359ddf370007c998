//! Fitness-proportional selection and population statistics.
//!
//! Each tree is drawn with probability `|score| / Σ|score|`, with
//! replacement. Whether the draw actually replaces the working population is
//! governed by [`SelectionPolicy`].

// Selection uses intentional casts for statistics
#![allow(clippy::cast_precision_loss)]

use rand::Rng;
use rand::distributions::WeightedIndex;
use serde::{Deserialize, Serialize};

/// What to do with the resampled trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Draw the sample but keep the working population as it is.
    #[default]
    Discard,
    /// Overwrite the working population with the sample.
    Replace,
}

/// Normalized absolute scores.
///
/// Returns `None` when the total is zero or not finite, in which case no
/// meaningful proportions exist.
#[must_use]
pub fn selection_weights(scores: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = scores.iter().map(|s| s.abs()).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(scores.iter().map(|s| s.abs() / total).collect())
}

/// Draw `count` indices with replacement, weighted by [`selection_weights`].
///
/// Falls back to a uniform draw when the weights are degenerate.
#[must_use]
pub fn resample<R: Rng>(scores: &[f64], count: usize, rng: &mut R) -> Vec<usize> {
    if scores.is_empty() {
        return Vec::new();
    }
    match selection_weights(scores).and_then(|w| WeightedIndex::new(w).ok()) {
        Some(dist) => (0..count).map(|_| rng.sample(&dist)).collect(),
        None => (0..count).map(|_| rng.gen_range(0..scores.len())).collect(),
    }
}

/// Index of the highest score, first occurrence on ties.
///
/// NaN scores lose to any number; if every score is NaN the first index is
/// returned. `None` only for an empty slice.
#[must_use]
pub fn best_index(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    match best {
        Some((i, _)) => Some(i),
        None if scores.is_empty() => None,
        None => Some(0),
    }
}

/// Summary of one generation's scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitnessStats {
    /// Lowest score.
    pub min: f64,
    /// Highest score.
    pub max: f64,
    /// Mean score.
    pub mean: f64,
    /// Standard deviation.
    pub std: f64,
}

impl FitnessStats {
    /// Calculate statistics from fitness values.
    #[must_use]
    pub fn from_fitness(fitness: &[f64]) -> Self {
        if fitness.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std: 0.0,
            };
        }

        let sum: f64 = fitness.iter().sum();
        let mean = sum / fitness.len() as f64;
        let max = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let variance: f64 =
            fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / fitness.len() as f64;

        Self {
            min,
            max,
            mean,
            std: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_weights_use_absolute_values() {
        let weights = selection_weights(&[1.0, -3.0, 0.0]).unwrap();
        assert!((weights[0] - 0.25).abs() < 1e-12);
        assert!((weights[1] - 0.75).abs() < 1e-12);
        assert!(weights[2].abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_weights() {
        assert!(selection_weights(&[0.0, 0.0]).is_none());
        assert!(selection_weights(&[1.0, f64::INFINITY]).is_none());
        assert!(selection_weights(&[1.0, f64::NAN]).is_none());
    }

    #[test]
    fn test_resample_prefers_heavier() {
        let mut rng = SmallRng::seed_from_u64(42);
        let picks = resample(&[0.1, 0.0, 9.9], 1000, &mut rng);
        assert_eq!(picks.len(), 1000);
        assert!(!picks.contains(&1));
        let heavy = picks.iter().filter(|&&i| i == 2).count();
        assert!(heavy > 900);
    }

    #[test]
    fn test_resample_uniform_fallback() {
        let mut rng = SmallRng::seed_from_u64(42);
        let picks = resample(&[0.0, 0.0, 0.0], 300, &mut rng);
        for i in 0..3 {
            assert!(picks.contains(&i));
        }
        assert!(resample(&[], 5, &mut rng).is_empty());
    }

    #[test]
    fn test_best_index_first_max() {
        assert_eq!(best_index(&[1.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(best_index(&[f64::NAN, -1.0]), Some(1));
        assert_eq!(best_index(&[f64::NAN, f64::NAN]), Some(0));
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn test_fitness_stats() {
        let stats = FitnessStats::from_fitness(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 0.001);
        assert!((stats.max - 5.0).abs() < 0.001);
        assert!((stats.min - 1.0).abs() < 0.001);
    }
}
