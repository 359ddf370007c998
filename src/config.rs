//! JSON run files.
//!
//! A run file bundles everything needed for one evolution run: the seed, the
//! primitive set, the evolution parameters, the scorer and the data set.
//!
//! ```json
//! {
//!   "seed": 12345,
//!   "primitives": {
//!     "functions": [{ "name": "add", "arity": 2 }, { "name": "cos", "arity": 1 }],
//!     "constants": [12, 34, 0, 1],
//!     "n_variables": 3,
//!     "p_terminal": 0.1,
//!     "max_depth": 4
//!   },
//!   "evolution": { "n_trees": 10, "n_iterations": 10 },
//!   "scorer": { "kind": "inverse_squared_error" },
//!   "inputs": [[1, 2, 3], [4, 5, 6], [7, 8, 9]],
//!   "targets": [6, 14, 24]
//! }
//! ```

use std::fmt;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gp::{EvolutionConfig, Population, PrimitiveConfig, Scorer};

/// Everything needed for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// RNG seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Primitive set.
    pub primitives: PrimitiveConfig,
    /// Evolution parameters.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Fitness function.
    #[serde(default)]
    pub scorer: Scorer,
    /// Input samples, one row per sample.
    pub inputs: Vec<Vec<f64>>,
    /// Target per sample, for supervised runs.
    #[serde(default)]
    pub targets: Option<Vec<f64>>,
}

fn default_seed() -> u64 {
    42
}

impl RunConfig {
    /// Read and parse a run file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a run file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a run.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Input rows as a matrix.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::RaggedInputs`] if rows differ in length.
    pub fn input_matrix(&self) -> Result<Array2<f64>, LoadError> {
        let columns = self.inputs.first().map_or(0, Vec::len);
        if let Some((row, values)) = self
            .inputs
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns)
        {
            return Err(LoadError::RaggedInputs {
                row,
                expected: columns,
                found: values.len(),
            });
        }
        let flat: Vec<f64> = self.inputs.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.inputs.len(), columns), flat)
            .map_err(|e| LoadError::Shape(e.to_string()))
    }

    /// Targets as a vector, if present.
    #[must_use]
    pub fn target_vector(&self) -> Option<Array1<f64>> {
        self.targets.clone().map(Array1::from)
    }

    /// Seeded, uninitialized population over the configured primitives.
    ///
    /// # Errors
    ///
    /// Returns an error if the primitive set is invalid.
    pub fn population(&self) -> Result<Population, LoadError> {
        let primitives = self.primitives.build()?;
        Ok(Population::new(primitives, self.seed))
    }
}

/// Error loading a run file.
#[derive(Debug)]
pub enum LoadError {
    /// File I/O error.
    Io(std::io::Error),
    /// Malformed JSON.
    Json(serde_json::Error),
    /// Input rows of different lengths.
    RaggedInputs {
        /// First offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// Input matrix could not be assembled.
    Shape(String),
    /// Invalid primitive set.
    Config(ConfigError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "invalid run file: {e}"),
            Self::RaggedInputs {
                row,
                expected,
                found,
            } => write!(f, "input row {row} has {found} values, expected {expected}"),
            Self::Shape(e) => write!(f, "input shape error: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::{SelectionPolicy, SizeMetric};

    const RUN: &str = r#"{
        "seed": 12345,
        "primitives": {
            "functions": [{"name": "add", "arity": 2}, {"name": "cos", "arity": 1}],
            "constants": [12, 34, 0, 1],
            "n_variables": 3,
            "p_terminal": 0.1,
            "max_depth": 4
        },
        "evolution": {
            "n_trees": 6,
            "n_iterations": 3,
            "selection": "replace",
            "size_metric": "node_count"
        },
        "inputs": [[1, 2, 3], [4, 5, 6], [7, 8, 9]],
        "targets": [6, 14, 24]
    }"#;

    #[test]
    fn test_parse_run_file() {
        let run = RunConfig::from_json(RUN).unwrap();
        assert_eq!(run.seed, 12345);
        assert_eq!(run.evolution.n_trees, 6);
        assert_eq!(run.evolution.selection, SelectionPolicy::Replace);
        assert_eq!(run.evolution.size_metric, SizeMetric::NodeCount);
        assert!((run.evolution.p_crossover - 0.9).abs() < f64::EPSILON);
        assert_eq!(run.scorer, Scorer::default());
        assert_eq!(run.input_matrix().unwrap().dim(), (3, 3));
        assert_eq!(run.target_vector().unwrap().len(), 3);
        assert!(run.population().unwrap().is_empty());
    }

    #[test]
    fn test_ragged_inputs() {
        let mut run = RunConfig::from_json(RUN).unwrap();
        run.inputs[1].pop();
        assert!(matches!(
            run.input_matrix(),
            Err(LoadError::RaggedInputs {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_bad_arity_rejected() {
        let text = RUN.replace(r#""name": "cos", "arity": 1"#, r#""name": "cos", "arity": 2"#);
        let run = RunConfig::from_json(&text).unwrap();
        assert!(matches!(
            run.population(),
            Err(LoadError::Config(ConfigError::ArityMismatch { declared: 2, actual: 1, .. }))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(RunConfig::from_json("{"), Err(LoadError::Json(_))));
    }
}
