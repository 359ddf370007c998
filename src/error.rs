//! Error types for tree construction and evaluation.

use std::fmt;

/// Invalid primitive set or evolution parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A function was declared with a different arity than its implementation takes.
    ArityMismatch {
        /// Function name.
        name: String,
        /// Arity given in the configuration.
        declared: usize,
        /// Arity of the implementation.
        actual: usize,
    },
    /// A function was declared with no parameters.
    ZeroArity(String),
    /// A function name is not in the builtin catalog.
    UnknownFunction(String),
    /// A leaf was required but there are no constants and no variables.
    EmptyTerminalPool,
    /// The maximum tree depth must be at least 1.
    InvalidMaxDepth(usize),
    /// A probability outside `[0, 1]`.
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The population must hold at least one tree.
    EmptyPopulation,
    /// Targets and inputs disagree on the number of samples.
    TargetLengthMismatch {
        /// Rows in the input matrix.
        rows: usize,
        /// Length of the target vector.
        targets: usize,
    },
    /// The input matrix has fewer columns than the declared variables.
    InputWidthMismatch {
        /// Variables the primitive set can reference.
        variables: usize,
        /// Columns in the input matrix.
        columns: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch {
                name,
                declared,
                actual,
            } => write!(
                f,
                "function `{name}` declared with arity {declared} but takes {actual} arguments"
            ),
            Self::ZeroArity(name) => write!(f, "function `{name}` has arity 0"),
            Self::UnknownFunction(name) => write!(f, "unknown function `{name}`"),
            Self::EmptyTerminalPool => write!(f, "no constants or variables to build a leaf from"),
            Self::InvalidMaxDepth(depth) => write!(f, "max depth must be positive, got {depth}"),
            Self::InvalidProbability { name, value } => {
                write!(f, "{name} must be within [0, 1], got {value}")
            }
            Self::EmptyPopulation => write!(f, "population size must be positive"),
            Self::TargetLengthMismatch { rows, targets } => {
                write!(f, "{targets} targets for {rows} input rows")
            }
            Self::InputWidthMismatch { variables, columns } => {
                write!(f, "{variables} variables declared but inputs have {columns} columns")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure while evaluating a tree against an input matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// A variable node refers to a column the input matrix does not have.
    VariableOutOfRange {
        /// Referenced column.
        index: usize,
        /// Columns available.
        columns: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariableOutOfRange { index, columns } => {
                write!(f, "variable x{index} out of range for input with {columns} columns")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;
