//! Function and terminal primitives that trees are built from.
//!
//! A [`PrimitiveSet`] is the immutable configuration shared by every tree in
//! a population: the function set, the constant pool, the number of input
//! variables, the probability of stopping early with a terminal, and the
//! maximum tree depth.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Elementwise operator implementation: one argument per child, one result.
pub type Operator = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// A named function with a fixed arity.
#[derive(Clone)]
pub struct Function {
    name: String,
    arity: usize,
    op: Arc<Operator>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Function {
    /// Create a function taking `arity` arguments as a slice.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroArity`] if `arity` is 0.
    pub fn new<F>(name: impl Into<String>, arity: usize, op: F) -> ConfigResult<Self>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        let name = name.into();
        if arity == 0 {
            return Err(ConfigError::ZeroArity(name));
        }
        Ok(Self {
            name,
            arity,
            op: Arc::new(op),
        })
    }

    /// One-argument function.
    #[must_use]
    pub fn unary(name: impl Into<String>, f: fn(f64) -> f64) -> Self {
        Self {
            name: name.into(),
            arity: 1,
            op: Arc::new(move |args: &[f64]| f(args[0])),
        }
    }

    /// Two-argument function.
    #[must_use]
    pub fn binary(name: impl Into<String>, f: fn(f64, f64) -> f64) -> Self {
        Self {
            name: name.into(),
            arity: 2,
            op: Arc::new(move |args: &[f64]| f(args[0], args[1])),
        }
    }

    /// Three-argument function.
    #[must_use]
    pub fn ternary(name: impl Into<String>, f: fn(f64, f64, f64) -> f64) -> Self {
        Self {
            name: name.into(),
            arity: 3,
            op: Arc::new(move |args: &[f64]| f(args[0], args[1], args[2])),
        }
    }

    /// Four-argument function.
    #[must_use]
    pub fn quaternary(name: impl Into<String>, f: fn(f64, f64, f64, f64) -> f64) -> Self {
        Self {
            name: name.into(),
            arity: 4,
            op: Arc::new(move |args: &[f64]| f(args[0], args[1], args[2], args[3])),
        }
    }

    /// Resolve a declared function against the builtin catalog.
    ///
    /// # Errors
    ///
    /// Fails if the name is unknown, the declared arity is 0, or the declared
    /// arity differs from the builtin's.
    pub fn from_spec(spec: &FunctionSpec) -> ConfigResult<Self> {
        if spec.arity == 0 {
            return Err(ConfigError::ZeroArity(spec.name.clone()));
        }
        let function =
            builtin(&spec.name).ok_or_else(|| ConfigError::UnknownFunction(spec.name.clone()))?;
        if function.arity != spec.arity {
            return Err(ConfigError::ArityMismatch {
                name: spec.name.clone(),
                declared: spec.arity,
                actual: function.arity,
            });
        }
        Ok(function)
    }

    /// Function name, used when rendering.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of children a node of this function takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Apply to one sample's arguments.
    #[must_use]
    pub fn apply(&self, args: &[f64]) -> f64 {
        debug_assert_eq!(args.len(), self.arity);
        (self.op)(args)
    }
}

/// Look up a function in the builtin catalog.
///
/// Division is protected: a zero denominator yields 0.
#[must_use]
pub fn builtin(name: &str) -> Option<Function> {
    let function = match name {
        "add" => Function::binary("add", |a, b| a + b),
        "sub" => Function::binary("sub", |a, b| a - b),
        "mul" => Function::binary("mul", |a, b| a * b),
        "div" => Function::binary("div", |a, b| if b == 0.0 { 0.0 } else { a / b }),
        "min" => Function::binary("min", f64::min),
        "max" => Function::binary("max", f64::max),
        "neg" => Function::unary("neg", |a| -a),
        "abs" => Function::unary("abs", f64::abs),
        "square" => Function::unary("square", |a| a * a),
        "sin" => Function::unary("sin", f64::sin),
        "cos" => Function::unary("cos", f64::cos),
        "exp" => Function::unary("exp", f64::exp),
        _ => return None,
    };
    Some(function)
}

/// A function named in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Builtin function name.
    pub name: String,
    /// Declared arity, checked against the builtin.
    pub arity: usize,
}

/// Serializable form of a [`PrimitiveSet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveConfig {
    /// Function set.
    pub functions: Vec<FunctionSpec>,
    /// Constant pool.
    pub constants: Vec<f64>,
    /// Number of input variables.
    pub n_variables: usize,
    /// Probability of producing a terminal before the depth budget runs out.
    pub p_terminal: f64,
    /// Maximum tree depth, in levels.
    pub max_depth: usize,
}

impl Default for PrimitiveConfig {
    fn default() -> Self {
        let functions = ["add", "sub", "mul", "sin", "cos"]
            .into_iter()
            .map(|name| FunctionSpec {
                name: name.to_string(),
                arity: if matches!(name, "sin" | "cos") { 1 } else { 2 },
            })
            .collect();
        Self {
            functions,
            constants: vec![0.0, 1.0],
            n_variables: 1,
            p_terminal: 0.1,
            max_depth: 4,
        }
    }
}

impl PrimitiveConfig {
    /// Resolve the declared functions and validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn build(&self) -> ConfigResult<PrimitiveSet> {
        let functions = self
            .functions
            .iter()
            .map(Function::from_spec)
            .collect::<ConfigResult<Vec<_>>>()?;
        PrimitiveSet::new(
            functions,
            self.constants.clone(),
            self.n_variables,
            self.p_terminal,
            self.max_depth,
        )
    }
}

/// Validated set of primitives shared by a population.
#[derive(Debug, Clone)]
pub struct PrimitiveSet {
    functions: Vec<Arc<Function>>,
    constants: Vec<f64>,
    n_variables: usize,
    p_terminal: f64,
    max_depth: usize,
}

impl PrimitiveSet {
    /// Build a primitive set.
    ///
    /// # Errors
    ///
    /// Fails if `p_terminal` is outside `[0, 1]` or `max_depth` is 0.
    pub fn new(
        functions: Vec<Function>,
        constants: Vec<f64>,
        n_variables: usize,
        p_terminal: f64,
        max_depth: usize,
    ) -> ConfigResult<Self> {
        check_probability("p_terminal", p_terminal)?;
        if max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(max_depth));
        }
        Ok(Self {
            functions: functions.into_iter().map(Arc::new).collect(),
            constants,
            n_variables,
            p_terminal,
            max_depth,
        })
    }

    /// Function set.
    #[must_use]
    pub fn functions(&self) -> &[Arc<Function>] {
        &self.functions
    }

    /// Constant pool.
    #[must_use]
    pub fn constants(&self) -> &[f64] {
        &self.constants
    }

    /// Number of input variables.
    #[must_use]
    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Constants plus variables.
    #[must_use]
    pub fn n_terminals(&self) -> usize {
        self.constants.len() + self.n_variables
    }

    /// Probability of an early terminal.
    #[must_use]
    pub fn p_terminal(&self) -> f64 {
        self.p_terminal
    }

    /// Maximum tree depth, in levels.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Reject probabilities outside `[0, 1]`, NaN included.
pub(crate) fn check_probability(name: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let add = builtin("add").unwrap();
        assert_eq!(add.arity(), 2);
        assert!((add.apply(&[2.0, 3.0]) - 5.0).abs() < f64::EPSILON);
        assert!(builtin("nope").is_none());
    }

    #[test]
    fn test_protected_division() {
        let div = builtin("div").unwrap();
        assert!(div.apply(&[1.0, 0.0]).abs() < f64::EPSILON);
        assert!((div.apply(&[6.0, 3.0]) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spec_arity_mismatch() {
        let spec = FunctionSpec {
            name: "sin".into(),
            arity: 2,
        };
        assert_eq!(
            Function::from_spec(&spec).unwrap_err(),
            ConfigError::ArityMismatch {
                name: "sin".into(),
                declared: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_spec_unknown_and_zero_arity() {
        let unknown = FunctionSpec {
            name: "tanh".into(),
            arity: 1,
        };
        assert_eq!(
            Function::from_spec(&unknown).unwrap_err(),
            ConfigError::UnknownFunction("tanh".into())
        );
        assert_eq!(
            Function::new("k", 0, |_| 1.0).unwrap_err(),
            ConfigError::ZeroArity("k".into())
        );
    }

    #[test]
    fn test_primitive_set_validation() {
        assert!(matches!(
            PrimitiveSet::new(Vec::new(), vec![1.0], 1, 1.5, 3),
            Err(ConfigError::InvalidProbability { name: "p_terminal", .. })
        ));
        assert!(matches!(
            PrimitiveSet::new(Vec::new(), vec![1.0], 1, f64::NAN, 3),
            Err(ConfigError::InvalidProbability { .. })
        ));
        assert_eq!(
            PrimitiveSet::new(Vec::new(), vec![1.0], 1, 0.5, 0).unwrap_err(),
            ConfigError::InvalidMaxDepth(0)
        );
    }

    #[test]
    fn test_default_config_builds() {
        let set = PrimitiveConfig::default().build().unwrap();
        assert_eq!(set.functions().len(), 5);
        assert_eq!(set.n_terminals(), 3);
    }
}
