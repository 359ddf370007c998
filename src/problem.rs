//! Reference regression problem.
//!
//! Three input variables, three samples and a small set of custom
//! functions. Small enough to run in milliseconds, used by `grove demo`
//! and the integration tests.

use ndarray::{Array1, Array2, array};

use crate::error::ConfigResult;
use crate::gp::{EvolutionConfig, Function, InverseSquaredError, PrimitiveSet, builtin};

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 12345;

/// `f(a,b,c) = a*b - c`, `g(a,b) = (a+b) + (a-b)`,
/// `h(a,b,c,d) = (a+b) - (c-d)`, `cos`, `sin`; constants 12, 34, 0, 1;
/// three variables; terminal probability 0.1; depth budget 4.
///
/// # Errors
///
/// Never in practice; the parameters are fixed and valid.
pub fn primitives() -> ConfigResult<PrimitiveSet> {
    let functions = vec![
        Function::ternary("f", |a, b, c| a * b - c),
        Function::binary("g", |a, b| (a + b) + (a - b)),
        Function::quaternary("h", |a, b, c, d| (a + b) - (c - d)),
    ]
    .into_iter()
    .chain(["cos", "sin"].into_iter().filter_map(builtin))
    .collect();
    PrimitiveSet::new(functions, vec![12.0, 34.0, 0.0, 1.0], 3, 0.1, 4)
}

/// Inputs `[[1,2,3],[4,5,6],[7,8,9]]` and targets `[6,14,24]`.
#[must_use]
pub fn data() -> (Array2<f64>, Array1<f64>) {
    (
        array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
        array![6.0, 14.0, 24.0],
    )
}

/// Ten trees, ten generations, crossover 0.9, mutation 0.1.
#[must_use]
pub fn config() -> EvolutionConfig {
    EvolutionConfig::default()
}

/// `Σ 1 / ((output - target)² + 1e-80)`.
#[must_use]
pub fn scorer() -> InverseSquaredError {
    InverseSquaredError::default()
}
