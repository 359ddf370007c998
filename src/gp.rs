//! Tree-based genetic programming.
//!
//! Expression trees over a configurable set of functions, constants and
//! input variables are evolved to maximize a user-supplied score.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Population (evolution loop)       │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │  Fitness scoring │ Tree builder     │
//! ├─────────────────────────────────────┤
//! │  Tree arena: evaluate, render,      │
//! │  set_size, locate, propagate        │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use grove::gp::{EvolutionConfig, InverseSquaredError, Population, PrimitiveSet, builtin};
//! use ndarray::array;
//!
//! let functions = vec![builtin("add").unwrap(), builtin("mul").unwrap()];
//! let primitives = PrimitiveSet::new(functions, vec![1.0, 2.0], 1, 0.1, 4)?;
//! let mut population = Population::new(primitives, 42);
//!
//! let x = array![[1.0], [2.0], [3.0]];
//! let y = array![3.0, 5.0, 7.0];
//! let config = EvolutionConfig::default();
//! population.evolve(&config, &InverseSquaredError::default(), x.view(), Some(&y))?;
//!
//! let best = population.best().unwrap();
//! println!("{best}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod crossover;
mod evolution;
mod fitness;
mod mutation;
mod node;
mod primitives;
mod selection;
mod tree;

pub use builder::TreeBuilder;
pub use crossover::{crossover_at, crossover_pair, crossover_population};
pub use evolution::{
    BestFit, EvolutionConfig, EvolutionError, EvolutionStats, GenerationStats, Population,
};
pub use fitness::{InverseSquaredError, NegativeMeanSquaredError, ScoreFunction, Scorer};
pub use mutation::{Mutation, mutate_at, mutate_population, mutate_tree};
pub use node::{Location, Node, NodeId, NodeKind, SizeMetric};
pub use primitives::{Function, FunctionSpec, Operator, PrimitiveConfig, PrimitiveSet, builtin};
pub use selection::{FitnessStats, SelectionPolicy, best_index, resample, selection_weights};
pub use tree::Tree;
