// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Grove: tree-based genetic programming for symbolic regression.
//!
//! This crate evolves populations of expression trees with:
//! - Arena-backed trees addressed by preorder index
//! - Subtree crossover and mutation with incremental size bookkeeping
//! - Fitness-proportional resampling
//! - Seeded, reproducible runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        CLI / run files              │
//! ├─────────────────────────────────────┤
//! │        Evolution loop               │
//! ├─────────────────────────────────────┤
//! │    Expression trees (ndarray)       │
//! └─────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod gp;
pub mod problem;

pub use config::{LoadError, RunConfig};
pub use error::{ConfigError, ConfigResult, EvalError};

// Re-export key types at crate root for convenience
pub use gp::{EvolutionConfig, Population, PrimitiveSet, Tree};
