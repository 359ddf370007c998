//! Population controller and generational loop.
//!
//! A [`Population`] owns its trees, their latest scores and the random
//! number generator. Each generation evaluates every tree, scores it,
//! resamples by fitness, crosses consecutive pairs and mutates trees
//! individually. Tree slots are stable across generations.

// Evolution uses print_stderr for progress output
#![allow(clippy::print_stderr)]

use std::fmt;
use std::time::Instant;

use ndarray::{Array1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, EvalError};
use crate::gp::builder::TreeBuilder;
use crate::gp::crossover::crossover_population;
use crate::gp::fitness::ScoreFunction;
use crate::gp::mutation::mutate_population;
use crate::gp::node::SizeMetric;
use crate::gp::primitives::{PrimitiveSet, check_probability};
use crate::gp::selection::{FitnessStats, SelectionPolicy, best_index, resample};
use crate::gp::tree::Tree;

/// Configuration for the evolution process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Population size.
    pub n_trees: usize,
    /// Number of generations to run.
    pub n_iterations: usize,
    /// Probability that a pair of trees exchanges subtrees.
    pub p_crossover: f64,
    /// Probability that a tree has a subtree regrown.
    pub p_mutation: f64,
    /// What happens to the fitness-weighted resample.
    pub selection: SelectionPolicy,
    /// How cached node sizes are computed for addressing.
    pub size_metric: SizeMetric,
    /// Whether to print progress to stderr.
    pub verbose: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            n_trees: 10,
            n_iterations: 10,
            p_crossover: 0.9,
            p_mutation: 0.1,
            selection: SelectionPolicy::Discard,
            size_metric: SizeMetric::Height,
            verbose: false,
        }
    }
}

impl EvolutionConfig {
    /// Check population size and probabilities.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.n_trees == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        check_probability("p_crossover", self.p_crossover)?;
        check_probability("p_mutation", self.p_mutation)
    }
}

/// Statistics for a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Generation number, from 0.
    pub generation: usize,
    /// Lowest fitness.
    pub min_fitness: f64,
    /// Highest fitness.
    pub max_fitness: f64,
    /// Mean fitness.
    pub mean_fitness: f64,
    /// Standard deviation of fitness.
    pub std_fitness: f64,
}

/// The best tree, re-evaluated after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestFit {
    /// Population slot.
    pub slot: usize,
    /// Rendered expression.
    pub expression: String,
    /// Score of `predictions`.
    pub score: f64,
    /// One output per input row.
    pub predictions: Vec<f64>,
}

/// Overall statistics from an evolution run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionStats {
    /// Statistics per generation.
    pub generations: Vec<GenerationStats>,
    /// Best fitness seen in any generation.
    pub best_fitness: f64,
    /// Generation where the best fitness was seen.
    pub best_generation: usize,
    /// Total time in seconds.
    pub elapsed_seconds: f64,
}

/// Error during evolution.
#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionError {
    /// Invalid parameters, or a tree could not be built.
    Config(ConfigError),
    /// A tree failed to evaluate.
    Evaluation {
        /// Population slot of the tree.
        tree: usize,
        /// Underlying failure.
        source: EvalError,
    },
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Evaluation { tree, source } => write!(f, "tree {tree}: {source}"),
        }
    }
}

impl std::error::Error for EvolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Evaluation { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for EvolutionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// The evolving set of trees.
#[derive(Debug, Clone)]
pub struct Population {
    primitives: PrimitiveSet,
    trees: Vec<Tree>,
    scores: Vec<f64>,
    rng: SmallRng,
}

impl Population {
    /// Empty population; all randomness is drawn from `seed`.
    #[must_use]
    pub fn new(primitives: PrimitiveSet, seed: u64) -> Self {
        Self {
            primitives,
            trees: Vec::new(),
            scores: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Replace the population with `n_trees` fresh random trees built with
    /// the maximum depth. Scores are cleared.
    ///
    /// # Errors
    ///
    /// Fails if `n_trees` is 0 or a tree cannot be built.
    pub fn initialize(&mut self, n_trees: usize) -> ConfigResult<()> {
        if n_trees == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let builder = TreeBuilder::new(&self.primitives);
        let max_depth = self.primitives.max_depth();
        self.trees = (0..n_trees)
            .map(|slot| builder.build_tree(&mut self.rng, max_depth, slot))
            .collect::<ConfigResult<Vec<_>>>()?;
        self.scores.clear();
        Ok(())
    }

    /// Primitive set the trees are built from.
    #[must_use]
    pub fn primitives(&self) -> &PrimitiveSet {
        &self.primitives
    }

    /// Trees in slot order.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Scores from the last evaluation, in slot order.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Number of trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True before initialization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Tree with the highest recorded score, first one on ties.
    ///
    /// `None` until the population has been scored.
    #[must_use]
    pub fn best(&self) -> Option<&Tree> {
        best_index(&self.scores).and_then(|i| self.trees.get(i))
    }

    /// Evaluate every tree on `inputs`.
    ///
    /// # Errors
    ///
    /// Reports the slot of the first tree that fails.
    pub fn evaluate(
        &self,
        inputs: ArrayView2<'_, f64>,
    ) -> Result<Vec<Array1<f64>>, EvolutionError> {
        self.trees
            .iter()
            .enumerate()
            .map(|(tree, t)| {
                t.evaluate(inputs)
                    .map_err(|source| EvolutionError::Evaluation { tree, source })
            })
            .collect()
    }

    /// Evaluate and score every tree, recording the scores.
    ///
    /// # Errors
    ///
    /// Fails on a target/input length mismatch or an evaluation error.
    pub fn score<S: ScoreFunction + ?Sized>(
        &mut self,
        scorer: &S,
        inputs: ArrayView2<'_, f64>,
        targets: Option<&Array1<f64>>,
    ) -> Result<&[f64], EvolutionError> {
        check_targets(inputs, targets)?;
        let outputs = self.evaluate(inputs)?;
        self.scores = outputs
            .iter()
            .map(|output| scorer.score(output, targets))
            .collect();
        Ok(&self.scores)
    }

    /// Check that `inputs` has a column for every variable the primitive set
    /// can reference and, if given, one target per row.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InputWidthMismatch`] or
    /// [`ConfigError::TargetLengthMismatch`].
    pub fn check_inputs(
        &self,
        inputs: ArrayView2<'_, f64>,
        targets: Option<&Array1<f64>>,
    ) -> ConfigResult<()> {
        let variables = self.primitives.n_variables();
        if inputs.ncols() < variables {
            return Err(ConfigError::InputWidthMismatch {
                variables,
                columns: inputs.ncols(),
            });
        }
        check_targets(inputs, targets)
    }

    /// Re-evaluate [`Population::best`] on `inputs` and score it afresh.
    ///
    /// Recorded scores predate the last crossover and mutation, so the
    /// returned score belongs to the tree as it is now. `None` before any
    /// scoring.
    ///
    /// # Errors
    ///
    /// Fails if the best tree cannot be evaluated on `inputs`.
    pub fn best_fit<S: ScoreFunction + ?Sized>(
        &self,
        scorer: &S,
        inputs: ArrayView2<'_, f64>,
        targets: Option<&Array1<f64>>,
    ) -> Result<Option<BestFit>, EvolutionError> {
        let Some(slot) = best_index(&self.scores) else {
            return Ok(None);
        };
        let tree = &self.trees[slot];
        let predictions = tree
            .evaluate(inputs)
            .map_err(|source| EvolutionError::Evaluation { tree: slot, source })?;
        Ok(Some(BestFit {
            slot,
            expression: tree.render(),
            score: scorer.score(&predictions, targets),
            predictions: predictions.to_vec(),
        }))
    }

    /// Draw `len()` slots weighted by absolute score.
    ///
    /// Under [`SelectionPolicy::Replace`] the drawn trees (cloned) become the
    /// new population and their scores move with them; under
    /// [`SelectionPolicy::Discard`] nothing changes. Returns the drawn slots.
    pub fn select(&mut self, policy: SelectionPolicy) -> Vec<usize> {
        let drawn = resample(&self.scores, self.trees.len(), &mut self.rng);
        if policy == SelectionPolicy::Replace && !drawn.is_empty() {
            let mut trees: Vec<Tree> = drawn.iter().map(|&i| self.trees[i].clone()).collect();
            for (slot, tree) in trees.iter_mut().enumerate() {
                tree.set_slot(slot);
            }
            self.scores = drawn.iter().map(|&i| self.scores[i]).collect();
            self.trees = trees;
        }
        drawn
    }

    /// Cross consecutive pairs. Returns how many pairs swapped subtrees.
    pub fn crossover(&mut self, p_crossover: f64, metric: SizeMetric) -> usize {
        crossover_population(&mut self.trees, p_crossover, metric, &mut self.rng)
    }

    /// Mutate trees independently. Returns how many were mutated.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn mutate(&mut self, p_mutation: f64, metric: SizeMetric) -> ConfigResult<usize> {
        let builder = TreeBuilder::new(&self.primitives);
        let max_depth = self.primitives.max_depth();
        mutate_population(&mut self.trees, p_mutation, &builder, max_depth, metric, &mut self.rng)
    }

    /// Initialize `config.n_trees` trees and run `config.n_iterations`
    /// generations.
    ///
    /// Scores left behind belong to the trees as they were evaluated in the
    /// last generation, before that generation's crossover and mutation.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration or a failed evaluation.
    pub fn evolve<S: ScoreFunction + ?Sized>(
        &mut self,
        config: &EvolutionConfig,
        scorer: &S,
        inputs: ArrayView2<'_, f64>,
        targets: Option<&Array1<f64>>,
    ) -> Result<EvolutionStats, EvolutionError> {
        self.evolve_with(config, scorer, inputs, targets, |_| {})
    }

    /// Like [`Population::evolve`], calling `observer` after each generation.
    ///
    /// # Errors
    ///
    /// See [`Population::evolve`].
    pub fn evolve_with<S, F>(
        &mut self,
        config: &EvolutionConfig,
        scorer: &S,
        inputs: ArrayView2<'_, f64>,
        targets: Option<&Array1<f64>>,
        mut observer: F,
    ) -> Result<EvolutionStats, EvolutionError>
    where
        S: ScoreFunction + ?Sized,
        F: FnMut(&GenerationStats),
    {
        let start_time = Instant::now();
        config.validate()?;
        self.check_inputs(inputs, targets)?;
        self.initialize(config.n_trees)?;

        let mut generations = Vec::with_capacity(config.n_iterations);
        let mut best_fitness = f64::NEG_INFINITY;
        let mut best_generation = 0;

        for generation in 0..config.n_iterations {
            let stats = FitnessStats::from_fitness(self.score(scorer, inputs, targets)?);
            self.select(config.selection);
            self.crossover(config.p_crossover, config.size_metric);
            self.mutate(config.p_mutation, config.size_metric)?;

            let gen_stats = GenerationStats {
                generation,
                min_fitness: stats.min,
                max_fitness: stats.max,
                mean_fitness: stats.mean,
                std_fitness: stats.std,
            };
            if stats.max > best_fitness {
                best_fitness = stats.max;
                best_generation = generation;
            }
            if config.verbose {
                eprintln!("{}", progress_line(generation, &stats));
            }
            observer(&gen_stats);
            generations.push(gen_stats);
        }

        Ok(EvolutionStats {
            generations,
            best_fitness,
            best_generation,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}

fn progress_line(generation: usize, stats: &FitnessStats) -> String {
    format!(
        "Gen {:>5}: min={:.4e} max={:.4e}",
        generation, stats.min, stats.max
    )
}

fn check_targets(inputs: ArrayView2<'_, f64>, targets: Option<&Array1<f64>>) -> ConfigResult<()> {
    match targets {
        Some(targets) if targets.len() != inputs.nrows() => {
            Err(ConfigError::TargetLengthMismatch {
                rows: inputs.nrows(),
                targets: targets.len(),
            })
        }
        _ => Ok(()),
    }
}

impl fmt::Display for Population {
    /// One rendered tree per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tree) in self.trees.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{tree}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::fitness::InverseSquaredError;
    use crate::gp::primitives::{Function, builtin};
    use ndarray::array;

    fn primitives() -> PrimitiveSet {
        PrimitiveSet::new(
            vec![
                Function::ternary("f", |a, b, c| a * b - c),
                Function::binary("g", |a, b| (a + b) + (a - b)),
                builtin("cos").unwrap(),
            ],
            vec![12.0, 34.0, 0.0, 1.0],
            3,
            0.1,
            4,
        )
        .unwrap()
    }

    fn data() -> (ndarray::Array2<f64>, Array1<f64>) {
        (
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
            array![6.0, 14.0, 24.0],
        )
    }

    #[test]
    fn test_evolution_config_default() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection, SelectionPolicy::Discard);
        assert_eq!(config.size_metric, SizeMetric::Height);
    }

    #[test]
    fn test_config_validation() {
        let config = EvolutionConfig {
            n_trees: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::EmptyPopulation);
        let config = EvolutionConfig {
            p_mutation: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability { name: "p_mutation", .. })
        ));
    }

    #[test]
    fn test_initialize_slots() {
        let mut population = Population::new(primitives(), 12345);
        population.initialize(10).unwrap();
        assert_eq!(population.len(), 10);
        for (slot, tree) in population.trees().iter().enumerate() {
            assert_eq!(tree.slot(), slot);
            assert!(tree[tree.root()].parent.is_none());
        }
        assert!(population.best().is_none());
        assert_eq!(population.initialize(0).unwrap_err(), ConfigError::EmptyPopulation);
    }

    #[test]
    fn test_single_tree_is_best() {
        let (x, y) = data();
        let mut population = Population::new(primitives(), 1);
        let config = EvolutionConfig {
            n_trees: 1,
            n_iterations: 1,
            ..Default::default()
        };
        population
            .evolve(&config, &InverseSquaredError::default(), x.view(), Some(&y))
            .unwrap();
        assert_eq!(population.len(), 1);
        let best = population.best().unwrap();
        assert_eq!(best.render(), population.trees()[0].render());
    }

    #[test]
    fn test_evolve_reports_every_generation() {
        let (x, y) = data();
        let mut population = Population::new(primitives(), 12345);
        let config = EvolutionConfig::default();
        let mut seen = Vec::new();
        let stats = population
            .evolve_with(&config, &InverseSquaredError::default(), x.view(), Some(&y), |g| {
                seen.push(g.generation);
            })
            .unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(stats.generations.len(), 10);
        assert_eq!(population.len(), 10);
        assert_eq!(population.scores().len(), 10);
        for g in &stats.generations {
            assert!(g.min_fitness <= g.max_fitness);
            assert!(g.std_fitness >= 0.0);
        }
        assert!(stats.best_fitness >= stats.generations[0].max_fitness);
    }

    #[test]
    fn test_same_seed_same_run() {
        let (x, y) = data();
        let config = EvolutionConfig::default();
        let run = |seed| {
            let mut population = Population::new(primitives(), seed);
            population
                .evolve(&config, &InverseSquaredError::default(), x.view(), Some(&y))
                .unwrap();
            population.to_string()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_narrow_inputs_rejected_before_run() {
        let x = array![[1.0, 2.0], [4.0, 5.0], [7.0, 8.0]];
        let (_, y) = data();
        let config = EvolutionConfig::default();
        let scorer = InverseSquaredError::default();
        for seed in 0..20 {
            let mut population = Population::new(primitives(), seed);
            let err = population
                .evolve(&config, &scorer, x.view(), Some(&y))
                .unwrap_err();
            assert_eq!(
                err,
                EvolutionError::Config(ConfigError::InputWidthMismatch {
                    variables: 3,
                    columns: 2
                })
            );
            assert!(population.is_empty());
        }
    }

    #[test]
    fn test_wider_inputs_accepted() {
        let x = array![[1.0, 2.0, 3.0, 0.0], [4.0, 5.0, 6.0, 0.0]];
        let population = Population::new(primitives(), 1);
        assert!(population.check_inputs(x.view(), None).is_ok());
        assert_eq!(
            population.check_inputs(x.view(), Some(&array![1.0])),
            Err(ConfigError::TargetLengthMismatch { rows: 2, targets: 1 })
        );
    }

    #[test]
    fn test_best_fit_rescored() {
        let (x, y) = data();
        let mut population = Population::new(primitives(), 12345);
        let scorer = InverseSquaredError::default();
        assert_eq!(population.best_fit(&scorer, x.view(), Some(&y)), Ok(None));

        population
            .evolve(&EvolutionConfig::default(), &scorer, x.view(), Some(&y))
            .unwrap();
        let best = population.best_fit(&scorer, x.view(), Some(&y)).unwrap().unwrap();
        let tree = &population.trees()[best.slot];
        assert_eq!(best.expression, tree.render());
        let output = tree.evaluate(x.view()).unwrap();
        assert_eq!(best.predictions, output.to_vec());
        assert_eq!(best.score.to_bits(), scorer.score(&output, Some(&y)).to_bits());
        assert_eq!(best.expression, population.best().unwrap().render());
    }

    #[test]
    fn test_progress_line_scientific() {
        let stats = FitnessStats::from_fitness(&[2.5e-3, 1.0e80]);
        assert_eq!(progress_line(3, &stats), "Gen     3: min=2.5000e-3 max=1.0000e80");
    }

    #[test]
    fn test_target_length_checked() {
        let (x, _) = data();
        let mut population = Population::new(primitives(), 1);
        population.initialize(2).unwrap();
        let err = population
            .score(&InverseSquaredError::default(), x.view(), Some(&array![1.0]))
            .unwrap_err();
        assert_eq!(
            err,
            EvolutionError::Config(ConfigError::TargetLengthMismatch { rows: 3, targets: 1 })
        );
    }

    #[test]
    fn test_evaluation_error_names_tree() {
        let mut population = Population::new(primitives(), 3);
        population.trees = vec![Tree::constant(1.0), Tree::variable(2)];
        let narrow = ndarray::Array2::<f64>::zeros((2, 1));
        let err = population.evaluate(narrow.view()).unwrap_err();
        assert_eq!(
            err,
            EvolutionError::Evaluation {
                tree: 1,
                source: EvalError::VariableOutOfRange { index: 2, columns: 1 },
            }
        );
        assert_eq!(err.to_string(), "tree 1: variable x2 out of range for input with 1 columns");
    }

    #[test]
    fn test_replace_policy_resamples() {
        let (x, _) = data();
        let mut population = Population::new(primitives(), 9);
        population.initialize(6).unwrap();
        population.scores = vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let winner = population.trees()[2].render();

        let drawn = population.select(SelectionPolicy::Replace);
        assert_eq!(drawn, vec![2; 6]);
        for (slot, tree) in population.trees().iter().enumerate() {
            assert_eq!(tree.render(), winner);
            assert_eq!(tree.slot(), slot);
        }
        assert!(population.evaluate(x.view()).is_ok());
    }

    #[test]
    fn test_discard_policy_keeps_population() {
        let mut population = Population::new(primitives(), 9);
        population.initialize(6).unwrap();
        population.scores = vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0];
        let before = population.to_string();
        let drawn = population.select(SelectionPolicy::Discard);
        assert_eq!(drawn.len(), 6);
        assert_eq!(population.to_string(), before);
    }

    #[test]
    fn test_display_one_line_per_tree() {
        let mut population = Population::new(primitives(), 4);
        population.initialize(5).unwrap();
        assert_eq!(population.to_string().lines().count(), 5);
    }
}
