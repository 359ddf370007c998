//! CLI command for the built-in reference problem.

use crate::cli::output::{RunSummary, render};
use crate::cli::{CliError, OutputFormat};
use grove::Population;
use grove::problem;

/// Execute the demo command.
///
/// # Errors
///
/// Returns an error if evolution fails.
pub(crate) fn execute(
    seed: Option<u64>,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let seed = seed.unwrap_or(problem::DEFAULT_SEED);
    let (inputs, targets) = problem::data();
    let mut config = problem::config();
    config.verbose = !quiet;

    let mut population = Population::new(problem::primitives()?, seed);
    let stats = population.evolve(&config, &problem::scorer(), inputs.view(), Some(&targets))?;

    let best = population.best_fit(&problem::scorer(), inputs.view(), Some(&targets))?;
    let summary = RunSummary::new(seed, &stats, &population, best);
    println!("{}", render(&summary, format)?);

    Ok(())
}
