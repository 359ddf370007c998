//! CLI command for evolving a population from a run file.

use crate::cli::output::{RunSummary, render};
use crate::cli::{CliError, OutputFormat};
use grove::RunConfig;
use grove::gp::GenerationStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Execute the evolve command.
///
/// # Errors
///
/// Returns an error if the run file is invalid or evolution fails.
pub(crate) fn execute(
    run: &Path,
    seed: Option<u64>,
    generations: Option<usize>,
    format: OutputFormat,
    progress: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let mut config = RunConfig::load(run)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(generations) = generations {
        config.evolution.n_iterations = generations;
    }
    // Per-generation lines would interleave with the progress bar.
    config.evolution.verbose = !quiet && !progress;

    let inputs = config.input_matrix()?;
    let targets = config.target_vector();
    let mut population = config.population()?;

    let pb = if progress {
        let pb = ProgressBar::new(u64::try_from(config.evolution.n_iterations).unwrap_or(u64::MAX));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {pos}/{len} generations {msg}",
                )
                .map_err(|e| CliError::new(format!("invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let stats = population.evolve_with(
        &config.evolution,
        &config.scorer,
        inputs.view(),
        targets.as_ref(),
        |generation: &GenerationStats| {
            if let Some(pb) = &pb {
                pb.set_message(format!("max={:.4e}", generation.max_fitness));
                pb.inc(1);
            }
        },
    )?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let best = population.best_fit(&config.scorer, inputs.view(), targets.as_ref())?;
    let summary = RunSummary::new(config.seed, &stats, &population, best);
    println!("{}", render(&summary, format)?);

    Ok(())
}
