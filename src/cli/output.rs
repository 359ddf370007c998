//! Output formatting utilities for CLI.

use std::fmt::Write;

use grove::Population;
use grove::gp::{BestFit, EvolutionStats, GenerationStats};
use serde::Serialize;

use crate::cli::{CliError, OutputFormat};

/// JSON-serializable run summary.
#[derive(Debug, Serialize)]
pub(super) struct RunSummary<'a> {
    /// Random seed used.
    pub(super) seed: u64,
    /// Per-generation statistics.
    pub(super) generations: &'a [GenerationStats],
    /// Best fitness seen in any generation.
    pub(super) best_fitness: f64,
    /// Generation where it was seen.
    pub(super) best_generation: usize,
    /// Wall-clock time.
    pub(super) elapsed_seconds: f64,
    /// Best tree by the last recorded scores (null if none).
    pub(super) best_tree: Option<String>,
    /// Score of the best tree as it stands after the run.
    pub(super) best_score: Option<f64>,
    /// Output of the best tree for each input row.
    pub(super) predictions: Option<Vec<f64>>,
    /// Final population, one rendered tree per entry.
    pub(super) population: Vec<String>,
}

impl<'a> RunSummary<'a> {
    /// Collect a summary from a finished run and its re-scored best tree.
    pub(super) fn new(
        seed: u64,
        stats: &'a EvolutionStats,
        population: &Population,
        best: Option<BestFit>,
    ) -> Self {
        let (best_tree, best_score, predictions) = match best {
            Some(best) => (Some(best.expression), Some(best.score), Some(best.predictions)),
            None => (None, None, None),
        };
        Self {
            seed,
            generations: &stats.generations,
            best_fitness: stats.best_fitness,
            best_generation: stats.best_generation,
            elapsed_seconds: stats.elapsed_seconds,
            best_tree,
            best_score,
            predictions,
            population: population.trees().iter().map(ToString::to_string).collect(),
        }
    }
}

/// Format a run summary as human-readable text.
pub(super) fn format_text(summary: &RunSummary<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Evolution complete (seed: {})", summary.seed);
    let _ = writeln!(output, "  Generations: {}", summary.generations.len());
    let _ = writeln!(output, "  Best fitness: {:.4e}", summary.best_fitness);
    let _ = writeln!(output, "  Best generation: {}", summary.best_generation);
    let _ = writeln!(output, "  Elapsed time: {:.3}s", summary.elapsed_seconds);
    if let Some(best) = &summary.best_tree {
        let _ = writeln!(output, "  Best tree: {best}");
    }
    if let Some(score) = summary.best_score {
        let _ = writeln!(output, "  Best tree score: {score:.4e}");
    }
    if let Some(predictions) = &summary.predictions {
        let values: Vec<String> = predictions.iter().map(|p| format!("{p:.4}")).collect();
        let _ = writeln!(output, "  Predictions: [{}]", values.join(", "));
    }
    output.push_str("\nPopulation:\n");
    for (i, tree) in summary.population.iter().enumerate() {
        let _ = writeln!(output, "  {i:>3}: {tree}");
    }

    output
}

/// Render a summary in the requested format.
pub(super) fn render(summary: &RunSummary<'_>, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(format_text(summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove::problem;

    fn finished_run() -> (Population, EvolutionStats, Option<BestFit>) {
        let (inputs, targets) = problem::data();
        let mut population = Population::new(problem::primitives().unwrap(), 7);
        let stats = population
            .evolve(&problem::config(), &problem::scorer(), inputs.view(), Some(&targets))
            .unwrap();
        let best = population
            .best_fit(&problem::scorer(), inputs.view(), Some(&targets))
            .unwrap();
        (population, stats, best)
    }

    #[test]
    fn test_summary_reports_rescored_best() {
        let (population, stats, best) = finished_run();
        let best = best.unwrap();
        let summary = RunSummary::new(7, &stats, &population, Some(best.clone()));

        assert_eq!(summary.best_tree.as_deref(), Some(best.expression.as_str()));
        assert_eq!(summary.best_score.map(f64::to_bits), Some(best.score.to_bits()));
        assert_eq!(summary.predictions.as_ref().map(Vec::len), Some(3));

        let text = format_text(&summary);
        assert!(text.contains("Best tree score:"));
        assert!(text.contains("Predictions: ["));
    }

    #[test]
    fn test_json_summary_fields() {
        let (population, stats, best) = finished_run();
        let summary = RunSummary::new(7, &stats, &population, best);
        let json = render(&summary, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["seed"], 7);
        assert_eq!(value["generations"].as_array().unwrap().len(), 10);
        assert_eq!(value["predictions"].as_array().unwrap().len(), 3);
        assert!(value["best_tree"].is_string());
        assert_eq!(value["population"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_summary_without_scores() {
        let (_, stats, _) = finished_run();
        let population = Population::new(problem::primitives().unwrap(), 1);
        let summary = RunSummary::new(1, &stats, &population, None);
        let json = render(&summary, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["best_score"].is_null());
        assert!(!format_text(&summary).contains("Predictions"));
    }
}
