//! Experiment harness for the construction heuristics.
//!
//! Runs the Random baseline a fixed number of times and every deterministic
//! heuristic once per start node, then collects the objective distribution
//! and the best tour of each heuristic for the reporting layer.

use crate::distance::DistanceMatrix;
use crate::error::Result;
use crate::heuristics::construction::{ConstructionContext, HeuristicKind};
use crate::instance::Instance;
use crate::selection::{NodeSelector, Selection};
use crate::solution::Solution;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics as _;

/// Which start nodes the deterministic heuristics are run from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartNodes {
    /// Every point of the candidate pool
    All,
    /// Only the points of the NodeSelector subset
    Selected,
}

/// Which points the heuristics may put in a tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePool {
    /// Every point; k = ceil(n/2) of them are chosen
    All,
    /// Only the selected subset, which the heuristics order
    Selected,
}

/// Experiment configuration
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Number of Random baseline trials
    pub random_trials: usize,
    /// Seed of the subset shared by all heuristics
    pub subset_seed: u64,
    /// Base seed of the Random baseline; `None` draws from OS entropy
    pub random_seed: Option<u64>,
    pub start_nodes: StartNodes,
    pub candidates: CandidatePool,
    /// Heuristics to run, in report order
    pub heuristics: Vec<HeuristicKind>,
    /// Run trials on the rayon thread pool
    pub parallel: bool,
    /// Show a progress bar per heuristic
    pub progress: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            random_trials: 200,
            subset_seed: NodeSelector::DEFAULT_SEED,
            random_seed: None,
            start_nodes: StartNodes::Selected,
            candidates: CandidatePool::All,
            heuristics: HeuristicKind::all(),
            parallel: true,
            progress: false,
        }
    }
}

/// Summary of an objective distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub runs: usize,
    pub min: i64,
    pub max: i64,
    pub average: f64,
    /// Sample standard deviation, 0 for a single run
    pub std_dev: f64,
}

impl Statistics {
    /// `None` when no objective was observed.
    pub fn from_objectives(objectives: &[i64]) -> Option<Self> {
        let min = *objectives.iter().min()?;
        let max = *objectives.iter().max()?;
        let values: Vec<f64> = objectives.iter().map(|&o| o as f64).collect();
        let average = values.iter().mean();
        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };

        Some(Statistics {
            runs: objectives.len(),
            min,
            max,
            average,
            std_dev,
        })
    }
}

/// Everything observed for one heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicResult {
    pub heuristic: HeuristicKind,
    /// Objective of every run, in run order
    pub objectives: Vec<i64>,
    /// Lowest-objective solution; the earliest run wins ties
    pub best: Option<Solution>,
    /// Summed computation time of all runs in seconds
    pub total_time: f64,
}

impl HeuristicResult {
    pub fn new(heuristic: HeuristicKind) -> Self {
        HeuristicResult {
            heuristic,
            objectives: Vec::new(),
            best: None,
            total_time: 0.0,
        }
    }

    pub fn record(&mut self, solution: Solution) {
        self.objectives.push(solution.objective);
        self.total_time += solution.computation_time;

        let improves = self
            .best
            .as_ref()
            .map_or(true, |best| solution.objective < best.objective);
        if improves {
            self.best = Some(solution);
        }
    }

    pub fn best_objective(&self) -> Option<i64> {
        self.best.as_ref().map(|b| b.objective)
    }

    pub fn statistics(&self) -> Option<Statistics> {
        Statistics::from_objectives(&self.objectives)
    }
}

/// Results of one experiment on one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub dataset: String,
    pub dimension: usize,
    /// Size of every complete tour
    pub target: usize,
    /// The subset drawn for this dataset (start nodes / candidate pool)
    pub selection: Selection,
    pub results: Vec<HeuristicResult>,
    /// Local time the experiment started, RFC 3339
    pub started_at: String,
}

impl ExperimentReport {
    pub fn result(&self, heuristic: HeuristicKind) -> Option<&HeuristicResult> {
        self.results.iter().find(|r| r.heuristic == heuristic)
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str(&format!("  Node-cost TSP: {}\n", self.dataset));
        report.push_str("========================================\n\n");
        report.push_str(&format!(
            "Points: {}, tour size: {}, started: {}\n\n",
            self.dimension, self.target, self.started_at
        ));

        report.push_str("-".repeat(86).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<28} {:>6} {:>10} {:>10} {:>12} {:>10} {:>6}\n",
            "Heuristic", "Runs", "Min", "Max", "Average", "Std Dev", "Start"
        ));
        report.push_str("-".repeat(86).as_str());
        report.push('\n');

        let mut rows: Vec<(&HeuristicResult, Statistics)> = self
            .results
            .iter()
            .filter_map(|r| r.statistics().map(|s| (r, s)))
            .collect();
        rows.sort_by_key(|(_, s)| OrderedFloat(s.average));

        for (result, stats) in rows {
            let start = result
                .best
                .as_ref()
                .and_then(|b| b.start)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<28} {:>6} {:>10} {:>10} {:>12.2} {:>10.2} {:>6}\n",
                result.heuristic.label(),
                stats.runs,
                stats.min,
                stats.max,
                stats.average,
                stats.std_dev,
                start
            ));
        }

        report.push_str("-".repeat(86).as_str());
        report.push('\n');

        if let Some(best) = self
            .results
            .iter()
            .filter_map(|r| r.best.as_ref())
            .min_by_key(|b| b.objective)
        {
            report.push_str(&format!(
                "\nBest tour: {} ({})\n",
                best.objective, best.algorithm
            ));
        }

        report
    }
}

/// Experiment engine
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Self {
        Experiment { config }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Draw the shared subset with the configured seed, then run.
    pub fn run(&self, instance: &Instance, distances: &DistanceMatrix) -> Result<ExperimentReport> {
        let mut selector = NodeSelector::seeded(self.config.subset_seed);
        let selection = Selection::sample(instance.len(), &mut selector);
        self.run_with_selection(instance, distances, selection)
    }

    /// Run with a caller-provided subset (e.g. an external node list).
    pub fn run_with_selection(
        &self,
        instance: &Instance,
        distances: &DistanceMatrix,
        selection: Selection,
    ) -> Result<ExperimentReport> {
        let started_at = chrono::Local::now().to_rfc3339();
        log::info!(
            "Running {} heuristics on {} (n={})",
            self.config.heuristics.len(),
            instance.name,
            instance.len()
        );

        let pool = match self.config.candidates {
            CandidatePool::All => Selection::full(instance.len()),
            CandidatePool::Selected => selection.clone(),
        };
        let ctx = ConstructionContext::new(instance, distances, &pool)?;

        let starts: Vec<usize> = match self.config.start_nodes {
            StartNodes::All => ctx.candidates().to_vec(),
            StartNodes::Selected => {
                let mut starts = selection.nodes().to_vec();
                starts.sort_unstable();
                starts
            }
        };

        let mut results = Vec::with_capacity(self.config.heuristics.len());
        for &kind in &self.config.heuristics {
            results.push(self.run_heuristic(&ctx, kind, &starts)?);
        }

        Ok(ExperimentReport {
            dataset: instance.name.clone(),
            dimension: instance.len(),
            target: ctx.target(),
            selection,
            results,
            started_at,
        })
    }

    /// Run one heuristic: `random_trials` runs for the Random baseline, one
    /// run per start node otherwise.
    pub fn run_heuristic(
        &self,
        ctx: &ConstructionContext<'_>,
        kind: HeuristicKind,
        starts: &[usize],
    ) -> Result<HeuristicResult> {
        let jobs: Vec<(usize, Option<u64>)> = if kind.is_random() {
            let start = ctx.candidates().first().copied().unwrap_or(0);
            (0..self.config.random_trials)
                .map(|trial| {
                    let seed = self.config.random_seed.map(|s| s.wrapping_add(trial as u64));
                    (start, seed)
                })
                .collect()
        } else {
            starts.iter().map(|&s| (s, None)).collect()
        };

        let pb = self.progress_bar(kind, jobs.len());
        let run_one = |&(start, seed): &(usize, Option<u64>)| {
            log::debug!("{} from start {}", kind, start);
            let solution = kind.build(seed).construct(ctx, start);
            pb.inc(1);
            solution
        };

        let solutions: Vec<Solution> = if self.config.parallel {
            jobs.par_iter().map(run_one).collect::<Result<_>>()?
        } else {
            jobs.iter().map(run_one).collect::<Result<_>>()?
        };
        pb.finish_and_clear();

        let mut result = HeuristicResult::new(kind);
        for solution in solutions {
            result.record(solution);
        }

        match result.statistics() {
            Some(stats) => log::info!(
                "{}: {} runs, min {}, max {}, avg {:.2}",
                kind,
                stats.runs,
                stats.min,
                stats.max,
                stats.average
            ),
            None => log::info!("{}: no runs", kind),
        }

        Ok(result)
    }

    fn progress_bar(&self, kind: HeuristicKind, len: usize) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{prefix:>12} [{bar:40}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let pb = ProgressBar::new(len as u64);
        pb.set_style(style);
        pb.set_prefix(kind.name());
        pb
    }
}
