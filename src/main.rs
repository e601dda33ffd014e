//! Node-cost TSP Solver - Command Line Interface
//!
//! Runs the construction heuristics on `x;y;cost` datasets, checks reference
//! solutions and exports results.

use clap::{Parser, Subcommand, ValueEnum};
use nc_tsp_solver::checker::{self, published_objective};
use nc_tsp_solver::distance::DistanceMatrix;
use nc_tsp_solver::error::{Error, Result};
use nc_tsp_solver::experiment::{CandidatePool, Experiment, ExperimentConfig, StartNodes};
use nc_tsp_solver::heuristics::{ConstructionContext, HeuristicKind};
use nc_tsp_solver::instance::Instance;
use nc_tsp_solver::report::ReportWriter;
use nc_tsp_solver::selection::{NodeSelector, Selection};
use nc_tsp_solver::visualization::Visualizer;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nc-tsp-solver")]
#[command(version = "1.0")]
#[command(about = "Construction heuristics for the TSP with node costs")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every heuristic on one or more datasets and export the results
    Run {
        /// Dataset files (`x;y;cost` per line)
        #[arg(required_unless_present = "dir")]
        datasets: Vec<PathBuf>,

        /// Also run every `.csv` file of this directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of Random baseline trials
        #[arg(short, long, default_value = "200")]
        trials: usize,

        /// Seed of the shared node subset
        #[arg(long, default_value = "42")]
        subset_seed: u64,

        /// Base seed of the Random baseline (OS entropy when omitted)
        #[arg(long)]
        random_seed: Option<u64>,

        /// Start nodes of the deterministic heuristics
        #[arg(long, value_enum, default_value = "selected")]
        starts: Starts,

        /// Points the heuristics may use
        #[arg(long, value_enum, default_value = "all")]
        pool: Pool,

        /// Heuristics to run (comma separated, all by default)
        #[arg(long, value_enum, value_delimiter = ',')]
        heuristics: Vec<Heuristic>,

        /// Run on a single thread
        #[arg(long)]
        sequential: bool,

        /// Hide progress bars
        #[arg(long)]
        no_progress: bool,

        /// Print the summary only, write no files
        #[arg(long)]
        no_export: bool,
    },

    /// Run one heuristic from one start node
    Solve {
        /// Path to the dataset file
        #[arg(short, long)]
        instance: PathBuf,

        /// Heuristic to use
        #[arg(long, value_enum, default_value = "greedy")]
        heuristic: Heuristic,

        /// Start node index
        #[arg(short, long, default_value = "0")]
        start: usize,

        /// Seed of the Random heuristic
        #[arg(long)]
        seed: Option<u64>,

        /// Points the heuristic may use
        #[arg(long, value_enum, default_value = "all")]
        pool: Pool,

        /// Seed of the node subset used with `--pool selected`
        #[arg(long, default_value = "42")]
        subset_seed: u64,

        /// Write the solution as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an SVG plot of the tour
        #[arg(long)]
        visualize: Option<PathBuf>,
    },

    /// Evaluate a node list and compare it with the expected objective
    Check {
        /// Path to the dataset file
        #[arg(short, long)]
        instance: PathBuf,

        /// Whitespace-separated node indices, taken as the tour
        #[arg(short, long)]
        nodes: PathBuf,

        /// Expected objective (published value of TSPA/TSPB when omitted)
        #[arg(short, long)]
        expected: Option<i64>,
    },

    /// Analyze a dataset
    Analyze {
        /// Path to the dataset file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Heuristic {
    /// Random subset in random order
    Random,
    /// Nearest neighbor, appending at the tail
    NnAppend,
    /// Nearest neighbor, inserting anywhere
    NnInsert,
    /// Greedy cycle (cheapest insertion)
    Greedy,
}

impl From<Heuristic> for HeuristicKind {
    fn from(h: Heuristic) -> Self {
        match h {
            Heuristic::Random => HeuristicKind::Random,
            Heuristic::NnAppend => HeuristicKind::NearestNeighborAppend,
            Heuristic::NnInsert => HeuristicKind::NearestNeighborInsert,
            Heuristic::Greedy => HeuristicKind::GreedyCycle,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Starts {
    /// Every point of the pool
    All,
    /// Only the selected subset
    Selected,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Pool {
    /// Every point; half of them are chosen
    All,
    /// Only the selected subset, which is ordered
    Selected,
}

impl From<Pool> for CandidatePool {
    fn from(p: Pool) -> Self {
        match p {
            Pool::All => CandidatePool::All,
            Pool::Selected => CandidatePool::Selected,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let ok = match cli.command {
        Commands::Run {
            datasets,
            dir,
            output,
            trials,
            subset_seed,
            random_seed,
            starts,
            pool,
            heuristics,
            sequential,
            no_progress,
            no_export,
        } => {
            let heuristics = if heuristics.is_empty() {
                HeuristicKind::all()
            } else {
                heuristics.into_iter().map(HeuristicKind::from).collect()
            };
            let config = ExperimentConfig {
                random_trials: trials,
                subset_seed,
                random_seed,
                start_nodes: match starts {
                    Starts::All => StartNodes::All,
                    Starts::Selected => StartNodes::Selected,
                },
                candidates: pool.into(),
                heuristics,
                parallel: !sequential,
                progress: !no_progress,
            };
            run_experiments(datasets, dir, &output, config, !no_export)
        }

        Commands::Solve {
            instance,
            heuristic,
            start,
            seed,
            pool,
            subset_seed,
            output,
            visualize,
        } => report(solve_instance(
            &instance,
            heuristic.into(),
            start,
            seed,
            pool.into(),
            subset_seed,
            output,
            visualize,
        )),

        Commands::Check {
            instance,
            nodes,
            expected,
        } => match check_solution(&instance, &nodes, expected) {
            Ok(passed) => passed,
            Err(e) => {
                log::error!("{}", e);
                false
            }
        },

        Commands::Analyze { instance } => report(analyze_instance(&instance)),
    };

    if !ok {
        std::process::exit(1);
    }
}

fn report(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}", e);
            false
        }
    }
}

/// Dataset files of a directory, sorted by name
fn datasets_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    paths.sort();
    Ok(paths)
}

fn run_experiments(
    mut datasets: Vec<PathBuf>,
    dir: Option<PathBuf>,
    output: &Path,
    config: ExperimentConfig,
    export: bool,
) -> bool {
    if let Some(dir) = dir {
        match datasets_in_dir(&dir) {
            Ok(found) => datasets.extend(found),
            Err(e) => log::error!("{}", e),
        }
    }
    if datasets.is_empty() {
        log::error!("No datasets to run");
        return false;
    }

    let writer = if export {
        match ReportWriter::new(output) {
            Ok(writer) => Some(writer),
            Err(e) => {
                log::error!("{}", e);
                return false;
            }
        }
    } else {
        None
    };

    let experiment = Experiment::new(config);
    let mut failed = 0;

    for path in &datasets {
        log::info!("=== Processing {} ===", path.display());
        if let Err(e) = run_dataset(&experiment, path, writer.as_ref()) {
            log::error!("Skipping {}: {}", path.display(), e);
            failed += 1;
        }
    }

    log::info!(
        "Processed {} of {} datasets",
        datasets.len() - failed,
        datasets.len()
    );
    failed == 0
}

fn run_dataset(experiment: &Experiment, path: &Path, writer: Option<&ReportWriter>) -> Result<()> {
    let instance = Instance::from_file(path)?;
    if instance.is_empty() {
        return Err(Error::invalid_data(format!(
            "{} holds no valid records",
            path.display()
        )));
    }
    let distances = DistanceMatrix::from_instance(&instance);

    let report = experiment.run(&instance, &distances)?;
    println!("{}", report.generate_report());

    if let Some(writer) = writer {
        writer.write_all(&instance, &report)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &Path,
    kind: HeuristicKind,
    start: usize,
    seed: Option<u64>,
    pool: CandidatePool,
    subset_seed: u64,
    output: Option<PathBuf>,
    visualize: Option<PathBuf>,
) -> Result<()> {
    let instance = Instance::from_file(path)?;
    let distances = DistanceMatrix::from_instance(&instance);

    let selection = match pool {
        CandidatePool::All => Selection::full(instance.len()),
        CandidatePool::Selected => {
            Selection::sample(instance.len(), &mut NodeSelector::seeded(subset_seed))
        }
    };
    let ctx = ConstructionContext::new(&instance, &distances, &selection)?;

    log::info!("Solving {} with {} from start {}", instance.name, kind, start);
    let solution = kind.build(seed).construct(&ctx, start)?;
    println!("{}", solution);
    println!(
        "Travel distance: {}, visiting cost: {}",
        solution.travel_distance(&distances),
        solution.visiting_cost(&instance)
    );

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&out_path, json).map_err(|e| Error::io(&out_path, e))?;
        log::info!("Solution written to {}", out_path.display());
    }

    if let Some(svg_path) = visualize {
        let viz = Visualizer::new();
        let svg = viz.generate_svg(&instance, &solution, kind.label());
        viz.save_svg(&svg, &svg_path)?;
        log::info!("Plot written to {}", svg_path.display());
    }

    Ok(())
}

fn check_solution(path: &Path, nodes: &Path, expected: Option<i64>) -> Result<bool> {
    let instance = Instance::from_file(path)?;
    let distances = DistanceMatrix::from_instance(&instance);
    let selection = Selection::from_file(nodes, instance.len())?;

    let expected = match expected.or_else(|| published_objective(&instance.name)) {
        Some(value) => value,
        None => {
            return Err(Error::invalid_argument(format!(
                "no published objective for {}; pass --expected",
                instance.name
            )))
        }
    };

    println!(
        "Selected nodes: {}",
        selection
            .nodes()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let result = checker::check(&instance, &distances, &selection, expected)?;
    println!("{}", result);
    Ok(result.passed())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let instance = Instance::from_file(path)?;
    let distances = DistanceMatrix::from_instance(&instance);

    println!("{}", instance.statistics(&distances));

    if instance.is_empty() {
        return Ok(());
    }

    let ctx = ConstructionContext::full(&instance, &distances)?;
    println!("Quick Solution Estimates (start 0):");
    for kind in HeuristicKind::all().into_iter().filter(|k| !k.is_random()) {
        let solution = kind.build(None).construct(&ctx, 0)?;
        println!("  {:<28} {}", kind.label(), solution.objective);
    }

    Ok(())
}
