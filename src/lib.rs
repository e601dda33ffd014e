//! Node-cost TSP Solver Library
//!
//! Construction heuristics for a travelling salesman variant with visiting
//! costs: out of n points exactly k = ceil(n/2) are chosen and ordered into a
//! closed tour minimizing rounded Euclidean travel distance plus the visiting
//! cost of every chosen point.
//!
//! # Features
//!
//! - Integer distance matrix and objective evaluation
//! - Seeded node selection shared by every heuristic of an experiment
//! - Construction heuristics (Random, Nearest Neighbor append / insert, Greedy Cycle)
//! - Experiment harness with statistics, CSV / LaTeX / JSON export and SVG plots
//! - Regression checker for externally supplied tours
//!
//! # Example
//!
//! ```no_run
//! use nc_tsp_solver::instance::Instance;
//! use nc_tsp_solver::distance::DistanceMatrix;
//! use nc_tsp_solver::heuristics::{ConstructionContext, ConstructionHeuristic, GreedyCycle};
//!
//! let instance = Instance::from_file("TSPA.csv").unwrap();
//! let distances = DistanceMatrix::from_instance(&instance);
//!
//! let ctx = ConstructionContext::full(&instance, &distances).unwrap();
//! let solution = GreedyCycle.construct(&ctx, 0).unwrap();
//!
//! println!("Objective: {}", solution.objective);
//! ```

pub mod checker;
pub mod distance;
pub mod error;
pub mod experiment;
pub mod heuristics;
pub mod instance;
pub mod objective;
pub mod report;
pub mod selection;
pub mod solution;
pub mod visualization;

pub use distance::DistanceMatrix;
pub use error::{Error, Result};
pub use instance::Instance;
pub use objective::evaluate;
pub use solution::Solution;
