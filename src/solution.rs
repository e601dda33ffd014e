//! Solution representation for the node-cost TSP.
//!
//! A solution is one closed tour produced by a heuristic run, together with
//! its objective and the bookkeeping the experiment harness reports.

use crate::distance::DistanceMatrix;
use crate::instance::Instance;
use crate::objective::evaluate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Represents a solution to the node-cost TSP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a cyclic sequence of point indices (closing arc implicit)
    pub tour: Vec<usize>,
    /// Travel distance plus visiting cost of every point in the tour
    pub objective: i64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Start point the heuristic was seeded with
    pub start: Option<usize>,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Solution {
    /// A solution with no points; its objective is 0.
    pub fn empty(algorithm: &str) -> Self {
        Solution {
            tour: Vec::new(),
            objective: 0,
            algorithm: algorithm.to_string(),
            start: None,
            computation_time: 0.0,
        }
    }

    /// Create a solution from a tour
    pub fn from_tour(
        instance: &Instance,
        distances: &DistanceMatrix,
        tour: Vec<usize>,
        algorithm: &str,
    ) -> Self {
        let objective = evaluate(&tour, distances, instance);
        Solution {
            tour,
            objective,
            algorithm: algorithm.to_string(),
            start: None,
            computation_time: 0.0,
        }
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    pub fn len(&self) -> usize {
        self.tour.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tour.is_empty()
    }

    /// True when the tour holds exactly `target` distinct points.
    pub fn is_complete(&self, target: usize) -> bool {
        let unique: HashSet<usize> = self.tour.iter().copied().collect();
        self.tour.len() == target && unique.len() == target
    }

    /// Length of the closed tour without visiting costs
    pub fn travel_distance(&self, distances: &DistanceMatrix) -> i64 {
        let m = self.tour.len();
        (0..m)
            .map(|i| distances.get(self.tour[i], self.tour[(i + 1) % m]))
            .sum()
    }

    /// Sum of visiting costs of the selected points
    pub fn visiting_cost(&self, instance: &Instance) -> i64 {
        self.tour.iter().map(|&n| instance.cost(n)).sum()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Objective: {}", self.objective)?;
        writeln!(f, "  Points: {}", self.tour.len())?;
        if let Some(start) = self.start {
            writeln!(f, "  Start: {}", start)?;
        }
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}
