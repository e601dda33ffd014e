//! Regression check of the objective function.
//!
//! A check evaluates an externally supplied node list, taken as the tour in
//! file order, and compares the objective with an expected value.

use crate::distance::DistanceMatrix;
use crate::error::Result;
use crate::instance::Instance;
use crate::objective::try_evaluate;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Published objective of the reference node list of dataset A
pub const TSPA_OBJECTIVE: i64 = 265_366;
/// Published objective of the reference node list of dataset B
pub const TSPB_OBJECTIVE: i64 = 208_785;

/// Look up the published objective from a dataset name such as `TSPA`.
pub fn published_objective(dataset: &str) -> Option<i64> {
    let stem = dataset.trim().to_ascii_uppercase();
    let stem = stem.strip_prefix("TSP").unwrap_or(&stem);
    match stem {
        "A" => Some(TSPA_OBJECTIVE),
        "B" => Some(TSPB_OBJECTIVE),
        _ => None,
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionCheck {
    pub expected: i64,
    pub actual: i64,
}

impl SolutionCheck {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

impl std::fmt::Display for SolutionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed() {
            write!(f, "Test passed. Objective matches expected value: {}", self.expected)
        } else {
            write!(
                f,
                "Test failed! Expected: {}, but got: {}",
                self.expected, self.actual
            )
        }
    }
}

/// Evaluate `selection` as a tour and compare it with `expected`.
pub fn check(
    instance: &Instance,
    distances: &DistanceMatrix,
    selection: &Selection,
    expected: i64,
) -> Result<SolutionCheck> {
    let actual = try_evaluate(selection.nodes(), distances, instance)?;
    let check = SolutionCheck { expected, actual };
    if check.passed() {
        log::info!("{}: objective {} matches", instance.name, actual);
    } else {
        log::warn!(
            "{}: objective {} differs from expected {}",
            instance.name,
            actual,
            expected
        );
    }
    Ok(check)
}
