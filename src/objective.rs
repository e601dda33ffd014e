//! Objective function of the node-cost TSP.
//!
//! A tour is a closed cycle: the arc from the last point back to the first is
//! always part of the cost. Every arc contributes its length plus the visiting
//! cost of the point it enters, so each selected point is charged exactly once.

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::instance::Instance;

/// Total cost of a closed tour: Σ d(t[i], t[i+1 mod m]) + cost(t[i+1 mod m]).
///
/// Indices must be valid for `instance`; use [`try_evaluate`] for tours that
/// come from outside the crate. An empty tour costs 0 and a single point costs
/// its own visiting cost.
pub fn evaluate(tour: &[usize], distances: &DistanceMatrix, instance: &Instance) -> i64 {
    let m = tour.len();
    (0..m)
        .map(|i| {
            let to = tour[(i + 1) % m];
            distances.get(tour[i], to) + instance.cost(to)
        })
        .sum()
}

/// Validate then evaluate an externally supplied tour.
pub fn try_evaluate(tour: &[usize], distances: &DistanceMatrix, instance: &Instance) -> Result<i64> {
    validate_tour(tour, instance.len())?;
    if distances.size() != instance.len() {
        return Err(Error::invalid_argument(format!(
            "distance matrix covers {} points but the instance has {}",
            distances.size(),
            instance.len()
        )));
    }
    Ok(evaluate(tour, distances, instance))
}

/// Check that every index is below `n` and that no index repeats.
pub fn validate_tour(tour: &[usize], n: usize) -> Result<()> {
    let mut seen = vec![false; n];
    for (pos, &node) in tour.iter().enumerate() {
        if node >= n {
            return Err(Error::invalid_argument(format!(
                "tour position {} holds index {} but the instance has {} points",
                pos, node, n
            )));
        }
        if seen[node] {
            return Err(Error::invalid_argument(format!(
                "index {} appears more than once in the tour",
                node
            )));
        }
        seen[node] = true;
    }
    Ok(())
}

/// Change in objective when `node` is inserted on the edge `prev -> next`.
///
/// With a one-point tour `prev == next` and the formula still holds, since
/// `d(prev, prev)` is zero.
#[inline]
pub fn insertion_delta(
    distances: &DistanceMatrix,
    instance: &Instance,
    prev: usize,
    node: usize,
    next: usize,
) -> i64 {
    distances.get(prev, node) + distances.get(node, next) - distances.get(prev, next)
        + instance.cost(node)
}
