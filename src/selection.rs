//! Node selection for the construction heuristics.
//!
//! A [`Selection`] is the candidate pool a run draws its tour points from:
//! every index, a random sample of k = ceil(n/2) indices, or an externally
//! supplied list (e.g. the node list of a checker run).
//!
//! Seeding policy: samples used to compare heuristics come from a
//! [`NodeSelector::seeded`] generator so every heuristic sees the same
//! subset on every run. [`NodeSelector::unseeded`] exists for the Random
//! baseline only.

use crate::error::{Error, Result};
use crate::objective::validate_tour;
use rand::prelude::*;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of points in a complete tour, k = ceil(n / 2).
#[inline]
pub fn target_size(n: usize) -> usize {
    n.div_ceil(2)
}

/// Draws k distinct indices uniformly without replacement.
pub struct NodeSelector {
    rng: ChaCha8Rng,
    seed: Option<u64>,
}

impl NodeSelector {
    pub const DEFAULT_SEED: u64 = 42;

    /// Deterministic selector: the same seed yields the same subsets.
    pub fn seeded(seed: u64) -> Self {
        NodeSelector {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Selector seeded from OS entropy.
    pub fn unseeded() -> Self {
        NodeSelector {
            rng: ChaCha8Rng::from_entropy(),
            seed: None,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Select ceil(n/2) distinct indices out of `0..n`, in sampling order.
    pub fn select(&mut self, n: usize) -> Vec<usize> {
        index::sample(&mut self.rng, n, target_size(n)).into_vec()
    }
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self::seeded(Self::DEFAULT_SEED)
    }
}

/// Where a candidate pool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionOrigin {
    /// Every point of the instance
    Full,
    /// Random sample from a [`NodeSelector`]
    Sampled { seed: Option<u64> },
    /// List supplied by the caller
    External,
}

/// Candidate pool handed to the construction heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    nodes: Vec<usize>,
    origin: SelectionOrigin,
}

impl Selection {
    /// Every index of an instance with `n` points.
    pub fn full(n: usize) -> Self {
        Selection {
            nodes: (0..n).collect(),
            origin: SelectionOrigin::Full,
        }
    }

    /// Random subset of size ceil(n/2).
    pub fn sample(n: usize, selector: &mut NodeSelector) -> Self {
        Selection {
            nodes: selector.select(n),
            origin: SelectionOrigin::Sampled {
                seed: selector.seed(),
            },
        }
    }

    /// Externally supplied indices, validated against an instance of `n` points.
    pub fn external(nodes: Vec<usize>, n: usize) -> Result<Self> {
        validate_tour(&nodes, n)?;
        Ok(Selection {
            nodes,
            origin: SelectionOrigin::External,
        })
    }

    /// Read a whitespace-separated index list; tokens that are not indices
    /// are skipped with a warning.
    pub fn from_file<P: AsRef<Path>>(path: P, n: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let nodes = parse_node_list(&text);
        if nodes.is_empty() && !text.trim().is_empty() {
            return Err(Error::invalid_data(format!(
                "{} contains no node indices",
                path.display()
            )));
        }
        Self::external(nodes, n)
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn origin(&self) -> SelectionOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Size of a complete tour built from this pool: ceil(n/2) for the full
    /// index set, the pool size otherwise.
    pub fn target_size(&self) -> usize {
        match self.origin {
            SelectionOrigin::Full => target_size(self.nodes.len()),
            _ => self.nodes.len(),
        }
    }
}

fn parse_node_list(text: &str) -> Vec<usize> {
    text.split_whitespace()
        .filter_map(|token| match token.parse() {
            Ok(node) => Some(node),
            Err(_) => {
                log::warn!("Skipping malformed node index: {:?}", token);
                None
            }
        })
        .collect()
}
