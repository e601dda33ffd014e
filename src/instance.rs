//! Module for parsing and representing node-cost TSP instances.
//!
//! An instance is a list of points with integer planar coordinates and a
//! non-negative visiting cost. Dataset files hold one `x;y;cost` record per
//! line and the line order defines the point index. Malformed records are
//! skipped with a warning instead of aborting the load.

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::selection::target_size;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A point of the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable index into the instance (0-indexed, file order)
    pub id: usize,
    /// X coordinate
    pub x: i64,
    /// Y coordinate
    pub y: i64,
    /// Visiting cost, charged once when the tour enters this point
    pub cost: i64,
}

impl Node {
    pub fn new(id: usize, x: i64, y: i64, cost: i64) -> Self {
        Node { id, x, y, cost }
    }
}

/// The immutable point set of one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Dataset name (file stem when loaded from disk)
    pub name: String,
    /// Points, indexed by `Node::id`
    pub nodes: Vec<Node>,
}

impl Instance {
    /// Build an instance from `(x, y, cost)` triples; ids follow slice order.
    pub fn new(name: impl Into<String>, points: &[(i64, i64, i64)]) -> Self {
        let nodes = points
            .iter()
            .enumerate()
            .map(|(id, &(x, y, cost))| Node::new(id, x, y, cost))
            .collect();

        Instance {
            name: name.into(),
            nodes,
        }
    }

    /// Load a `;`-delimited dataset file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let instance = Self::from_reader(name, file)?;
        log::info!(
            "Loaded {} points from {}",
            instance.len(),
            path.display()
        );
        Ok(instance)
    }

    /// Parse `x;y;cost` records from any reader.
    ///
    /// Records with fewer than three fields, non-integer fields or a negative
    /// cost are skipped with a warning. Only I/O failures abort the load.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut nodes = Vec::new();
        for record in rdr.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    log::warn!("{}: skipping unreadable record: {}", name, e);
                    continue;
                }
            };

            match parse_record(&record) {
                Some((x, y, cost)) => nodes.push(Node::new(nodes.len(), x, y, cost)),
                None => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    log::warn!(
                        "{}: skipping malformed line {}: {:?}",
                        name,
                        line,
                        record.iter().collect::<Vec<_>>().join(";")
                    );
                }
            }
        }

        Ok(Instance { name, nodes })
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visiting cost of a point
    #[inline]
    pub fn cost(&self, i: usize) -> i64 {
        self.nodes[i].cost
    }

    /// Tour size k = ceil(n / 2)
    pub fn target_size(&self) -> usize {
        target_size(self.len())
    }

    /// Get statistics about the instance
    pub fn statistics(&self, distances: &DistanceMatrix) -> InstanceStatistics {
        let n = self.len();

        let min_x = self.nodes.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = self.nodes.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = self.nodes.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = self.nodes.iter().map(|p| p.y).max().unwrap_or(0);
        let min_cost = self.nodes.iter().map(|p| p.cost).min().unwrap_or(0);
        let max_cost = self.nodes.iter().map(|p| p.cost).max().unwrap_or(0);
        let total_cost: i64 = self.nodes.iter().map(|p| p.cost).sum();
        let avg_cost = if n > 0 { total_cost as f64 / n as f64 } else { 0.0 };

        let mut pairs = 0usize;
        let mut sum_distance = 0i64;
        let mut max_distance = 0i64;
        for i in 0..n {
            for j in i + 1..n {
                let d = distances.get(i, j);
                sum_distance += d;
                max_distance = max_distance.max(d);
                pairs += 1;
            }
        }
        let avg_distance = if pairs > 0 {
            sum_distance as f64 / pairs as f64
        } else {
            0.0
        };

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            target: self.target_size(),
            bounds: (min_x, max_x, min_y, max_y),
            min_cost,
            max_cost,
            avg_cost,
            avg_distance,
            max_distance,
        }
    }
}

fn parse_record(record: &StringRecord) -> Option<(i64, i64, i64)> {
    if record.len() < 3 {
        return None;
    }
    let x = record.get(0)?.parse().ok()?;
    let y = record.get(1)?.parse().ok()?;
    let cost: i64 = record.get(2)?.parse().ok()?;
    if cost < 0 {
        return None;
    }
    Some((x, y, cost))
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub target: usize,
    /// (min_x, max_x, min_y, max_y)
    pub bounds: (i64, i64, i64, i64),
    pub min_cost: i64,
    pub max_cost: i64,
    pub avg_cost: f64,
    pub avg_distance: f64,
    pub max_distance: i64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (min_x, max_x, min_y, max_y) = self.bounds;
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Points: {} (tour size k = {})", self.dimension, self.target)?;
        writeln!(f, "  X range: [{}, {}]", min_x, max_x)?;
        writeln!(f, "  Y range: [{}, {}]", min_y, max_y)?;
        writeln!(
            f,
            "  Visiting cost: min {}, max {}, avg {:.2}",
            self.min_cost, self.max_cost, self.avg_cost
        )?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)
    }
}
