//! Dense integer distance matrix.

use crate::instance::{Instance, Node};

/// An n×n matrix of rounded Euclidean distances stored in row-major order.
///
/// Entries are `round(sqrt(dx² + dy²))` with ties rounded away from zero,
/// so the matrix is symmetric with a zero diagonal. It is built once per
/// instance and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    data: Vec<i64>,
    size: usize,
}

impl DistanceMatrix {
    /// Computes the matrix for every pair of points of an instance.
    pub fn from_instance(instance: &Instance) -> Self {
        Self::from_nodes(&instance.nodes)
    }

    pub fn from_nodes(nodes: &[Node]) -> Self {
        let n = nodes.len();
        let mut data = vec![0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(&nodes[i], &nodes[j]);
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        DistanceMatrix { data, size: n }
    }

    /// Returns the distance between points `from` and `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> i64 {
        self.data[from * self.size + to]
    }

    /// Number of points covered by this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if `get(i, j) == get(j, i)` for every pair.
    pub fn is_symmetric(&self) -> bool {
        (0..self.size).all(|i| ((i + 1)..self.size).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

/// Rounded Euclidean distance; `f64::round` rounds half away from zero.
fn euclidean(a: &Node, b: &Node) -> i64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt().round() as i64
}
