// Copyright © 2024 Pathway

use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseEntry};

use super::error::{Error, Result};

/// Weighted adjacency over `n` nodes, higher weights denoting stronger
/// similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseGraph {
    adjacency: CsrMatrix<f64>,
}

impl SparseGraph {
    pub fn empty(n_nodes: usize) -> Self {
        Self {
            adjacency: CsrMatrix::zeros(n_nodes, n_nodes),
        }
    }

    /// Builds a graph from `(row, col, weight)` triplets; weights of
    /// repeated coordinates are summed.
    pub fn from_triplets(
        n_nodes: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self> {
        let mut coo = CooMatrix::new(n_nodes, n_nodes);
        for (row, col, weight) in triplets {
            if row >= n_nodes || col >= n_nodes {
                return Err(Error::IndexOutOfRange {
                    index: row.max(col),
                    count: n_nodes,
                });
            }
            coo.push(row, col, weight);
        }
        Ok(Self {
            adjacency: CsrMatrix::from(&coo),
        })
    }

    pub fn adjacency(&self) -> &CsrMatrix<f64> {
        &self.adjacency
    }

    pub fn n_nodes(&self) -> usize {
        self.adjacency.nrows()
    }

    pub fn n_edges(&self) -> usize {
        self.adjacency.nnz()
    }

    /// Neighbours of `row` in ascending node order.
    pub fn neighbors(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (offsets, indices, values) = self.adjacency.csr_data();
        let range = offsets[row]..offsets[row + 1];
        indices[range.clone()]
            .iter()
            .copied()
            .zip(values[range].iter().copied())
    }

    /// Weight of the edge `row -> col`, zero when absent.
    pub fn weight(&self, row: usize, col: usize) -> f64 {
        match self.adjacency.get_entry(row, col) {
            Some(SparseEntry::NonZero(weight)) => *weight,
            _ => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.adjacency
            .triplet_iter()
            .map(|(row, col, &weight)| (row, col, weight))
    }

    /// Row sums of the weights.
    pub fn degrees(&self) -> Vec<f64> {
        self.adjacency
            .row_iter()
            .map(|row| row.values().iter().sum())
            .collect()
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.iter()
            .all(|(row, col, weight)| (self.weight(col, row) - weight).abs() <= tolerance)
    }

    /// Relabels nodes: node `i` of `self` becomes node `new_index[i]`.
    pub fn permute(&self, new_index: &[usize]) -> Result<Self> {
        if new_index.len() != self.n_nodes() {
            return Err(Error::ShapeMismatch {
                what: "graph permutation",
                expected: self.n_nodes(),
                actual: new_index.len(),
            });
        }
        Self::from_triplets(
            self.n_nodes(),
            self.iter()
                .map(|(row, col, weight)| (new_index[row], new_index[col], weight)),
        )
    }

    /// Induced subgraph over `nodes`, in the given order.
    pub fn select(&self, nodes: &[usize]) -> Result<Self> {
        let mut position = vec![None; self.n_nodes()];
        for (new, &old) in nodes.iter().enumerate() {
            if old >= self.n_nodes() {
                return Err(Error::IndexOutOfRange {
                    index: old,
                    count: self.n_nodes(),
                });
            }
            position[old] = Some(new);
        }
        Self::from_triplets(
            nodes.len(),
            self.iter().filter_map(|(row, col, weight)| {
                Some((position[row]?, position[col]?, weight))
            }),
        )
    }
}
