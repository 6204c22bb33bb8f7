// Copyright © 2024 Pathway

use itertools::Itertools;
use ndarray::{s, Array2, ArrayView2, Axis};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::max;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnnMetricKind {
    #[default]
    L2,
    Cos,
}

/// A neighbour of a query row: its row index and distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Exhaustive nearest-neighbour search over the rows of a dense matrix.
pub struct BruteForceKnnIndex<'a> {
    points: ArrayView2<'a, f64>,
    sq_norms: Vec<f64>,
    auxiliary_space: usize,
    metric: KnnMetricKind,
}

const DEFAULT_AUXILIARY_SPACE: usize = 1 << 20;

impl<'a> BruteForceKnnIndex<'a> {
    pub fn new(points: ArrayView2<'a, f64>, metric: KnnMetricKind) -> Self {
        let sq_norms = points
            .axis_iter(Axis(0))
            .map(|row| row.dot(&row))
            .collect();
        Self {
            points,
            sq_norms,
            auxiliary_space: DEFAULT_AUXILIARY_SPACE,
            metric,
        }
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    fn fill_distances(&self, first_query: usize, dot_p: &mut Array2<f64>) {
        match self.metric {
            KnnMetricKind::L2 => fill_l2_distances(&self.sq_norms, first_query, dot_p),
            KnnMetricKind::Cos => fill_cos_distances(&self.sq_norms, first_query, dot_p),
        }
    }

    /// The `k` nearest other rows of every indexed row, closest first.
    ///
    /// A row is never its own neighbour; `k` is capped at `len() - 1`.
    pub fn self_neighbors(&self, k: usize) -> Vec<Vec<Neighbor>> {
        let n = self.len();
        let k = k.min(n.saturating_sub(1));
        if k == 0 {
            return vec![Vec::new(); n];
        }

        let batch_size = max(1, self.auxiliary_space / n);
        let batches: Vec<usize> = (0..n).step_by(batch_size).collect();
        batches
            .into_par_iter()
            .flat_map_iter(|start| {
                let end = (start + batch_size).min(n);
                let queries = self.points.slice(s![start..end, ..]);
                let mut dot_p = self.points.dot(&queries.t());
                self.fill_distances(start, &mut dot_p);
                dot_p
                    .axis_iter(Axis(1))
                    .enumerate()
                    .map(|(offset, col)| {
                        let query = start + offset;
                        col.iter()
                            .enumerate()
                            .filter(|(idx, _)| *idx != query)
                            .map(|(idx, x)| (OrderedFloat::from(*x), idx)) //order by distance
                            .k_smallest(k)
                            .map(|(distance, index)| Neighbor {
                                index,
                                distance: distance.into_inner(),
                            })
                            .collect()
                    })
                    .collect_vec()
            })
            .collect()
    }
}

fn fill_cos_distances(sq_norms: &[f64], first_query: usize, dot_p: &mut Array2<f64>) {
    for (i, mut row) in dot_p.axis_iter_mut(Axis(0)).enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            let norms = (sq_norms[i] * sq_norms[first_query + j]).sqrt();
            *entry = if norms > 0.0 {
                1.0 - *entry / norms
            } else {
                1.0
            };
        }
    }
}

fn fill_l2_distances(sq_norms: &[f64], first_query: usize, dot_p: &mut Array2<f64>) {
    for (i, mut row) in dot_p.axis_iter_mut(Axis(0)).enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            let sq = sq_norms[i] + sq_norms[first_query + j] - 2.0 * (*entry);
            *entry = sq.max(0.0).sqrt();
        }
    }
}
