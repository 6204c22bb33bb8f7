// Copyright © 2024 Pathway

use std::collections::BTreeMap;

use log::debug;
use nalgebra::DMatrix;
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::brute_force_knn_integration::{BruteForceKnnIndex, KnnMetricKind, Neighbor};
use super::{Fusion, FusionOutput};
use crate::engine::error::{Error, Result};
use crate::engine::graph::SparseGraph;
use crate::engine::joint::JointEmbeddingTable;
use crate::linalg::{symmetric_eigen, to_array};

const SIGMA_SEARCH_STEPS: usize = 64;
const SIGMA_TOLERANCE: f64 = 1e-5;
const LAYOUT_EXTENT: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    pub n_neighbors: usize,
    pub n_components: usize,
    pub metric: KnnMetricKind,
    pub random_state: u64,
    /// Subspace iterations of the spectral layout.
    pub n_epochs: usize,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            n_components: 2,
            metric: KnnMetricKind::L2,
            random_state: 0,
            n_epochs: 200,
        }
    }
}

/// Fuzzy neighbour graphs of every primary and joint embedding, merged by
/// fuzzy union and laid out spectrally.
#[derive(Clone, Debug, Default)]
pub struct MultiGraphFusion {
    params: FusionParams,
}

/// Edge weights accumulated under the fuzzy union `a + b - ab`.
#[derive(Default)]
struct FuzzyUnion {
    weights: BTreeMap<(usize, usize), f64>,
}

impl FuzzyUnion {
    fn add(&mut self, row: usize, col: usize, weight: f64) {
        if row == col {
            return;
        }
        let entry = self.weights.entry((row, col)).or_insert(0.0);
        *entry = (*entry + weight - *entry * weight).clamp(0.0, 1.0);
    }

    fn into_graph(self, n_nodes: usize) -> Result<SparseGraph> {
        SparseGraph::from_triplets(
            n_nodes,
            self.weights
                .into_iter()
                .map(|((row, col), weight)| (row, col, weight)),
        )
    }
}

impl MultiGraphFusion {
    pub fn new(params: FusionParams) -> Result<Self> {
        if params.n_neighbors == 0 || params.n_components == 0 {
            return Err(Error::InvalidConfig(
                "fusion n_neighbors and n_components must be positive".to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &FusionParams {
        &self.params
    }

    /// Symmetric fuzzy neighbour graph of `points`, with node `i` reported
    /// as `global[i]`.
    fn add_fuzzy_graph(
        &self,
        points: &ArrayView2<f64>,
        global: &[usize],
        union: &mut FuzzyUnion,
    ) {
        let index = BruteForceKnnIndex::new(points.view(), self.params.metric);
        let neighbors = index.self_neighbors(self.params.n_neighbors);

        let mut local = FuzzyUnion::default();
        for (row, row_neighbors) in neighbors.iter().enumerate() {
            for (col, weight) in membership_strengths(row_neighbors) {
                local.add(row, col, weight);
            }
        }
        let directed = local.weights;
        for (&(row, col), &weight) in &directed {
            let reverse = directed.get(&(col, row)).copied();
            if reverse.is_some() && col < row {
                continue;
            }
            let reverse = reverse.unwrap_or(0.0);
            let symmetric = weight + reverse - weight * reverse;
            union.add(global[row], global[col], symmetric);
            union.add(global[col], global[row], symmetric);
        }
    }

    fn spectral_layout(&self, graph: &SparseGraph) -> Result<Array2<f64>> {
        let n = graph.n_nodes();
        let dims = self.params.n_components;
        let mut layout = Array2::zeros((n, dims));
        let width = (dims + 1).min(n);
        if width == 0 {
            return Ok(layout);
        }

        let inv_sqrt_degree: Vec<f64> = graph
            .degrees()
            .into_iter()
            .map(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        let normalized = SparseGraph::from_triplets(
            n,
            graph.iter().map(|(row, col, weight)| {
                (row, col, weight * inv_sqrt_degree[row] * inv_sqrt_degree[col])
            }),
        )?;
        // (I + D^-1/2 W D^-1/2) / 2, eigenvalues within [0, 1]
        let apply = |x: &DMatrix<f64>| (x + normalized.adjacency() * x) * 0.5;

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let start = DMatrix::from_fn(n, width, |_, _| rng.random_range(-1.0..1.0));
        let mut basis = start.qr().q();
        for _ in 0..self.params.n_epochs {
            basis = apply(&basis).qr().q();
        }
        let projected = basis.transpose() * apply(&basis);
        let projected = (&projected + projected.transpose()) * 0.5;
        let (_, rotation) = symmetric_eigen(&to_array(&projected).view())?;
        let eigenvectors = to_array(&basis).dot(&rotation);

        // the leading eigenvector only encodes node degrees
        let informative = eigenvectors.slice(s![.., 1..]);
        let extent = informative.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        if extent > 0.0 {
            layout
                .slice_mut(s![.., ..informative.ncols()])
                .assign(&informative.mapv(|x| x * LAYOUT_EXTENT / extent));
        }
        Ok(layout)
    }
}

/// Smooth kNN membership strengths of one row's neighbours, in `(0, 1]`.
fn membership_strengths(neighbors: &[Neighbor]) -> Vec<(usize, f64)> {
    let Some(first) = neighbors.first() else {
        return Vec::new();
    };
    let rho = neighbors
        .iter()
        .map(|n| n.distance)
        .find(|&d| d > 0.0)
        .unwrap_or(first.distance);
    #[allow(clippy::cast_precision_loss)]
    let target = ((neighbors.len() + 1) as f64).log2();
    let mass = |sigma: f64| -> f64 {
        neighbors
            .iter()
            .map(|n| (-(n.distance - rho).max(0.0) / sigma).exp())
            .sum()
    };

    let (mut low, mut high, mut sigma) = (0.0, f64::INFINITY, 1.0);
    for _ in 0..SIGMA_SEARCH_STEPS {
        let current = mass(sigma);
        if (current - target).abs() < SIGMA_TOLERANCE {
            break;
        }
        if current > target {
            high = sigma;
            sigma = (low + high) / 2.0;
        } else {
            low = sigma;
            sigma = if high.is_finite() {
                (low + high) / 2.0
            } else {
                sigma * 2.0
            };
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let mean_distance =
        neighbors.iter().map(|n| n.distance).sum::<f64>() / neighbors.len() as f64;
    let sigma = sigma.max(1e-3 * mean_distance).max(f64::MIN_POSITIVE);

    neighbors
        .iter()
        .map(|n| {
            let weight = (-(n.distance - rho).max(0.0) / sigma).exp();
            (n.index, weight.clamp(0.0, 1.0))
        })
        .collect()
}

impl Fusion for MultiGraphFusion {
    fn fuse(
        &self,
        primary_embeddings: &[Array2<f64>],
        joint: &JointEmbeddingTable,
    ) -> Result<FusionOutput> {
        let mut offsets = Vec::with_capacity(primary_embeddings.len());
        let mut total = 0;
        for embedding in primary_embeddings {
            offsets.push(total);
            total += embedding.nrows();
        }

        let mut union = FuzzyUnion::default();
        for (embedding, &offset) in primary_embeddings.iter().zip(&offsets) {
            let global: Vec<usize> = (offset..offset + embedding.nrows()).collect();
            self.add_fuzzy_graph(&embedding.view(), &global, &mut union);
        }

        for (key, blocks) in joint.iter() {
            let mut global = Vec::new();
            for (&dataset, block) in key.indices().iter().zip(blocks) {
                let Some(primary) = primary_embeddings.get(dataset) else {
                    return Err(Error::IndexOutOfRange {
                        index: dataset,
                        count: primary_embeddings.len(),
                    });
                };
                if block.nrows() != primary.nrows() {
                    return Err(Error::RowCountMismatch {
                        key: key.clone(),
                        dataset,
                        expected: primary.nrows(),
                        actual: block.nrows(),
                    });
                }
                global.extend(offsets[dataset]..offsets[dataset] + block.nrows());
            }
            let views: Vec<ArrayView2<f64>> = blocks.iter().map(Array2::view).collect();
            let stacked = concatenate(Axis(0), &views)?;
            self.add_fuzzy_graph(&stacked.view(), &global, &mut union);
        }

        let connectivities = union.into_graph(total)?;
        debug!(
            "fused graph over {total} samples with {} edges",
            connectivities.n_edges()
        );
        let embedding = self.spectral_layout(&connectivities)?;
        Ok(FusionOutput {
            embedding,
            connectivities,
        })
    }
}
