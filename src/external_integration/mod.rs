// Copyright © 2024 Pathway
pub mod brute_force_knn_integration;
pub mod feature_join;
pub mod multigraph_fusion;
pub mod pca;
pub mod standard_scaler;
pub mod tfidf_lsi;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::engine::dataset::Dataset;
use crate::engine::error::Result;
use crate::engine::graph::SparseGraph;
use crate::engine::joint::JointEmbeddingTable;

pub use brute_force_knn_integration::{BruteForceKnnIndex, KnnMetricKind};
pub use feature_join::{FeatureJoin, JoinConfig};
pub use multigraph_fusion::{FusionParams, MultiGraphFusion};
pub use pca::{Pca, PcaConfig};
pub use standard_scaler::{ScalerConfig, StandardScaler};
pub use tfidf_lsi::{LsiConfig, TfidfLsi};

/// Feature-axis combination mode for [`Joiner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    Inner,
    Outer,
}

/// Dimensionality reduction of a samples x features matrix.
pub trait Reducer {
    /// Returns a matrix with one row per input row and a fixed width.
    fn reduce(&self, matrix: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Per-feature standardisation. Purely local to one matrix.
pub trait Scaler {
    fn scale(&self, matrix: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Stacks datasets row-wise, combining the feature axes according to `mode`.
///
/// Row order of the result is the input order, datasets first to last.
/// Annotation columns are combined with the same mode so a column present
/// in every input (such as the origin tag) survives both joins.
pub trait Joiner {
    fn join(&self, datasets: &[&Dataset], mode: JoinMode) -> Result<Dataset>;
}

#[derive(Clone, Debug)]
pub struct FusionOutput {
    pub embedding: Array2<f64>,
    pub connectivities: SparseGraph,
}

/// Merges per-dataset and joint embeddings into one embedding and graph.
///
/// Output rows follow the outer-join order: dataset 0 rows first, then
/// dataset 1, and so on. Graph weights lie in `[0, 1]`, 1 being the
/// strongest similarity.
pub trait Fusion {
    fn fuse(
        &self,
        primary_embeddings: &[Array2<f64>],
        joint: &JointEmbeddingTable,
    ) -> Result<FusionOutput>;
}
