// Copyright © 2024 Pathway

use log::info;
use ndarray::Array2;

use super::dataset::Dataset;
use super::error::{Error, Result};
use super::joint::JointEmbeddingTable;
use crate::external_integration::{Fusion, FusionOutput, JoinMode, Joiner};

pub const EMBEDDING_KEY: &str = "X_multimap";
pub const CONNECTIVITIES_KEY: &str = "connectivities";

/// Builds the integrated dataset around the fusion routine's output.
pub struct EmbeddingAssembler<'a> {
    joiner: &'a dyn Joiner,
    fusion: &'a dyn Fusion,
}

impl<'a> EmbeddingAssembler<'a> {
    pub fn new(joiner: &'a dyn Joiner, fusion: &'a dyn Fusion) -> Self {
        Self { joiner, fusion }
    }

    /// Outer-joins `datasets` and stores the fused embedding and graph on
    /// the union. `use_reps[i]` names the primary embedding of dataset `i`.
    pub fn assemble<S: AsRef<str>>(
        &self,
        datasets: &[Dataset],
        use_reps: &[S],
        joint: &JointEmbeddingTable,
    ) -> Result<Dataset> {
        if datasets.len() != use_reps.len() {
            return Err(Error::LengthMismatch {
                datasets: datasets.len(),
                reps: use_reps.len(),
            });
        }
        let primaries = primary_embeddings(datasets, use_reps)?;

        let all: Vec<&Dataset> = datasets.iter().collect();
        let mut union = self.joiner.join(&all, JoinMode::Outer)?;

        let FusionOutput {
            embedding,
            connectivities,
        } = self.fusion.fuse(&primaries, joint)?;
        if embedding.nrows() != union.n_samples() {
            return Err(Error::ShapeMismatch {
                what: "fused embedding rows",
                expected: union.n_samples(),
                actual: embedding.nrows(),
            });
        }
        if let Some((row, col, weight)) = connectivities
            .iter()
            .find(|&(_, _, weight)| !(0.0..=1.0).contains(&weight))
        {
            return Err(Error::WeightOutOfRange { row, col, weight });
        }

        info!(
            "integrated {} samples x {} features into {} components",
            union.n_samples(),
            union.n_features(),
            embedding.ncols()
        );
        union.insert_embedding(EMBEDDING_KEY, embedding)?;
        union.insert_graph(CONNECTIVITIES_KEY, connectivities)?;
        Ok(union)
    }
}

/// Primary embedding of every dataset, in dataset order.
fn primary_embeddings<S: AsRef<str>>(
    datasets: &[Dataset],
    use_reps: &[S],
) -> Result<Vec<Array2<f64>>> {
    datasets
        .iter()
        .zip(use_reps)
        .enumerate()
        .map(|(index, (dataset, rep))| {
            dataset
                .embedding(rep.as_ref())
                .cloned()
                .ok_or_else(|| Error::MissingEmbedding {
                    dataset: index,
                    name: rep.as_ref().to_string(),
                })
        })
        .collect()
}
