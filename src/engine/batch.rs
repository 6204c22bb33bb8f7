// Copyright © 2024 Pathway

use std::collections::BTreeMap;

use log::{debug, info};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::assembler::{CONNECTIVITIES_KEY, EMBEDDING_KEY};
use super::dataset::Dataset;
use super::error::{Error, Result};
use super::integration::{Integrator, Preprocessing};
use super::value::AnnotationValue;

/// Per-partition dimensionality reduction used by
/// [`Integrator::integrate_batches`].
pub type DimRedFn<'a> = dyn Fn(&Dataset) -> Result<Array2<f64>> + 'a;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Categorical annotation column defining the partitions.
    pub batch_key: String,
    pub preprocessing: Preprocessing,
    /// Embedding name the per-partition reduction is stored under.
    pub rep_name: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_key: "batch".to_string(),
            preprocessing: Preprocessing::Standardize,
            rep_name: "X_pca".to_string(),
        }
    }
}

/// Row positions of every distinct value of `column`, values sorted.
fn partition_rows(
    dataset: &Dataset,
    column: &str,
) -> Result<BTreeMap<AnnotationValue, Vec<usize>>> {
    let labels = dataset
        .annotations()
        .column(column)
        .ok_or_else(|| Error::MissingAnnotation(column.to_string()))?;
    let mut partitions: BTreeMap<AnnotationValue, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.iter().enumerate() {
        partitions.entry(label.clone()).or_default().push(row);
    }
    if partitions.len() < 2 {
        return Err(Error::TooFewCategories {
            column: column.to_string(),
            found: partitions.len(),
        });
    }
    Ok(partitions)
}

impl Integrator {
    /// Integrates the partitions of one dataset defined by
    /// `options.batch_key`, then stores `X_multimap` and `connectivities`
    /// on `dataset` itself.
    ///
    /// `dimred` defaults to the integrator's reducer. `dataset` is only
    /// written to once the whole integration has succeeded, and row `i` of
    /// the stored embedding describes sample `i` of `dataset`.
    pub fn integrate_batches(
        &self,
        dataset: &mut Dataset,
        options: &BatchOptions,
        dimred: Option<&DimRedFn>,
    ) -> Result<()> {
        let partitions = partition_rows(dataset, &options.batch_key)?;
        info!(
            "integrating {} batches of {:?}",
            partitions.len(),
            options.batch_key
        );

        let mut parts = Vec::with_capacity(partitions.len());
        let mut order = Vec::with_capacity(dataset.n_samples());
        for (label, rows) in &partitions {
            debug!("batch {label}: {} samples", rows.len());
            let mut part = dataset.select_samples(rows)?;
            if options.preprocessing == Preprocessing::Standardize {
                let scaled = self.scaler().scale(part.matrix())?;
                part = part.with_matrix(scaled)?;
            }
            let reduced = match dimred {
                Some(dimred) => dimred(&part)?,
                None => self.reducer().reduce(part.matrix())?,
            };
            part.insert_embedding(options.rep_name.as_str(), reduced)?;
            parts.push(part);
            order.extend_from_slice(rows);
        }

        let use_reps = vec![options.rep_name.as_str(); parts.len()];
        let integrated = self.integrate(&parts, &use_reps, Preprocessing::AlreadyNormalized)?;

        let embedding = integrated
            .embedding(EMBEDDING_KEY)
            .ok_or_else(|| Error::MissingEmbedding {
                dataset: 0,
                name: EMBEDDING_KEY.to_string(),
            })?;
        let graph = integrated
            .graph(CONNECTIVITIES_KEY)
            .ok_or_else(|| Error::MissingAnnotation(CONNECTIVITIES_KEY.to_string()))?;

        // `order[j]` is the input row of integrated row `j`
        let mut inverse = vec![0; order.len()];
        for (position, &row) in order.iter().enumerate() {
            inverse[row] = position;
        }
        let embedding = embedding.select(Axis(0), &inverse);
        let graph = graph.permute(&order)?;

        dataset.insert_embedding(EMBEDDING_KEY, embedding)?;
        dataset.insert_graph(CONNECTIVITIES_KEY, graph)?;
        Ok(())
    }
}
