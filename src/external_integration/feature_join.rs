// Copyright © 2024 Pathway

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{JoinMode, Joiner};
use crate::engine::dataset::{Annotations, Dataset};
use crate::engine::error::{Error, Result};
use crate::engine::value::AnnotationValue;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Value of matrix cells introduced by an outer join, NaN when unset.
    pub fill_value: Option<f64>,
}

/// Row-wise concatenation with intersection or union of the feature axis.
///
/// Embeddings are carried over when every input has one under the same
/// name and width; graphs are never carried.
#[derive(Clone, Debug, Default)]
pub struct FeatureJoin {
    config: JoinConfig,
}

fn joined_names<'a>(
    mut names: impl Iterator<Item = Vec<&'a str>>,
    mode: JoinMode,
) -> IndexSet<&'a str> {
    match mode {
        JoinMode::Outer => names.flatten().collect(),
        JoinMode::Inner => {
            let Some(first) = names.next() else {
                return IndexSet::new();
            };
            let rest: Vec<HashSet<&str>> = names.map(|n| n.into_iter().collect()).collect();
            first
                .into_iter()
                .filter(|name| rest.iter().all(|other| other.contains(name)))
                .collect()
        }
    }
}

impl FeatureJoin {
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    fn join_matrices(&self, datasets: &[&Dataset], features: &IndexSet<&str>) -> Array2<f64> {
        let total_rows = datasets.iter().map(|d| d.n_samples()).sum();
        let mut matrix = Array2::from_elem(
            (total_rows, features.len()),
            self.config.fill_value.unwrap_or(f64::NAN),
        );
        let mut offset = 0;
        for dataset in datasets {
            let positions: HashMap<&str, usize> = dataset
                .feature_names()
                .iter()
                .enumerate()
                .map(|(col, name)| (name.as_str(), col))
                .collect();
            for (target, name) in features.iter().enumerate() {
                if let Some(&source) = positions.get(name) {
                    for row in 0..dataset.n_samples() {
                        matrix[[offset + row, target]] = dataset.matrix()[[row, source]];
                    }
                }
            }
            offset += dataset.n_samples();
        }
        matrix
    }

    fn join_annotations(
        datasets: &[&Dataset],
        mode: JoinMode,
        total_rows: usize,
    ) -> Result<Annotations> {
        let columns = joined_names(
            datasets
                .iter()
                .map(|d| d.annotations().column_names().collect_vec()),
            mode,
        );
        let mut annotations = Annotations::new(total_rows);
        for name in columns {
            let values = datasets
                .iter()
                .flat_map(|d| match d.annotations().column(name) {
                    Some(values) => values.to_vec(),
                    None => vec![AnnotationValue::Missing; d.n_samples()],
                })
                .collect();
            annotations.insert(name, values)?;
        }
        Ok(annotations)
    }

    fn join_embeddings(datasets: &[&Dataset]) -> Result<IndexMap<String, Array2<f64>>> {
        let (first, rest) = datasets.split_first().ok_or(Error::EmptyJoin)?;
        let mut embeddings = IndexMap::new();
        for (name, embedding) in first.embeddings() {
            let mut parts: Vec<ArrayView2<f64>> = vec![embedding.view()];
            for dataset in rest {
                match dataset.embedding(name) {
                    Some(other) if other.ncols() == embedding.ncols() => parts.push(other.view()),
                    _ => break,
                }
            }
            if parts.len() == datasets.len() {
                embeddings.insert(name.to_string(), concatenate(Axis(0), &parts)?);
            }
        }
        Ok(embeddings)
    }
}

impl Joiner for FeatureJoin {
    fn join(&self, datasets: &[&Dataset], mode: JoinMode) -> Result<Dataset> {
        if datasets.is_empty() {
            return Err(Error::EmptyJoin);
        }
        let features = joined_names(
            datasets.iter().map(|d| {
                d.feature_names()
                    .iter()
                    .map(String::as_str)
                    .collect_vec()
            }),
            mode,
        );
        let matrix = self.join_matrices(datasets, &features);
        let annotations = Self::join_annotations(datasets, mode, matrix.nrows())?;
        let embeddings = Self::join_embeddings(datasets)?;
        let sample_names = datasets
            .iter()
            .flat_map(|d| d.sample_names().iter().cloned())
            .collect();
        let feature_names = features.into_iter().map(str::to_string).collect();
        Ok(Dataset::from_parts(
            matrix,
            sample_names,
            feature_names,
            annotations,
            embeddings,
        ))
    }
}
