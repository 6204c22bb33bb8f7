// Copyright © 2024 Pathway

use std::collections::BTreeMap;

use log::{debug, warn};
use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::dataset::Dataset;
use super::error::{Error, Result};
use super::subset::{subset_keys, SubsetKey};
use super::tagging::{rows_with_origin, ORIGIN_COLUMN};
use crate::external_integration::{JoinMode, Joiner, Reducer};

/// Joint embeddings of every dataset combination, split per dataset.
///
/// Each entry holds one block per index of its key, in key order; block
/// `i` has as many rows as dataset `key[i]` has samples. All blocks share
/// one column count. Iteration follows key order, which is the order
/// [`subset_keys`] enumerates combinations in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointEmbeddingTable {
    entries: BTreeMap<SubsetKey, Vec<Array2<f64>>>,
}

impl JointEmbeddingTable {
    /// Table from precomputed entries, checked for one block per key index
    /// and a shared column count.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (SubsetKey, Vec<Array2<f64>>)>,
    ) -> Result<Self> {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        let mut width = None;
        for (key, blocks) in &entries {
            if blocks.len() != key.len() {
                return Err(Error::ShapeMismatch {
                    what: "joint embedding blocks",
                    expected: key.len(),
                    actual: blocks.len(),
                });
            }
            for block in blocks {
                let expected = *width.get_or_insert(block.ncols());
                if block.ncols() != expected {
                    return Err(Error::ShapeMismatch {
                        what: "joint embedding components",
                        expected,
                        actual: block.ncols(),
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &SubsetKey) -> Option<&[Array2<f64>]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SubsetKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubsetKey, &Vec<Array2<f64>>)> {
        self.entries.iter()
    }

    /// Shared column count of the blocks, `None` for an empty table.
    pub fn n_components(&self) -> Option<usize> {
        self.entries
            .values()
            .flat_map(|blocks| blocks.first())
            .map(Array2::ncols)
            .next()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointConfig {
    /// Lower bound on the shared joint embedding width. Unset, every entry
    /// is truncated to the narrowest one.
    pub min_components: Option<usize>,
}

/// Computes the per-subset joint embeddings of tagged datasets.
pub struct JointEmbeddingBuilder<'a> {
    joiner: &'a dyn Joiner,
    reducer: &'a dyn Reducer,
    min_components: Option<usize>,
}

impl<'a> JointEmbeddingBuilder<'a> {
    pub fn new(joiner: &'a dyn Joiner, reducer: &'a dyn Reducer) -> Self {
        Self {
            joiner,
            reducer,
            min_components: None,
        }
    }

    /// Fails [`build`](Self::build) instead of truncating the table below
    /// `min_components` columns.
    #[must_use]
    pub fn with_min_components(mut self, min_components: Option<usize>) -> Self {
        self.min_components = min_components;
        self
    }

    /// Joint embedding of the datasets named by `key`, split per dataset.
    ///
    /// `tagged` must carry origin tags, as produced by
    /// [`tag_origin`](super::tagging::tag_origin).
    pub fn build_entry(&self, tagged: &[Dataset], key: &SubsetKey) -> Result<Vec<Array2<f64>>> {
        let selected = key
            .indices()
            .iter()
            .map(|&index| {
                tagged.get(index).ok_or(Error::IndexOutOfRange {
                    index,
                    count: tagged.len(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let joined = self.joiner.join(&selected, JoinMode::Inner)?;
        if joined.n_features() == 0 {
            return Err(Error::EmptyIntersection(key.clone()));
        }
        debug!(
            "subset {key}: {} samples over {} shared features",
            joined.n_samples(),
            joined.n_features()
        );

        let embedding = self.reducer.reduce(joined.matrix())?;
        if embedding.nrows() != joined.n_samples() {
            return Err(Error::ShapeMismatch {
                what: "joint embedding rows",
                expected: joined.n_samples(),
                actual: embedding.nrows(),
            });
        }

        key.indices()
            .iter()
            .zip(&selected)
            .map(|(&index, dataset)| {
                let rows = rows_with_origin(&joined, index)
                    .ok_or_else(|| Error::MissingAnnotation(ORIGIN_COLUMN.to_string()))?;
                if rows.len() != dataset.n_samples() {
                    return Err(Error::RowCountMismatch {
                        key: key.clone(),
                        dataset: index,
                        expected: dataset.n_samples(),
                        actual: rows.len(),
                    });
                }
                Ok(embedding.select(Axis(0), &rows))
            })
            .collect()
    }

    /// Joint embeddings of every combination of two or more datasets.
    ///
    /// Stops at the first combination that fails.
    pub fn build(&self, tagged: &[Dataset]) -> Result<JointEmbeddingTable> {
        let mut entries = BTreeMap::new();
        for key in subset_keys(tagged.len()) {
            let blocks = self.build_entry(tagged, &key)?;
            entries.insert(key, blocks);
        }

        let width = |blocks: &Vec<Array2<f64>>| blocks.first().map_or(0, Array2::ncols);
        let narrowest = entries.iter().min_by_key(|(_, blocks)| width(blocks));
        let widest = entries.values().map(width).max();
        if let (Some((key, blocks)), Some(max)) = (narrowest, widest) {
            let min = width(blocks);
            if let Some(required) = self.min_components.filter(|&required| min < required) {
                return Err(Error::TooFewComponents {
                    key: key.clone(),
                    found: min,
                    required,
                });
            }
            if min < max {
                warn!(
                    "joint embeddings have between {min} and {max} components, keeping {min} \
                     (narrowest subset {key})"
                );
                for block in entries.values_mut().flatten() {
                    *block = block.slice(s![.., ..min]).to_owned();
                }
            }
        }
        Ok(JointEmbeddingTable { entries })
    }
}
