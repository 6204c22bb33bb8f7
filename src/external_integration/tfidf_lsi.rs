// Copyright © 2024 Pathway

use ndarray::{s, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::Reducer;
use crate::engine::dataset::Dataset;
use crate::engine::error::{Error, Result};
use crate::linalg::{randomized_svd, RandomizedSvdConfig};

pub const LSI_EMBEDDING: &str = "X_lsi";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LsiConfig {
    pub n_components: usize,
    pub binarize: bool,
    pub random_state: u64,
    /// The leading LSI component mostly tracks sequencing depth.
    pub drop_first_component: bool,
}

impl Default for LsiConfig {
    fn default() -> Self {
        Self {
            n_components: 50,
            binarize: true,
            random_state: 0,
            drop_first_component: true,
        }
    }
}

/// Latent semantic indexing over a TF-IDF transform of count data.
#[derive(Clone, Debug, Default)]
pub struct TfidfLsi {
    config: LsiConfig,
}

impl TfidfLsi {
    pub fn new(config: LsiConfig) -> Result<Self> {
        if config.n_components == 0 {
            return Err(Error::InvalidConfig(
                "lsi n_components must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Stores the LSI embedding of `dataset` under [`LSI_EMBEDDING`].
    pub fn apply(&self, dataset: &mut Dataset) -> Result<()> {
        let embedding = self.reduce(dataset.matrix())?;
        dataset.insert_embedding(LSI_EMBEDDING, embedding)
    }
}

/// Sublinear TF, smoothed IDF, L2-normalized rows.
#[allow(clippy::cast_precision_loss)]
pub fn tfidf(counts: &Array2<f64>, binarize: bool) -> Array2<f64> {
    let mut tf = if binarize {
        counts.mapv(|x| x.min(1.0))
    } else {
        counts.clone()
    };

    let n = tf.nrows() as f64;
    let idf: Vec<f64> = tf
        .axis_iter(Axis(1))
        .map(|column| {
            let df = column.iter().filter(|&&x| x != 0.0).count() as f64;
            ((1.0 + n) / (1.0 + df)).ln() + 1.0
        })
        .collect();

    for mut row in tf.axis_iter_mut(Axis(0)) {
        for (x, weight) in row.iter_mut().zip(&idf) {
            if *x > 0.0 {
                *x = (1.0 + x.ln()) * weight;
            } else {
                *x *= weight;
            }
        }
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|x| x / norm);
        }
    }
    tf
}

impl Reducer for TfidfLsi {
    fn reduce(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        let (rows, cols) = matrix.dim();
        let skip = usize::from(self.config.drop_first_component);
        let k = (self.config.n_components + skip).min(rows.min(cols));
        if k <= skip {
            return Err(Error::RankTooLow { rows, cols });
        }
        let normed = tfidf(matrix, self.config.binarize);
        let svd_config = RandomizedSvdConfig {
            random_state: self.config.random_state,
            ..RandomizedSvdConfig::default()
        };
        let scores = randomized_svd(&normed.view(), k, &svd_config)?.scores();
        Ok(scores.slice(s![.., skip..]).to_owned())
    }
}
