// Copyright © 2024 Pathway

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Reducer;
use crate::engine::error::{Error, Result};
use crate::linalg::{center_columns, exact_svd};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    pub n_components: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self { n_components: 50 }
    }
}

impl PcaConfig {
    /// Components actually computed for an `n_rows x n_cols` matrix.
    ///
    /// A request that cannot be satisfied by the matrix rank falls back to
    /// `min(n_rows, n_cols) - 1` components.
    pub fn effective_components(&self, n_rows: usize, n_cols: usize) -> usize {
        let min_dim = n_rows.min(n_cols);
        if self.n_components >= min_dim {
            min_dim.saturating_sub(1)
        } else {
            self.n_components
        }
    }
}

/// Principal component scores of the rows of column-centred data.
#[derive(Clone, Debug, Default)]
pub struct Pca {
    config: PcaConfig,
}

impl Pca {
    pub fn new(config: PcaConfig) -> Result<Self> {
        if config.n_components == 0 {
            return Err(Error::InvalidConfig(
                "pca n_components must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }
}

impl Reducer for Pca {
    fn reduce(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        let (rows, cols) = matrix.dim();
        let k = self.config.effective_components(rows, cols);
        if k == 0 {
            return Err(Error::RankTooLow { rows, cols });
        }
        let centred = center_columns(&matrix.view());
        Ok(exact_svd(&centred.view(), k)?.scores())
    }
}
