// Copyright © 2024 Pathway

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::Scaler;
use crate::engine::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    /// Clip standardized values to `[-max_value, max_value]`.
    pub max_value: Option<f64>,
}

/// Zero mean, unit (unbiased) variance per feature.
///
/// Constant features are only centred.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    config: ScalerConfig,
}

impl StandardScaler {
    pub fn new(config: ScalerConfig) -> Result<Self> {
        if let Some(max_value) = config.max_value {
            if !(max_value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "scaler max_value must be positive, got {max_value}"
                )));
            }
        }
        Ok(Self { config })
    }
}

impl Scaler for StandardScaler {
    fn scale(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        let n = matrix.nrows();
        let Some(mean) = matrix.mean_axis(Axis(0)) else {
            return Ok(matrix.clone());
        };
        let ddof = if n > 1 { 1.0 } else { 0.0 };
        let std = matrix.var_axis(Axis(0), ddof).mapv(|var| {
            let std = var.sqrt();
            if std == 0.0 {
                1.0
            } else {
                std
            }
        });

        let mut scaled = (matrix - &mean) / &std;
        if let Some(max_value) = self.config.max_value {
            scaled.mapv_inplace(|x| x.clamp(-max_value, max_value));
        }
        Ok(scaled)
    }
}
