// Copyright © 2024 Pathway

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::batch::BatchOptions;
use crate::engine::error::{Error, Result};
use crate::engine::joint::JointConfig;
use crate::env::{
    override_from_env, N_COMPONENTS_VAR, N_NEIGHBORS_VAR, N_PCS_VAR,
    RANDOM_STATE_VAR,
};
use crate::external_integration::{FusionParams, JoinConfig, PcaConfig, ScalerConfig};

/// Settings of the built-in collaborators and of batch integration.
///
/// Every section may be omitted from a configuration file, missing values
/// take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    pub pca: PcaConfig,
    pub scaler: ScalerConfig,
    pub join: JoinConfig,
    pub joint: JointConfig,
    pub fusion: FusionParams,
    pub batch: BatchOptions,
}

impl IntegrationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!("loaded integration config from {}", path.display());
        Ok(config)
    }

    /// Applies the `MULTIMAP_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        override_from_env(N_PCS_VAR, &mut self.pca.n_components)?;
        override_from_env(N_NEIGHBORS_VAR, &mut self.fusion.n_neighbors)?;
        override_from_env(N_COMPONENTS_VAR, &mut self.fusion.n_components)?;
        override_from_env(RANDOM_STATE_VAR, &mut self.fusion.random_state)?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pca.n_components == 0 {
            return Err(Error::InvalidConfig(
                "pca.n_components must be positive".to_string(),
            ));
        }
        if self.fusion.n_neighbors == 0 {
            return Err(Error::InvalidConfig(
                "fusion.n_neighbors must be positive".to_string(),
            ));
        }
        if self.fusion.n_components == 0 {
            return Err(Error::InvalidConfig(
                "fusion.n_components must be positive".to_string(),
            ));
        }
        if self.joint.min_components == Some(0) {
            return Err(Error::InvalidConfig(
                "joint.min_components must be positive when set".to_string(),
            ));
        }
        if self.batch.batch_key.is_empty() || self.batch.rep_name.is_empty() {
            return Err(Error::InvalidConfig(
                "batch.batch_key and batch.rep_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
