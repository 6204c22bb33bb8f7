// Copyright © 2024 Pathway

use log::info;
use serde::{Deserialize, Serialize};

use super::assembler::EmbeddingAssembler;
use super::dataset::Dataset;
use super::error::{Error, Result};
use super::joint::{JointEmbeddingBuilder, JointEmbeddingTable};
use super::subset::subset_keys;
use super::tagging::tag_origin;
use crate::config::IntegrationConfig;
use crate::external_integration::{
    FeatureJoin, Fusion, Joiner, MultiGraphFusion, Pca, Reducer, Scaler, StandardScaler,
};

/// State of the input matrices handed to [`Integrator::integrate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// Standardize a working copy of every dataset first.
    #[default]
    Standardize,
    /// Inputs are already normalized (or deliberately left raw) and are
    /// used as they are.
    AlreadyNormalized,
}

/// Runs the joint-embedding pipeline over injected numeric collaborators.
pub struct Integrator {
    scaler: Box<dyn Scaler>,
    reducer: Box<dyn Reducer>,
    joiner: Box<dyn Joiner>,
    fusion: Box<dyn Fusion>,
    min_joint_components: Option<usize>,
}

#[derive(Default)]
pub struct IntegratorBuilder {
    scaler: Option<Box<dyn Scaler>>,
    reducer: Option<Box<dyn Reducer>>,
    joiner: Option<Box<dyn Joiner>>,
    fusion: Option<Box<dyn Fusion>>,
    min_joint_components: Option<usize>,
}

impl IntegratorBuilder {
    #[must_use]
    pub fn scaler(mut self, scaler: Box<dyn Scaler>) -> Self {
        self.scaler = Some(scaler);
        self
    }

    #[must_use]
    pub fn reducer(mut self, reducer: Box<dyn Reducer>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    #[must_use]
    pub fn joiner(mut self, joiner: Box<dyn Joiner>) -> Self {
        self.joiner = Some(joiner);
        self
    }

    #[must_use]
    pub fn fusion(mut self, fusion: Box<dyn Fusion>) -> Self {
        self.fusion = Some(fusion);
        self
    }

    /// See [`JointEmbeddingBuilder::with_min_components`].
    #[must_use]
    pub fn min_joint_components(mut self, min_components: Option<usize>) -> Self {
        self.min_joint_components = min_components;
        self
    }

    pub fn build(self) -> Result<Integrator> {
        Ok(Integrator {
            scaler: self.scaler.ok_or(Error::MissingCollaborator("scaler"))?,
            reducer: self.reducer.ok_or(Error::MissingCollaborator("reducer"))?,
            joiner: self.joiner.ok_or(Error::MissingCollaborator("joiner"))?,
            fusion: self.fusion.ok_or(Error::MissingCollaborator("fusion"))?,
            min_joint_components: self.min_joint_components,
        })
    }
}

impl Integrator {
    pub fn builder() -> IntegratorBuilder {
        IntegratorBuilder::default()
    }

    /// Integrator over the built-in collaborators configured by `config`.
    pub fn from_config(config: &IntegrationConfig) -> Result<Self> {
        config.validate()?;
        Self::builder()
            .scaler(Box::new(StandardScaler::new(config.scaler.clone())?))
            .reducer(Box::new(Pca::new(config.pca.clone())?))
            .joiner(Box::new(FeatureJoin::new(config.join.clone())))
            .fusion(Box::new(MultiGraphFusion::new(config.fusion.clone())?))
            .min_joint_components(config.joint.min_components)
            .build()
    }

    pub fn reducer(&self) -> &dyn Reducer {
        self.reducer.as_ref()
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    /// Scaled (if requested) and origin-tagged working copies of `datasets`.
    pub fn prepare(
        &self,
        datasets: &[Dataset],
        preprocessing: Preprocessing,
    ) -> Result<Vec<Dataset>> {
        datasets
            .iter()
            .enumerate()
            .map(|(index, dataset)| {
                let working = match preprocessing {
                    Preprocessing::Standardize => {
                        let scaled = self.scaler.scale(dataset.matrix())?;
                        dataset.clone().with_matrix(scaled)?
                    }
                    Preprocessing::AlreadyNormalized => dataset.clone(),
                };
                tag_origin(&working, index)
            })
            .collect()
    }

    /// Joint embeddings of every dataset combination of `tagged`.
    pub fn joint_embeddings(&self, tagged: &[Dataset]) -> Result<JointEmbeddingTable> {
        JointEmbeddingBuilder::new(self.joiner.as_ref(), self.reducer.as_ref())
            .with_min_components(self.min_joint_components)
            .build(tagged)
    }

    /// Integrates `datasets` into one dataset carrying `X_multimap` and
    /// `connectivities`. `use_reps[i]` names the precomputed embedding that
    /// represents dataset `i`. The inputs are not modified.
    pub fn integrate<S: AsRef<str>>(
        &self,
        datasets: &[Dataset],
        use_reps: &[S],
        preprocessing: Preprocessing,
    ) -> Result<Dataset> {
        if datasets.len() < 2 {
            return Err(Error::TooFewDatasets(datasets.len()));
        }
        if datasets.len() != use_reps.len() {
            return Err(Error::LengthMismatch {
                datasets: datasets.len(),
                reps: use_reps.len(),
            });
        }
        for (index, (dataset, rep)) in datasets.iter().zip(use_reps).enumerate() {
            if dataset.embedding(rep.as_ref()).is_none() {
                return Err(Error::MissingEmbedding {
                    dataset: index,
                    name: rep.as_ref().to_string(),
                });
            }
        }

        info!(
            "integrating {} datasets over {} subsets ({preprocessing:?})",
            datasets.len(),
            subset_keys(datasets.len()).len()
        );
        let tagged = self.prepare(datasets, preprocessing)?;
        let joint = self.joint_embeddings(&tagged)?;
        drop(tagged);

        EmbeddingAssembler::new(self.joiner.as_ref(), self.fusion.as_ref())
            .assemble(datasets, use_reps, &joint)
    }
}
