// Copyright © 2024 Pathway

//! One-call entry points over the built-in collaborators.

use crate::config::IntegrationConfig;
use crate::engine::batch::{BatchOptions, DimRedFn};
use crate::engine::dataset::Dataset;
use crate::engine::error::Result;
use crate::engine::integration::{Integrator, Preprocessing};
use crate::external_integration::{LsiConfig, TfidfLsi};

/// Computes a TF-IDF + LSI reduction of `dataset.matrix()` and stores it
/// under `X_lsi`.
pub fn tfidf_lsi(dataset: &mut Dataset, config: &LsiConfig) -> Result<()> {
    TfidfLsi::new(config.clone())?.apply(dataset)
}

/// Integrates `datasets` into a new dataset with `X_multimap` and
/// `connectivities`. See [`Integrator::integrate`].
pub fn multimap_integration<S: AsRef<str>>(
    datasets: &[Dataset],
    use_reps: &[S],
    preprocessing: Preprocessing,
    config: &IntegrationConfig,
) -> Result<Dataset> {
    Integrator::from_config(config)?.integrate(datasets, use_reps, preprocessing)
}

/// Integrates the batches of `dataset` in place. See
/// [`Integrator::integrate_batches`].
///
/// Without explicit `options` the `batch` section of `config` is used.
pub fn multimap_batch(
    dataset: &mut Dataset,
    options: Option<&BatchOptions>,
    dimred: Option<&DimRedFn>,
    config: &IntegrationConfig,
) -> Result<()> {
    let options = options.unwrap_or(&config.batch);
    Integrator::from_config(config)?.integrate_batches(dataset, options, dimred)
}
