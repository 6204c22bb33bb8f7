// Copyright © 2024 Pathway

use assert_matches::assert_matches;
use ndarray::{Array2, Axis};

use multimap_engine::api::multimap_batch;
use multimap_engine::engine::{
    BatchOptions, Dataset, Error, Integrator, Preprocessing, CONNECTIVITIES_KEY, EMBEDDING_KEY,
};
use multimap_engine::external_integration::{Reducer, Scaler};
use multimap_engine::IntegrationConfig;

use super::helpers::{labels, random_dataset};

const FEATURES: [&str; 5] = ["g1", "g2", "g3", "g4", "g5"];

fn batched(batches: &[&str]) -> Dataset {
    random_dataset("s", batches.len(), &FEATURES, 17)
        .with_annotation("batch", labels(batches))
        .expect("one label per row")
}

/// Integration of the partitions done by hand, in sorted label order.
fn integrate_by_hand(dataset: &Dataset, partitions: &[Vec<usize>]) -> eyre::Result<Dataset> {
    let integrator = Integrator::from_config(&IntegrationConfig::default())?;
    let parts = partitions
        .iter()
        .map(|rows| {
            let part = dataset.select_samples(rows)?;
            let scaled = integrator.scaler().scale(part.matrix())?;
            let part = part.with_matrix(scaled)?;
            let reduced = integrator.reducer().reduce(part.matrix())?;
            part.with_embedding("X_pca", reduced)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(integrator.integrate(&parts, &["X_pca"; 2], Preprocessing::AlreadyNormalized)?)
}

#[test]
fn test_batch_matches_explicit_integration() -> eyre::Result<()> {
    let mut dataset = batched(&["a", "a", "a", "b", "b", "b"]);
    let expected = integrate_by_hand(&dataset, &[vec![0, 1, 2], vec![3, 4, 5]])?;

    multimap_batch(&mut dataset, None, None, &IntegrationConfig::default())?;

    assert_eq!(
        dataset.embedding(EMBEDDING_KEY),
        expected.embedding(EMBEDDING_KEY)
    );
    assert_eq!(
        dataset.graph(CONNECTIVITIES_KEY),
        expected.graph(CONNECTIVITIES_KEY)
    );
    assert_eq!(dataset.embedding("X_pca"), None);
    Ok(())
}

#[test]
fn test_batch_realigns_interleaved_rows() -> eyre::Result<()> {
    let mut dataset = batched(&["b", "a", "b", "a", "b", "a"]);
    // "a" sorts first, so its rows lead the integrated order
    let order = [1, 3, 5, 0, 2, 4];
    let expected = integrate_by_hand(&dataset, &[vec![1, 3, 5], vec![0, 2, 4]])?;

    let integrator = Integrator::from_config(&IntegrationConfig::default())?;
    integrator.integrate_batches(&mut dataset, &BatchOptions::default(), None)?;

    let embedding = dataset.embedding(EMBEDDING_KEY).expect("embedding stored");
    let expected_embedding = expected.embedding(EMBEDDING_KEY).expect("embedding stored");
    for (position, &row) in order.iter().enumerate() {
        assert_eq!(embedding.row(row), expected_embedding.row(position));
    }

    let graph = dataset.graph(CONNECTIVITIES_KEY).expect("graph stored");
    let expected_graph = expected.graph(CONNECTIVITIES_KEY).expect("graph stored");
    assert_eq!(graph.n_edges(), expected_graph.n_edges());
    for (row, col, weight) in expected_graph.iter() {
        assert_eq!(graph.weight(order[row], order[col]), weight);
    }
    Ok(())
}

#[test]
fn test_batch_custom_dimred() -> eyre::Result<()> {
    let mut dataset = batched(&["x", "y", "x", "y"]);
    let dimred = |part: &Dataset| -> multimap_engine::Result<Array2<f64>> {
        Ok(part.matrix().select(Axis(1), &[0, 1]))
    };
    let options = BatchOptions {
        rep_name: "X_first".to_string(),
        preprocessing: Preprocessing::AlreadyNormalized,
        ..BatchOptions::default()
    };
    multimap_batch(
        &mut dataset,
        Some(&options),
        Some(&dimred),
        &IntegrationConfig::default(),
    )?;
    assert_eq!(dataset.embedding(EMBEDDING_KEY).map(Array2::nrows), Some(4));
    assert!(dataset.embedding("X_first").is_none());
    Ok(())
}

#[test]
fn test_batch_options_default_to_config() -> eyre::Result<()> {
    let mut dataset = random_dataset("s", 6, &FEATURES, 17)
        .with_annotation("donor", labels(&["a", "a", "a", "b", "b", "b"]))?;
    let expected = integrate_by_hand(&dataset, &[vec![0, 1, 2], vec![3, 4, 5]])?;
    let config = IntegrationConfig::from_json_str(r#"{"batch": {"batch_key": "donor"}}"#)?;

    assert_matches!(
        multimap_batch(&mut dataset, Some(&BatchOptions::default()), None, &config),
        Err(Error::MissingAnnotation(column)) if column == "batch"
    );
    multimap_batch(&mut dataset, None, None, &config)?;
    assert_eq!(
        dataset.embedding(EMBEDDING_KEY),
        expected.embedding(EMBEDDING_KEY)
    );
    Ok(())
}

#[test]
fn test_batch_missing_column() {
    let mut dataset = batched(&["a", "b"]);
    let options = BatchOptions {
        batch_key: "sample".to_string(),
        ..BatchOptions::default()
    };
    assert_matches!(
        multimap_batch(&mut dataset, Some(&options), None, &IntegrationConfig::default()),
        Err(Error::MissingAnnotation(column)) if column == "sample"
    );
}

#[test]
fn test_batch_single_category() {
    let mut dataset = batched(&["a", "a", "a"]);
    assert_matches!(
        multimap_batch(&mut dataset, None, None, &IntegrationConfig::default()),
        Err(Error::TooFewCategories { found: 1, .. })
    );
}

#[test]
fn test_batch_failure_leaves_dataset_unchanged() {
    let mut dataset = batched(&["a", "b", "b", "b"]);
    let before = dataset.clone();
    // a one-row batch cannot be reduced by PCA
    assert_matches!(
        multimap_batch(&mut dataset, None, None, &IntegrationConfig::default()),
        Err(Error::RankTooLow { rows: 1, .. })
    );
    assert!(dataset.embedding(EMBEDDING_KEY).is_none());
    assert!(dataset.graph(CONNECTIVITIES_KEY).is_none());
    assert_eq!(dataset.matrix(), before.matrix());
    assert_eq!(dataset.annotations(), before.annotations());
}

#[test]
fn test_batch_failing_dimred_propagates() {
    let mut dataset = batched(&["a", "b", "a", "b"]);
    let failing = |part: &Dataset| -> multimap_engine::Result<Array2<f64>> {
        Err(Error::RankTooLow {
            rows: part.n_samples(),
            cols: part.n_features(),
        })
    };
    assert_matches!(
        multimap_batch(
            &mut dataset,
            None,
            Some(&failing),
            &IntegrationConfig::default()
        ),
        Err(Error::RankTooLow { rows: 2, cols: 5 })
    );
    assert!(dataset.embedding(EMBEDDING_KEY).is_none());
}
