// Copyright © 2024 Pathway

use assert_matches::assert_matches;
use mockall::mock;
use ndarray::Array2;

use multimap_engine::engine::{
    subset_keys, tag_origin, Dataset, Error, JointEmbeddingBuilder, JointEmbeddingTable, Result,
    SubsetKey,
};
use multimap_engine::external_integration::{
    FeatureJoin, JoinMode, Joiner, Pca, PcaConfig, Reducer,
};

use super::helpers::random_dataset;

mock! {
    pub Reduction {}
    impl Reducer for Reduction {
        fn reduce(&self, matrix: &Array2<f64>) -> Result<Array2<f64>>;
    }
}

/// Inner join that keeps only the given rows of the stacked result.
struct LossyJoin {
    keep: Vec<usize>,
}

impl Joiner for LossyJoin {
    fn join(&self, datasets: &[&Dataset], mode: JoinMode) -> Result<Dataset> {
        FeatureJoin::default()
            .join(datasets, mode)?
            .select_samples(&self.keep)
    }
}

fn key(indices: &[usize]) -> SubsetKey {
    SubsetKey::new(indices.to_vec()).expect("valid key")
}

fn tagged(datasets: &[Dataset]) -> Vec<Dataset> {
    datasets
        .iter()
        .enumerate()
        .map(|(index, dataset)| tag_origin(dataset, index).expect("tagging succeeds"))
        .collect()
}

#[test]
fn test_two_datasets_shared_features() -> eyre::Result<()> {
    let a = random_dataset("a", 3, &["g1", "g2", "g3", "g4", "g5"], 1);
    let b = random_dataset("b", 2, &["g5", "g3", "g1", "g4", "g2"], 2);
    let reducer = Pca::new(PcaConfig::default())?;
    let joiner = FeatureJoin::default();
    let table = JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&[a, b]))?;

    assert_eq!(table.len(), 1);
    let blocks = table.get(&key(&[0, 1])).expect("entry for (0, 1)");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].nrows(), 3);
    assert_eq!(blocks[1].nrows(), 2);
    assert_eq!(blocks[0].ncols(), blocks[1].ncols());
    assert_eq!(table.n_components(), Some(4));
    Ok(())
}

#[test]
fn test_three_datasets_entries_in_order() -> eyre::Result<()> {
    let features = ["g1", "g2", "g3", "g4"];
    let datasets = vec![
        random_dataset("a", 4, &features, 1),
        random_dataset("b", 5, &features, 2),
        random_dataset("c", 3, &features, 3),
    ];
    let reducer = Pca::new(PcaConfig { n_components: 2 })?;
    let joiner = FeatureJoin::default();
    let table = JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&datasets))?;

    assert_eq!(table.keys().cloned().collect::<Vec<_>>(), subset_keys(3));
    for (key, blocks) in table.iter() {
        for (&index, block) in key.indices().iter().zip(blocks) {
            assert_eq!(block.nrows(), datasets[index].n_samples());
            assert_eq!(block.ncols(), 2);
        }
    }
    Ok(())
}

#[test]
fn test_reducer_sees_shared_features_only() -> eyre::Result<()> {
    let a = random_dataset("a", 3, &["g1", "g2", "g3"], 1);
    let b = random_dataset("b", 2, &["g2", "g3", "g9"], 2);
    let mut reducer = MockReduction::new();
    reducer
        .expect_reduce()
        .withf(|matrix| matrix.dim() == (5, 2))
        .times(1)
        .returning(|matrix| Ok(Array2::zeros((matrix.nrows(), 3))));
    let joiner = FeatureJoin::default();
    let table = JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&[a, b]))?;
    assert_eq!(table.n_components(), Some(3));
    Ok(())
}

#[test]
fn test_empty_intersection_aborts() {
    let a = random_dataset("a", 3, &["g1", "g2"], 1);
    let b = random_dataset("b", 3, &["g1", "g2"], 2);
    let c = random_dataset("c", 3, &["h1", "h2"], 3);
    let mut reducer = MockReduction::new();
    // only (0, 1) is reduced before (0, 2) fails
    reducer
        .expect_reduce()
        .times(1)
        .returning(|matrix| Ok(Array2::zeros((matrix.nrows(), 2))));
    let joiner = FeatureJoin::default();

    let result = JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&[a, b, c]));
    let error = result.expect_err("no shared features between a and c");
    assert_eq!(error.subset(), Some(&key(&[0, 2])));
    assert_matches!(error, Error::EmptyIntersection(_));
}

#[test]
fn test_build_entry_per_subset() -> eyre::Result<()> {
    let inputs = tagged(&[
        random_dataset("a", 3, &["g1", "g2", "g3"], 1),
        random_dataset("b", 3, &["g3", "g2", "g1"], 2),
        random_dataset("c", 3, &["h1", "h2", "h3"], 3),
    ]);
    let reducer = Pca::new(PcaConfig::default())?;
    let joiner = FeatureJoin::default();
    let builder = JointEmbeddingBuilder::new(&joiner, &reducer);

    let blocks = builder.build_entry(&inputs, &key(&[0, 1]))?;
    assert_eq!(blocks.iter().map(Array2::nrows).collect::<Vec<_>>(), vec![3, 3]);
    assert_matches!(
        builder.build_entry(&inputs, &key(&[0, 1, 2])),
        Err(Error::EmptyIntersection(failed)) if failed == key(&[0, 1, 2])
    );
    assert_matches!(
        builder.build_entry(&inputs, &key(&[1, 3])),
        Err(Error::IndexOutOfRange { index: 3, count: 3 })
    );
    Ok(())
}

#[test]
fn test_reducer_failure_propagates() {
    let a = random_dataset("a", 3, &["g1", "g2"], 1);
    let b = random_dataset("b", 3, &["g1", "g2"], 2);
    let mut reducer = MockReduction::new();
    reducer
        .expect_reduce()
        .returning(|matrix| Err(Error::RankTooLow {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        }));
    let joiner = FeatureJoin::default();
    assert_matches!(
        JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&[a, b])),
        Err(Error::RankTooLow { rows: 6, cols: 2 })
    );
}

#[test]
fn test_reducer_row_count_checked() {
    let a = random_dataset("a", 3, &["g1"], 1);
    let b = random_dataset("b", 3, &["g1"], 2);
    let mut reducer = MockReduction::new();
    reducer
        .expect_reduce()
        .returning(|_| Ok(Array2::zeros((4, 2))));
    let joiner = FeatureJoin::default();
    assert_matches!(
        JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&[a, b])),
        Err(Error::ShapeMismatch {
            what: "joint embedding rows",
            expected: 6,
            actual: 4
        })
    );
}

#[test]
fn test_row_loss_in_join_detected() {
    let a = random_dataset("a", 3, &["g1", "g2", "g3"], 1);
    let b = random_dataset("b", 2, &["g1", "g2", "g3"], 2);
    // the last row of the second dataset goes missing
    let joiner = LossyJoin {
        keep: vec![0, 1, 2, 3],
    };
    let reducer = Pca::new(PcaConfig::default()).expect("valid pca");

    let error = JointEmbeddingBuilder::new(&joiner, &reducer)
        .build(&tagged(&[a, b]))
        .expect_err("row count differs");
    assert_matches!(
        error,
        Error::RowCountMismatch {
            dataset: 1,
            expected: 2,
            actual: 1,
            ..
        }
    );
}

#[test]
fn test_width_truncated_to_minimum() -> eyre::Result<()> {
    let features = ["g1", "g2", "g3"];
    let datasets = vec![
        random_dataset("a", 3, &features, 1),
        random_dataset("b", 3, &features, 2),
        random_dataset("c", 3, &features, 3),
    ];
    let mut reducer = MockReduction::new();
    reducer
        .expect_reduce()
        .returning(|matrix| Ok(Array2::ones((matrix.nrows(), matrix.nrows() / 3))));
    let joiner = FeatureJoin::default();
    let table = JointEmbeddingBuilder::new(&joiner, &reducer).build(&tagged(&datasets))?;
    // pairs reduce to 2 columns, the triple to 3
    assert_eq!(table.n_components(), Some(2));
    assert!(table.iter().flat_map(|(_, b)| b).all(|b| b.ncols() == 2));
    Ok(())
}

#[test]
fn test_width_floor_rejects_narrow_subset() -> eyre::Result<()> {
    let features = ["g1", "g2", "g3"];
    let datasets = tagged(&[
        random_dataset("a", 3, &features, 1),
        random_dataset("b", 3, &features, 2),
        random_dataset("c", 3, &features, 3),
    ]);
    let mut reducer = MockReduction::new();
    reducer
        .expect_reduce()
        .returning(|matrix| Ok(Array2::ones((matrix.nrows(), matrix.nrows() / 3))));
    let joiner = FeatureJoin::default();

    let error = JointEmbeddingBuilder::new(&joiner, &reducer)
        .with_min_components(Some(3))
        .build(&datasets)
        .err();
    assert_matches!(
        &error,
        Some(Error::TooFewComponents { found: 2, required: 3, .. })
    );
    assert_eq!(error.as_ref().and_then(Error::subset), Some(&key(&[0, 1])));

    let table = JointEmbeddingBuilder::new(&joiner, &reducer)
        .with_min_components(Some(2))
        .build(&datasets)?;
    assert_eq!(table.n_components(), Some(2));
    Ok(())
}

#[test]
fn test_table_from_entries_validation() {
    let entries = vec![(key(&[0, 1]), vec![Array2::zeros((2, 3))])];
    assert_matches!(
        JointEmbeddingTable::from_entries(entries),
        Err(Error::ShapeMismatch {
            what: "joint embedding blocks",
            ..
        })
    );
    let entries = vec![(
        key(&[0, 1]),
        vec![Array2::zeros((2, 3)), Array2::zeros((1, 2))],
    )];
    assert_matches!(
        JointEmbeddingTable::from_entries(entries),
        Err(Error::ShapeMismatch {
            what: "joint embedding components",
            expected: 3,
            actual: 2
        })
    );
}
