// Copyright © 2024 Pathway

use super::dataset::Dataset;
use super::error::Result;
use super::value::AnnotationValue;

/// Annotation column recording which input dataset a row came from.
pub const ORIGIN_COLUMN: &str = "multimap_index";

/// Copy of `dataset` whose rows are all tagged with `index` in [`ORIGIN_COLUMN`].
pub fn tag_origin(dataset: &Dataset, index: usize) -> Result<Dataset> {
    let tag = AnnotationValue::Int(origin_tag(index));
    let mut tagged = dataset.clone();
    tagged
        .annotations_mut()
        .insert(ORIGIN_COLUMN, vec![tag; dataset.n_samples()])?;
    Ok(tagged)
}

/// Row positions of `dataset` tagged with `index`, in row order.
pub fn rows_with_origin(dataset: &Dataset, index: usize) -> Option<Vec<usize>> {
    let tags = dataset.annotations().column(ORIGIN_COLUMN)?;
    let index = origin_tag(index);
    Some(
        tags.iter()
            .enumerate()
            .filter(|(_, tag)| tag.as_int() == Some(index))
            .map(|(row, _)| row)
            .collect(),
    )
}

#[allow(clippy::cast_possible_wrap)]
fn origin_tag(index: usize) -> i64 {
    index as i64
}
