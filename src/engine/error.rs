// Copyright © 2024 Pathway

use std::error;
use std::io;
use std::result;

use super::subset::SubsetKey;
use crate::env::Error as EnvError;

#[allow(clippy::module_name_repetitions)]
pub type DynError = Box<dyn error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("at least 2 datasets are required for integration, got {0}")]
    TooFewDatasets(usize),

    #[error("length mismatch: {datasets} datasets but {reps} primary embedding names")]
    LengthMismatch { datasets: usize, reps: usize },

    #[error("dataset {dataset} has no embedding named {name:?}")]
    MissingEmbedding { dataset: usize, name: String },

    #[error("annotation column {0:?} is missing")]
    MissingAnnotation(String),

    #[error("annotation column {column:?} has {found} distinct values, at least 2 are required")]
    TooFewCategories { column: String, found: usize },

    #[error("collaborator {0:?} is not configured")]
    MissingCollaborator(&'static str),

    #[error("invalid subset key {0:?}: need at least 2 distinct indices")]
    InvalidSubsetKey(Vec<usize>),

    #[error("dataset index {index} out of range for {count} datasets")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("duplicate feature name {0:?}")]
    DuplicateFeature(String),

    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("subset {0} has no features in common")]
    EmptyIntersection(SubsetKey),

    #[error("subset {key}: dataset {dataset} should yield {expected} rows, got {actual}")]
    RowCountMismatch {
        key: SubsetKey,
        dataset: usize,
        expected: usize,
        actual: usize,
    },

    #[error("subset {key} yields {found} joint components, at least {required} are required")]
    TooFewComponents {
        key: SubsetKey,
        found: usize,
        required: usize,
    },

    #[error("matrix of shape {rows}x{cols} is too small to compute components")]
    RankTooLow { rows: usize, cols: usize },

    #[error("{0} did not converge")]
    NoConvergence(&'static str),

    #[error("weight {weight} between {row} and {col} is outside of [0, 1]")]
    WeightOutOfRange { row: usize, col: usize, weight: f64 },

    #[error("cannot join an empty list of datasets")]
    EmptyJoin,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Other(DynError),
}

impl Error {
    pub fn downcast<E: error::Error + 'static>(self) -> Result<E, Self> {
        match self {
            Self::Other(inner) => match inner.downcast::<E>() {
                Ok(error) => Ok(*error),
                Err(other) => Err(Self::Other(other)),
            },
            other => Err(other),
        }
    }

    /// The subset computation this error originated from, if any.
    pub fn subset(&self) -> Option<&SubsetKey> {
        match self {
            Self::EmptyIntersection(key)
            | Self::RowCountMismatch { key, .. }
            | Self::TooFewComponents { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<DynError> for Error {
    fn from(value: DynError) -> Self {
        match value.downcast::<Self>() {
            Ok(this) => *this,
            Err(other) => Self::Other(other),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
