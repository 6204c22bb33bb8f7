// Copyright © 2024 Pathway

use std::fmt::{self, Display};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single cell of a per-sample annotation table.
///
/// Values are totally ordered (floats through [`OrderedFloat`]) so the
/// distinct labels of a categorical column form a stable sorted set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationValue {
    Missing,
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl AnnotationValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "<missing>"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", x.into_inner()),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        Self::Float(OrderedFloat(value))
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
