// Copyright © 2024 Pathway

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::sync::Arc;

use itertools::Itertools;

use super::error::{Error, Result};

/// Every combination of `0..n` with at least `min_len` elements.
///
/// Combinations come in non-decreasing size, each one in ascending order.
pub fn powerset(n: usize, min_len: usize) -> Vec<Vec<usize>> {
    (min_len..=n)
        .flat_map(|size| (0..n).combinations(size))
        .collect()
}

/// All dataset combinations that carry cross-dataset information.
pub fn subset_keys(n: usize) -> Vec<SubsetKey> {
    powerset(n, SubsetKey::MIN_LEN)
        .into_iter()
        .map(|indices| SubsetKey(indices.into()))
        .collect()
}

/// An ordered combination of distinct dataset indices, at least two long.
///
/// Keys order by length first, then lexicographically, which matches the
/// order [`subset_keys`] produces them in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubsetKey(Arc<[usize]>);

impl SubsetKey {
    pub const MIN_LEN: usize = 2;

    pub fn new(indices: impl Into<Vec<usize>>) -> Result<Self> {
        let indices = indices.into();
        let distinct: HashSet<_> = indices.iter().collect();
        if indices.len() < Self::MIN_LEN || distinct.len() != indices.len() {
            return Err(Error::InvalidSubsetKey(indices));
        }
        Ok(Self(indices.into()))
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    // never true, the key invariant guarantees at least two indices
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }
}

impl Ord for SubsetKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.indices().cmp(other.indices()))
    }
}

impl PartialOrd for SubsetKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SubsetKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}
