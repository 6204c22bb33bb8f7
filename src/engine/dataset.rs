// Copyright © 2024 Pathway

use std::collections::HashSet;

use indexmap::IndexMap;
use ndarray::{Array2, Axis};

use super::error::{Error, Result};
use super::graph::SparseGraph;
use super::value::AnnotationValue;

/// Per-sample annotation columns, every column holding one value per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotations {
    n_rows: usize,
    columns: IndexMap<String, Vec<AnnotationValue>>,
}

impl Annotations {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: IndexMap::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column(&self, name: &str) -> Option<&[AnnotationValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Inserts or replaces the column `name`.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<AnnotationValue>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(Error::ShapeMismatch {
                what: "annotation column",
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.columns.insert(name.into(), values);
        Ok(())
    }

    fn select(&self, rows: &[usize]) -> Self {
        Self {
            n_rows: rows.len(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.clone(),
                        rows.iter().map(|&row| values[row].clone()).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// A samples x features matrix with annotations and derived stores.
#[derive(Clone, Debug)]
pub struct Dataset {
    matrix: Array2<f64>,
    sample_names: Vec<String>,
    feature_names: Vec<String>,
    annotations: Annotations,
    embeddings: IndexMap<String, Array2<f64>>,
    graphs: IndexMap<String, SparseGraph>,
}

impl Dataset {
    pub fn new(
        matrix: Array2<f64>,
        sample_names: Vec<String>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if sample_names.len() != matrix.nrows() {
            return Err(Error::ShapeMismatch {
                what: "sample names",
                expected: matrix.nrows(),
                actual: sample_names.len(),
            });
        }
        if feature_names.len() != matrix.ncols() {
            return Err(Error::ShapeMismatch {
                what: "feature names",
                expected: matrix.ncols(),
                actual: feature_names.len(),
            });
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateFeature(name.clone()));
            }
        }
        let annotations = Annotations::new(matrix.nrows());
        Ok(Self {
            matrix,
            sample_names,
            feature_names,
            annotations,
            embeddings: IndexMap::new(),
            graphs: IndexMap::new(),
        })
    }

    pub fn with_annotation(
        mut self,
        name: impl Into<String>,
        values: Vec<AnnotationValue>,
    ) -> Result<Self> {
        self.annotations.insert(name, values)?;
        Ok(self)
    }

    pub fn with_embedding(mut self, name: impl Into<String>, embedding: Array2<f64>) -> Result<Self> {
        self.insert_embedding(name, embedding)?;
        Ok(self)
    }

    /// Same dataset over a replacement matrix of identical shape.
    pub fn with_matrix(mut self, matrix: Array2<f64>) -> Result<Self> {
        if matrix.dim() != self.matrix.dim() {
            return Err(Error::ShapeMismatch {
                what: "replacement matrix",
                expected: self.matrix.len(),
                actual: matrix.len(),
            });
        }
        self.matrix = matrix;
        Ok(self)
    }

    pub(crate) fn from_parts(
        matrix: Array2<f64>,
        sample_names: Vec<String>,
        feature_names: Vec<String>,
        annotations: Annotations,
        embeddings: IndexMap<String, Array2<f64>>,
    ) -> Self {
        Self {
            matrix,
            sample_names,
            feature_names,
            annotations,
            embeddings,
            graphs: IndexMap::new(),
        }
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    pub fn embedding(&self, name: &str) -> Option<&Array2<f64>> {
        self.embeddings.get(name)
    }

    pub fn embeddings(&self) -> impl Iterator<Item = (&str, &Array2<f64>)> {
        self.embeddings.iter().map(|(name, e)| (name.as_str(), e))
    }

    pub fn insert_embedding(&mut self, name: impl Into<String>, embedding: Array2<f64>) -> Result<()> {
        if embedding.nrows() != self.n_samples() {
            return Err(Error::ShapeMismatch {
                what: "embedding rows",
                expected: self.n_samples(),
                actual: embedding.nrows(),
            });
        }
        self.embeddings.insert(name.into(), embedding);
        Ok(())
    }

    pub fn graph(&self, name: &str) -> Option<&SparseGraph> {
        self.graphs.get(name)
    }

    pub fn insert_graph(&mut self, name: impl Into<String>, graph: SparseGraph) -> Result<()> {
        if graph.n_nodes() != self.n_samples() {
            return Err(Error::ShapeMismatch {
                what: "graph nodes",
                expected: self.n_samples(),
                actual: graph.n_nodes(),
            });
        }
        self.graphs.insert(name.into(), graph);
        Ok(())
    }

    /// Fresh dataset restricted to `rows`, in the given order.
    pub fn select_samples(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&row) = rows.iter().find(|&&row| row >= self.n_samples()) {
            return Err(Error::IndexOutOfRange {
                index: row,
                count: self.n_samples(),
            });
        }
        let graphs = self
            .graphs
            .iter()
            .map(|(name, graph)| Ok((name.clone(), graph.select(rows)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            matrix: self.matrix.select(Axis(0), rows),
            sample_names: rows.iter().map(|&row| self.sample_names[row].clone()).collect(),
            feature_names: self.feature_names.clone(),
            annotations: self.annotations.select(rows),
            embeddings: self
                .embeddings
                .iter()
                .map(|(name, e)| (name.clone(), e.select(Axis(0), rows)))
                .collect(),
            graphs,
        })
    }
}
