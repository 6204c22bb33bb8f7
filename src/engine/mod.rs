// Copyright © 2024 Pathway

pub mod error;
pub use self::error::{Error, Result};

pub mod value;
pub use self::value::AnnotationValue;

pub mod dataset;
pub use dataset::{Annotations, Dataset};

pub mod graph;
pub use graph::SparseGraph;

pub mod subset;
pub use subset::{powerset, subset_keys, SubsetKey};

pub mod tagging;
pub use tagging::{tag_origin, ORIGIN_COLUMN};

pub mod joint;
pub use joint::{JointConfig, JointEmbeddingBuilder, JointEmbeddingTable};

pub mod assembler;
pub use assembler::{EmbeddingAssembler, CONNECTIVITIES_KEY, EMBEDDING_KEY};

pub mod integration;
pub use integration::{Integrator, IntegratorBuilder, Preprocessing};

pub mod batch;
pub use batch::{BatchOptions, DimRedFn};
