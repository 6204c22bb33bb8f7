#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)] // too noisy

// FIXME:
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod config;
pub mod engine;
pub mod env;
pub mod external_integration;
pub mod linalg;

pub use config::IntegrationConfig;
pub use engine::{
    BatchOptions, Dataset, Error, Integrator, JointEmbeddingTable, Preprocessing, Result,
    SparseGraph, SubsetKey,
};
