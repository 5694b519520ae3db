//! # datagen-core
//!
//! The schema-first synthetic relational-dataset pipeline: parse a
//! declarative JSON schema document, plan a dependency order over its
//! nodes, execute that order to produce an in-memory dataset, and validate
//! the result against the same schema's declared constraints and targets.

pub mod error;
pub mod generate;
pub mod graph;
pub mod output;
pub mod schema;
pub mod seed;
pub mod validate;

pub use error::{DatagenError, Result};
pub use generate::{generate, CancellationToken, GeneratedTable, GeneratedTables};
pub use schema::parse::parse_schema;
pub use schema::Dataset;
pub use validate::{validate, Report};
