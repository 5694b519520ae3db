//! # Error Types
//!
//! Defines `DatagenError`, the unified error enum for every failure mode in
//! the generation pipeline. Every variant carries enough context (node name,
//! column name, row index) to debug immediately without digging through logs.

use thiserror::Error;

/// The kind of problem found while parsing or validating a schema document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    #[error("unknown field")]
    UnknownField,
    #[error("missing required field")]
    MissingField,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("duplicate id")]
    DuplicateId,
    #[error("reference to unknown node or column")]
    BadReference,
    #[error("invalid parameter value")]
    BadParameter,
}

/// The kind of problem found while building a generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorErrorKind {
    #[error("malformed generator specification")]
    BadSpec,
    #[error("sampled value fell outside the allowed range")]
    OutOfRange,
    #[error("generator domain is empty")]
    EmptyDomain,
    #[error("referenced column or node could not be resolved")]
    ReferenceUnresolved,
}

/// The kind of problem found while applying a modifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModifierErrorKind {
    #[error("wrong number of arguments")]
    Arity,
    #[error("malformed modifier arguments")]
    BadArgs,
    #[error("modifier depends on a column that has not been produced yet")]
    MissingDependency,
    #[error("modifier cannot operate on this value's type")]
    IncompatibleType,
}

/// All errors that can occur in Datagen operations.
#[derive(Error, Debug)]
pub enum DatagenError {
    #[error("schema error at {path}: {kind}: {detail}")]
    Schema {
        kind: SchemaErrorKind,
        path: String,
        detail: String,
    },

    #[error("schema has {} problems:\n{}", .0.len(), format_multiple(.0))]
    SchemaMultiple(Vec<DatagenError>),

    #[error("dependency planning failed: {detail}")]
    Planner { detail: String },

    #[error("circular dependency detected involving nodes: {nodes}")]
    PlannerCycle { nodes: String },

    #[error("seed derivation failed for scope {scope:?}: {detail}")]
    Seed { scope: Vec<String>, detail: String },

    #[error("generator error on {node}.{column}: {kind}: {detail}")]
    Generator {
        node: String,
        column: String,
        kind: GeneratorErrorKind,
        detail: String,
    },

    #[error("modifier error on {node}.{column} (modifier #{index}): {kind}: {detail}")]
    Modifier {
        node: String,
        column: String,
        index: usize,
        kind: ModifierErrorKind,
        detail: String,
    },

    #[error("lookup failed on {table}.({}) at row {row_index}: no matching row", .keys.join(", "))]
    Lookup {
        table: String,
        keys: Vec<String>,
        row_index: usize,
    },

    #[error("cannot cast value for {node}.{column} at row {row_index} to the declared type: {detail}")]
    TypeCast {
        node: String,
        column: String,
        row_index: usize,
        detail: String,
    },

    #[error("generation failed on {node}.{column}, row {row_start}..{row_end}: {detail}")]
    Generation {
        node: String,
        column: String,
        row_start: usize,
        row_end: usize,
        detail: String,
    },

    #[error("generation cancelled")]
    Cancelled,

    #[error("output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

fn format_multiple(errors: &[DatagenError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("  {}. {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, DatagenError>;
