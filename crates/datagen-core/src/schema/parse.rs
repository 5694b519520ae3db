//! # Schema Parsing
//!
//! Turns a raw schema document into a validated [`Dataset`]. Deserialization
//! (via `serde_json`, with `deny_unknown_fields` on every struct) catches
//! structural problems; a second semantic pass catches dangling references,
//! empty domains, and other problems only visible once the whole document is
//! in hand. Unlike the deserializer, the semantic pass accumulates every
//! problem it finds instead of stopping at the first one.

use crate::error::{DatagenError, Result, SchemaErrorKind};
use crate::schema::types::{Dataset, FanoutSpec, GeneratorSpec, ModifierSpec, NodeKind, WeightSpec};

/// Parse and validate a schema document.
///
/// `document_bytes` is a UTF-8 JSON document matching the shape described in
/// the schema reference: `{version, metadata, timeframe, nodes, constraints,
/// targets}`.
pub fn parse_schema(document_bytes: &[u8]) -> Result<Dataset> {
    let dataset: Dataset = serde_json::from_slice(document_bytes).map_err(|e| {
        DatagenError::Schema {
            kind: classify_serde_error(&e),
            path: "$".to_string(),
            detail: e.to_string(),
        }
    })?;

    let problems = validate_semantics(&dataset);
    if problems.is_empty() {
        Ok(dataset)
    } else if problems.len() == 1 {
        Err(problems.into_iter().next().unwrap())
    } else {
        Err(DatagenError::SchemaMultiple(problems))
    }
}

fn classify_serde_error(e: &serde_json::Error) -> SchemaErrorKind {
    use serde_json::error::Category;
    match e.classify() {
        Category::Data => SchemaErrorKind::TypeMismatch,
        Category::Syntax | Category::Eof => SchemaErrorKind::BadParameter,
        Category::Io => SchemaErrorKind::BadParameter,
    }
}

fn err(kind: SchemaErrorKind, path: impl Into<String>, detail: impl Into<String>) -> DatagenError {
    DatagenError::Schema {
        kind,
        path: path.into(),
        detail: detail.into(),
    }
}

fn validate_semantics(dataset: &Dataset) -> Vec<DatagenError> {
    let mut problems = Vec::new();

    if dataset.nodes.is_empty() {
        problems.push(err(
            SchemaErrorKind::MissingField,
            "$.nodes",
            "dataset must declare at least one node",
        ));
    }

    if dataset.timeframe.end <= dataset.timeframe.start {
        problems.push(err(
            SchemaErrorKind::BadParameter,
            "$.timeframe",
            "end must be after start",
        ));
    }

    for (node_name, node) in &dataset.nodes {
        let node_path = format!("$.nodes.{node_name}");

        match node.kind {
            NodeKind::Fact => {
                match &node.parent {
                    None => problems.push(err(
                        SchemaErrorKind::MissingField,
                        &node_path,
                        "fact nodes require a parent",
                    )),
                    Some(parent) if !dataset.nodes.contains_key(parent) => {
                        problems.push(err(
                            SchemaErrorKind::BadReference,
                            &node_path,
                            format!("parent '{parent}' does not exist"),
                        ));
                    }
                    Some(parent) if parent == node_name => {
                        problems.push(err(
                            SchemaErrorKind::BadReference,
                            &node_path,
                            "a node cannot be its own fanout parent",
                        ));
                    }
                    _ => {}
                }
                if node.fanout.is_none() {
                    problems.push(err(
                        SchemaErrorKind::MissingField,
                        &node_path,
                        "fact nodes require a fanout specification",
                    ));
                }
                if node.rows.is_some() {
                    problems.push(err(
                        SchemaErrorKind::BadParameter,
                        &node_path,
                        "fact nodes derive their row count from fanout, 'rows' is not allowed",
                    ));
                }
            }
            NodeKind::Entity | NodeKind::Vocab => {
                if node.parent.is_some() || node.fanout.is_some() {
                    problems.push(err(
                        SchemaErrorKind::BadParameter,
                        &node_path,
                        "only fact nodes may declare parent/fanout",
                    ));
                }
                if !node.table_modifiers.is_empty() {
                    problems.push(err(
                        SchemaErrorKind::BadParameter,
                        &node_path,
                        "only fact nodes may declare table_modifiers",
                    ));
                }
            }
        }

        for modifier in &node.table_modifiers {
            if !matches!(modifier, ModifierSpec::Effect { .. }) {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    &node_path,
                    "table_modifiers may only contain an effect modifier",
                ));
            } else if let ModifierSpec::Effect { event_table, .. } = modifier {
                if event_table == node_name {
                    problems.push(err(
                        SchemaErrorKind::BadReference,
                        &node_path,
                        "table-level effect cannot reference its own node as the event table",
                    ));
                } else if !dataset.nodes.contains_key(event_table) {
                    problems.push(err(
                        SchemaErrorKind::BadReference,
                        &node_path,
                        format!("table-level effect references unknown node '{event_table}'"),
                    ));
                }
            }
        }

        if let Some(FanoutSpec::Poisson { min, max, .. } | FanoutSpec::Uniform { min, max }) =
            &node.fanout
        {
            if min > max {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    &node_path,
                    "fanout min must be <= max",
                ));
            }
        }

        if node.columns.is_empty() {
            problems.push(err(
                SchemaErrorKind::MissingField,
                &node_path,
                "node must declare at least one column",
            ));
        } else if !node.columns.contains_key(&node.primary_key) {
            problems.push(err(
                SchemaErrorKind::BadReference,
                &node_path,
                format!("primary_key '{}' is not a declared column", node.primary_key),
            ));
        }

        for (col_name, column) in &node.columns {
            let col_path = format!("{node_path}.columns.{col_name}");

            if column.nullable && !(0.0..=1.0).contains(&column.null_probability) {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    &col_path,
                    "null_probability must be in [0, 1]",
                ));
            }

            validate_generator(dataset, &col_path, &column.generator, &mut problems);
        }
    }

    problems
}

fn validate_generator(
    dataset: &Dataset,
    col_path: &str,
    generator: &GeneratorSpec,
    problems: &mut Vec<DatagenError>,
) {
    match generator {
        GeneratorSpec::Choice { values, weights } => {
            if values.is_empty() {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    col_path,
                    "choice generator requires at least one value",
                ));
            }
            if let WeightSpec::Explicit { weights } = weights {
                if weights.len() != values.len() {
                    problems.push(err(
                        SchemaErrorKind::BadParameter,
                        col_path,
                        "explicit weights must have one entry per value",
                    ));
                }
            }
        }
        GeneratorSpec::EnumList { values } => {
            if values.is_empty() {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    col_path,
                    "enum_list generator requires at least one value",
                ));
            }
        }
        GeneratorSpec::Lookup { table, column, .. } => {
            match dataset.nodes.get(table) {
                None => problems.push(err(
                    SchemaErrorKind::BadReference,
                    col_path,
                    format!("lookup references unknown node '{table}'"),
                )),
                Some(target) => {
                    if !target.columns.contains_key(column) {
                        problems.push(err(
                            SchemaErrorKind::BadReference,
                            col_path,
                            format!("lookup references unknown column '{table}.{column}'"),
                        ));
                    }
                }
            }
        }
        GeneratorSpec::Expression { expr } => {
            if expr.trim().is_empty() {
                problems.push(err(
                    SchemaErrorKind::BadParameter,
                    col_path,
                    "expression generator requires a non-empty expression",
                ));
            }
        }
        GeneratorSpec::Sequence { .. } | GeneratorSpec::Distribution { .. } | GeneratorSpec::DatetimeSeries { .. } | GeneratorSpec::Faker { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc(extra_node: &str) -> String {
        format!(
            r#"{{
                "version": 1,
                "metadata": {{"name": "test"}},
                "timeframe": {{"start": "2024-01-01T00:00:00", "end": "2024-12-31T00:00:00"}},
                "nodes": {{
                    "users": {{
                        "kind": "entity",
                        "primary_key": "id",
                        "rows": 10,
                        "columns": {{
                            "id": {{"type": "int", "generator": {{"kind": "sequence"}}}}
                        }}
                    }}{extra_node}
                }}
            }}"#
        )
    }

    #[test]
    fn parses_minimal_schema() {
        let doc = minimal_doc("");
        let dataset = parse_schema(doc.as_bytes()).expect("should parse");
        assert_eq!(dataset.nodes.len(), 1);
    }

    #[test]
    fn rejects_unknown_top_level_field() {
        let doc = r#"{
            "version": 1,
            "metadata": {"name": "test"},
            "timeframe": {"start": "2024-01-01T00:00:00", "end": "2024-12-31T00:00:00"},
            "nodes": {},
            "bogus_field": 1
        }"#;
        let err = parse_schema(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DatagenError::Schema { .. }));
    }

    #[test]
    fn rejects_empty_nodes() {
        let doc = r#"{
            "version": 1,
            "metadata": {"name": "test"},
            "timeframe": {"start": "2024-01-01T00:00:00", "end": "2024-12-31T00:00:00"},
            "nodes": {}
        }"#;
        let err = parse_schema(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DatagenError::Schema { .. }));
    }

    #[test]
    fn fact_node_without_parent_is_rejected() {
        let doc = r#"{
            "version": 1,
            "metadata": {"name": "test"},
            "timeframe": {"start": "2024-01-01T00:00:00", "end": "2024-12-31T00:00:00"},
            "nodes": {
                "orders": {
                    "kind": "fact",
                    "primary_key": "id",
                    "columns": {
                        "id": {"type": "int", "generator": {"kind": "sequence"}}
                    }
                }
            }
        }"#;
        let err = parse_schema(doc.as_bytes()).unwrap_err();
        match err {
            DatagenError::SchemaMultiple(errs) => assert!(errs.len() >= 2),
            DatagenError::Schema { .. } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lookup_to_unknown_table_is_rejected() {
        let extra = r#","orders": {
            "kind": "fact",
            "primary_key": "user_id",
            "parent": "users",
            "fanout": {"kind": "uniform", "min": 1, "max": 3},
            "columns": {
                "user_id": {"type": "int", "generator": {"kind": "lookup", "table": "nope", "column": "id"}}
            }
        }"#;
        let doc = minimal_doc(extra);
        let err = parse_schema(doc.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatagenError::Schema { .. } | DatagenError::SchemaMultiple(_)
        ));
    }
}
