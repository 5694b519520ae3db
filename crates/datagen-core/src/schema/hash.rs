use sha2::{Digest, Sha256};

use super::types::Dataset;

/// A stable hash of a parsed schema document, used to detect whether a
/// sidecar metadata file and the schema it was generated from still agree.
///
/// Hashes the re-serialized `Dataset` rather than the original document
/// bytes so that whitespace/key-order differences in hand-edited schema
/// files don't register as a change.
pub fn schema_hash(dataset: &Dataset) -> String {
    let canonical = serde_json::to_vec(dataset).expect("Dataset always serializes");
    let digest = Sha256::digest(&canonical);
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse::parse_schema;

    fn fixture() -> Dataset {
        let schema = r#"{
            "version": 1,
            "metadata": {"name": "hash_test"},
            "timeframe": {"start": "2025-01-01T00:00:00", "end": "2025-01-02T00:00:00"},
            "nodes": {
                "users": {
                    "kind": "entity",
                    "primary_key": "id",
                    "rows": 10,
                    "columns": {
                        "id": {"type": "int", "generator": {"kind": "sequence", "start": 1, "step": 1}}
                    }
                }
            }
        }"#;
        parse_schema(schema.as_bytes()).expect("fixture schema should parse")
    }

    #[test]
    fn same_dataset_hashes_identically() {
        let a = fixture();
        let b = fixture();
        assert_eq!(schema_hash(&a), schema_hash(&b));
    }

    #[test]
    fn differing_datasets_hash_differently() {
        let a = fixture();
        let mut b = fixture();
        b.metadata.name = "different".to_string();
        assert_ne!(schema_hash(&a), schema_hash(&b));
    }
}
