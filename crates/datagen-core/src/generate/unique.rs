//! # Uniqueness Tracking
//!
//! A small helper used by the validator to check primary-key and declared
//! `unique` constraints without re-deriving a key format at every call
//! site. Not used during generation itself — constraints are validator-only
//! (see the Validator's structural checks).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::generate::value::Value;

/// Build the composite unique-key string for one row across `columns`, in
/// the order given. Returns `None` if any column is null (nulls are
/// excluded from uniqueness checking, matching PK/unique semantics).
pub fn composite_key(row: &IndexMap<String, Value>, columns: &[String]) -> Option<String> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        let value = row.get(column)?;
        if value.is_null() {
            return None;
        }
        parts.push(value.to_unique_key());
    }
    Some(parts.join("\u{1}"))
}

/// Count how many rows out of `rows` violate uniqueness over `columns`,
/// treating any row with a null in one of those columns as exempt.
pub fn count_duplicates(rows: &[IndexMap<String, Value>], columns: &[String]) -> usize {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    for row in rows {
        if let Some(key) = composite_key(row, columns) {
            if !seen.insert(key) {
                duplicates += 1;
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str) -> IndexMap<String, Value> {
        let mut r = IndexMap::new();
        r.insert("id".to_string(), Value::Int(id));
        r.insert("name".to_string(), Value::owned(name));
        r
    }

    #[test]
    fn detects_single_column_duplicate() {
        let rows = vec![row(1, "a"), row(1, "b"), row(2, "c")];
        assert_eq!(count_duplicates(&rows, &["id".to_string()]), 1);
    }

    #[test]
    fn composite_key_distinguishes_column_order_independent_collisions() {
        let rows = vec![row(1, "a"), row(1, "a")];
        assert_eq!(
            count_duplicates(&rows, &["id".to_string(), "name".to_string()]),
            1
        );
    }

    #[test]
    fn null_values_are_exempt_from_uniqueness() {
        let mut r1 = row(1, "a");
        r1.insert("name".to_string(), Value::Null);
        let mut r2 = row(1, "a");
        r2.insert("name".to_string(), Value::Null);
        assert_eq!(count_duplicates(&[r1, r2], &["name".to_string()]), 0);
    }
}
