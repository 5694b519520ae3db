//! # Lookup Pool
//!
//! Tracks already-generated rows so the `lookup` generator can reference
//! them once a node's dependencies have finished generating. Parent/target
//! nodes are fully generated before any node that looks them up (the
//! Dependency Planner guarantees this), so by the time a `lookup` generator
//! runs, its target pool is complete.

use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashMap;

use crate::generate::value::Value;

/// All rows generated so far for every node, keyed by node name. Used both
/// to serve `lookup` generators and to seed cross-table `effect` modifier
/// joins.
#[derive(Default)]
pub struct LookupPool {
    rows: HashMap<String, Vec<IndexMap<String, Value>>>,
}

impl LookupPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rows(&mut self, table: &str, rows: Vec<IndexMap<String, Value>>) {
        self.rows.insert(table.to_string(), rows);
    }

    pub fn table_rows(&self, table: &str) -> Option<&[IndexMap<String, Value>]> {
        self.rows.get(table).map(|v| v.as_slice())
    }

    pub fn pool_size(&self, table: &str) -> usize {
        self.rows.get(table).map(|r| r.len()).unwrap_or(0)
    }

    /// Pick `column` from a uniformly random row of `table`.
    pub fn pick(&self, table: &str, column: &str, rng: &mut impl Rng) -> Option<Value> {
        let rows = self.rows.get(table)?;
        if rows.is_empty() {
            return None;
        }
        let row = &rows[rng.random_range(0..rows.len())];
        row.get(column).cloned()
    }

    /// Pick `column` from a uniformly random row of `table` whose
    /// `on_column` equals `on_value` — the join-key-matched form of
    /// `lookup`. Returns `None` if no row matches.
    pub fn pick_matching(
        &self,
        table: &str,
        column: &str,
        on_column: &str,
        on_value: &Value,
        rng: &mut impl Rng,
    ) -> Option<Value> {
        let rows = self.rows.get(table)?;
        let candidates: Vec<&IndexMap<String, Value>> = rows
            .iter()
            .filter(|row| row.get(on_column).map(|v| v == on_value).unwrap_or(false))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let row = candidates[rng.random_range(0..candidates.len())];
        row.get(column).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn row(id: i64, dept: &str) -> IndexMap<String, Value> {
        let mut r = IndexMap::new();
        r.insert("id".to_string(), Value::Int(id));
        r.insert("dept".to_string(), Value::owned(dept));
        r
    }

    #[test]
    fn picks_uniformly_from_recorded_rows() {
        let mut pool = LookupPool::new();
        pool.record_rows("users", vec![row(1, "eng"), row(2, "eng"), row(3, "sales")]);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let picked = pool.pick("users", "id", &mut rng).unwrap();
        assert!(matches!(picked, Value::Int(1..=3)));
    }

    #[test]
    fn matching_filters_by_on_column() {
        let mut pool = LookupPool::new();
        pool.record_rows("users", vec![row(1, "eng"), row(2, "eng"), row(3, "sales")]);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let target = Value::owned("sales");
        let picked = pool
            .pick_matching("users", "id", "dept", &target, &mut rng)
            .unwrap();
        assert_eq!(picked, Value::Int(3));
    }

    #[test]
    fn matching_returns_none_when_no_row_matches() {
        let mut pool = LookupPool::new();
        pool.record_rows("users", vec![row(1, "eng")]);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let target = Value::owned("marketing");
        assert!(pool
            .pick_matching("users", "id", "dept", &target, &mut rng)
            .is_none());
    }

    #[test]
    fn empty_pool_returns_none() {
        let pool = LookupPool::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(pool.pick("users", "id", &mut rng).is_none());
    }
}
