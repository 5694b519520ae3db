//! # Effect Engine
//!
//! The join-matching algorithm shared by the `effect` column modifier
//! (scales a generated value) and table-level fanout scaling (scales a
//! sampled child-row count). Both need the same thing: find every row of an
//! event table whose `on` join keys match this row's driver row and whose
//! own `[start_col, end_col]` window contains the driver timestamp, then
//! combine the matched rows' `map.field` values into a single multiplier.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::generate::value::Value;
use crate::schema::types::{EffectCombine, EffectMap, EffectWindow};

/// Every row of `event_rows` whose `on` mapping matches `local_row` and
/// whose own window (read per-row from `window.start_col`/`end_col`)
/// contains `driver_time`. An empty `on` map matches every row unconditionally
/// (a "global effect").
pub fn matching_rows<'a>(
    event_rows: &'a [IndexMap<String, Value>],
    on: &IndexMap<String, String>,
    local_row: &IndexMap<String, Value>,
    window: &EffectWindow,
    driver_time: NaiveDateTime,
) -> Vec<&'a IndexMap<String, Value>> {
    event_rows
        .iter()
        .filter(|event| {
            let keys_match = on
                .iter()
                .all(|(local_key, effect_key)| local_row.get(local_key) == event.get(effect_key));
            if !keys_match {
                return false;
            }
            let start = event.get(&window.start_col).and_then(Value::as_timestamp);
            let end = event.get(&window.end_col).and_then(Value::as_timestamp);
            match (start, end) {
                (Some(start), Some(end)) => driver_time >= start && driver_time <= end,
                _ => false,
            }
        })
        .collect()
}

/// Combine the matched rows' `map.field` values (product for `mul`, sum for
/// `add`), defaulting a matched row missing `field` to the combine's
/// identity (1.0 for `mul`, 0.0 for `add`). No matches at all contributes
/// `map.default`.
pub fn combined_multiplier(matches: &[&IndexMap<String, Value>], map: &EffectMap) -> f64 {
    if matches.is_empty() {
        return map.default;
    }
    match map.op {
        EffectCombine::Mul => matches
            .iter()
            .map(|row| row.get(&map.field).and_then(Value::as_float).unwrap_or(1.0))
            .product(),
        EffectCombine::Add => matches
            .iter()
            .map(|row| row.get(&map.field).and_then(Value::as_float).unwrap_or(0.0))
            .sum(),
    }
}

/// Apply the resolved multiplier to `base` under `op`.
pub fn apply(base: f64, multiplier: f64, op: EffectCombine) -> f64 {
    match op {
        EffectCombine::Mul => base * multiplier,
        EffectCombine::Add => base + multiplier,
    }
}

/// The driver timestamp an effect modifier matches event windows against:
/// the current row's first datetime column, else the parent row's first
/// datetime column, else the midpoint of the global time window.
pub fn resolve_driver_time(
    current_row: Option<&IndexMap<String, Value>>,
    driver_row: Option<&IndexMap<String, Value>>,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> NaiveDateTime {
    current_row
        .and_then(first_timestamp)
        .or_else(|| driver_row.and_then(first_timestamp))
        .unwrap_or_else(|| midpoint(window_start, window_end))
}

fn first_timestamp(row: &IndexMap<String, Value>) -> Option<NaiveDateTime> {
    row.values().find_map(Value::as_timestamp)
}

pub fn midpoint(start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
    start + (end - start) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn promo(id: i64, start: u32, end: u32, mult: f64) -> IndexMap<String, Value> {
        let mut row = IndexMap::new();
        row.insert("id".to_string(), Value::Int(id));
        row.insert("start".to_string(), Value::Timestamp(ts(start)));
        row.insert("end".to_string(), Value::Timestamp(ts(end)));
        row.insert("mult".to_string(), Value::Float(mult));
        row
    }

    fn window() -> EffectWindow {
        EffectWindow { start_col: "start".to_string(), end_col: "end".to_string() }
    }

    #[test]
    fn matches_require_on_equality_and_window_containment() {
        let events = vec![promo(1, 1, 10, 1.5), promo(2, 20, 30, 2.0)];
        let mut local = IndexMap::new();
        local.insert("promotion_id".to_string(), Value::Int(1));
        let mut on = IndexMap::new();
        on.insert("promotion_id".to_string(), "id".to_string());

        let matches = matching_rows(&events, &on, &local, &window(), ts(5));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn out_of_window_driver_time_does_not_match() {
        let events = vec![promo(1, 1, 10, 1.5)];
        let local = IndexMap::new();
        let matches = matching_rows(&events, &IndexMap::new(), &local, &window(), ts(20));
        assert!(matches.is_empty());
    }

    #[test]
    fn empty_on_map_is_a_global_effect() {
        let events = vec![promo(1, 1, 10, 1.5), promo(2, 1, 10, 2.0)];
        let local = IndexMap::new();
        let matches = matching_rows(&events, &IndexMap::new(), &local, &window(), ts(5));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn mul_combine_multiplies_matched_fields() {
        let map = EffectMap { field: "mult".to_string(), op: EffectCombine::Mul, default: 1.0 };
        let a = promo(1, 1, 10, 1.5);
        let b = promo(2, 1, 10, 2.0);
        let multiplier = combined_multiplier(&[&a, &b], &map);
        assert!((multiplier - 3.0).abs() < 1e-9);
        assert_eq!(apply(10.0, multiplier, map.op), 30.0);
    }

    #[test]
    fn add_combine_sums_matched_fields() {
        let map = EffectMap { field: "mult".to_string(), op: EffectCombine::Add, default: 0.0 };
        let a = promo(1, 1, 10, 1.5);
        let b = promo(2, 1, 10, 2.0);
        let multiplier = combined_multiplier(&[&a, &b], &map);
        assert!((multiplier - 3.5).abs() < 1e-9);
        assert_eq!(apply(10.0, multiplier, map.op), 13.5);
    }

    #[test]
    fn no_matches_contributes_default() {
        let map = EffectMap { field: "mult".to_string(), op: EffectCombine::Mul, default: 0.8 };
        let multiplier = combined_multiplier(&[], &map);
        assert_eq!(multiplier, 0.8);
    }

    #[test]
    fn matched_row_missing_field_contributes_identity() {
        let mut bare = IndexMap::new();
        bare.insert("id".to_string(), Value::Int(9));
        let mul_map = EffectMap { field: "mult".to_string(), op: EffectCombine::Mul, default: 1.0 };
        assert_eq!(combined_multiplier(&[&bare], &mul_map), 1.0);
        let add_map = EffectMap { field: "mult".to_string(), op: EffectCombine::Add, default: 0.0 };
        assert_eq!(combined_multiplier(&[&bare], &add_map), 0.0);
    }

    #[test]
    fn driver_time_prefers_current_row_then_parent_then_midpoint() {
        let mut current = IndexMap::new();
        current.insert("ts".to_string(), Value::Timestamp(ts(3)));
        let mut parent = IndexMap::new();
        parent.insert("ts".to_string(), Value::Timestamp(ts(7)));

        assert_eq!(
            resolve_driver_time(Some(&current), Some(&parent), ts(1), ts(31)),
            ts(3)
        );
        assert_eq!(resolve_driver_time(None, Some(&parent), ts(1), ts(31)), ts(7));
        assert_eq!(resolve_driver_time(None, None, ts(1), ts(31)), midpoint(ts(1), ts(31)));
    }
}
