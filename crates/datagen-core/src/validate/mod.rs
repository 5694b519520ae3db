//! # Validator
//!
//! Runs structural, value, and behavioral checks over a finalized dataset
//! and rolls them up into a weighted quality score. Never mutates its
//! input; a dataset that fails every check still produces a complete
//! `Report` with score `0.0`, never an error — a validation failure is a
//! finding, not a `DatagenError`.

use std::collections::HashSet;

use chrono::Datelike;
use indexmap::IndexMap;
use regex::Regex;

use crate::generate::effect;
use crate::generate::engine::GeneratedTables;
use crate::generate::modifiers::temporal_weight;
use crate::generate::unique::count_duplicates;
use crate::generate::value::Value;
use crate::schema::types::{
    CompositeEffectTarget, Dataset, EnumConstraint, ForeignKeyConstraint, InequalityConstraint,
    MeanInRangeTarget, ModifierSpec, PatternConstraint, RangeConstraint, UniqueConstraint,
    WeekendShareTarget,
};

/// One named pass/fail check, with a human-readable detail for either
/// outcome (a detail on pass is as useful as one on failure — "ok, 0/500
/// violations" beats silence when eyeballing a report).
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// The full validation report: every check that ran, bucketed by weight,
/// plus the overall `[0, 100]` quality score.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub structural: Vec<CheckResult>,
    pub value: Vec<CheckResult>,
    pub behavioral: Vec<CheckResult>,
    pub score: f64,
}

impl Report {
    pub fn checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.structural.iter().chain(&self.value).chain(&self.behavioral)
    }

    pub fn all_passed(&self) -> bool {
        self.checks().all(|c| c.passed)
    }
}

const STRUCTURAL_WEIGHT: f64 = 0.50;
const VALUE_WEIGHT: f64 = 0.30;
const BEHAVIORAL_WEIGHT: f64 = 0.20;

fn bucket_score(checks: &[CheckResult], weight: f64) -> f64 {
    if checks.is_empty() {
        return weight * 100.0;
    }
    let passed = checks.iter().filter(|c| c.passed).count() as f64;
    (passed / checks.len() as f64) * weight * 100.0
}

/// Run every check over `tables` against the `dataset` it was generated
/// from, and compute the weighted quality score.
pub fn validate(dataset: &Dataset, tables: &GeneratedTables) -> Report {
    let structural = structural_checks(dataset, tables);
    let value = value_checks(dataset, tables);
    let behavioral = behavioral_checks(dataset, tables);

    let score =
        bucket_score(&structural, STRUCTURAL_WEIGHT) + bucket_score(&value, VALUE_WEIGHT) + bucket_score(&behavioral, BEHAVIORAL_WEIGHT);

    Report {
        structural,
        value,
        behavioral,
        score,
    }
}

fn rows_of<'a>(tables: &'a GeneratedTables, table: &str) -> Option<&'a [IndexMap<String, Value>]> {
    tables.get(table).map(|t| t.rows.as_slice())
}

fn structural_checks(dataset: &Dataset, tables: &GeneratedTables) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    for (node_name, node) in &dataset.nodes {
        let Some(rows) = rows_of(tables, node_name) else {
            checks.push(CheckResult::fail(
                format!("table_exists:{node_name}"),
                "table was not produced by the executor",
            ));
            continue;
        };

        let dup_count = count_duplicates(rows, std::slice::from_ref(&node.primary_key));
        checks.push(pass_if(
            dup_count == 0,
            format!("pk_unique:{node_name}"),
            format!("{dup_count} duplicate primary-key value(s)"),
        ));

        let null_count = rows
            .iter()
            .filter(|row| row.get(&node.primary_key).map(Value::is_null).unwrap_or(true))
            .count();
        checks.push(pass_if(
            null_count == 0,
            format!("pk_non_null:{node_name}"),
            format!("{null_count} null primary-key value(s) out of {}", rows.len()),
        ));
    }

    for uc in &dataset.constraints.unique {
        checks.push(unique_constraint_check(tables, uc));
    }
    for fk in &dataset.constraints.foreign_keys {
        checks.push(foreign_key_check(tables, fk));
    }

    checks
}

fn pass_if(ok: bool, name: impl Into<String>, detail: impl Into<String>) -> CheckResult {
    if ok {
        CheckResult::pass(name, detail)
    } else {
        CheckResult::fail(name, detail)
    }
}

fn unique_constraint_check(tables: &GeneratedTables, uc: &UniqueConstraint) -> CheckResult {
    let name = format!("unique:{}:{}", uc.table, uc.columns.join("+"));
    match rows_of(tables, &uc.table) {
        None => CheckResult::fail(name, format!("table '{}' does not exist", uc.table)),
        Some(rows) => {
            let dup_count = count_duplicates(rows, &uc.columns);
            pass_if(dup_count == 0, name, format!("{dup_count} duplicate combination(s)"))
        }
    }
}

fn foreign_key_check(tables: &GeneratedTables, fk: &ForeignKeyConstraint) -> CheckResult {
    let name = format!("foreign_key:{}.{}->{}.{}", fk.table, fk.column, fk.references_table, fk.references_column);
    let (Some(child_rows), Some(parent_rows)) = (rows_of(tables, &fk.table), rows_of(tables, &fk.references_table)) else {
        return CheckResult::fail(name, "child or parent table does not exist");
    };

    let parent_values: HashSet<String> = parent_rows
        .iter()
        .filter_map(|row| row.get(&fk.references_column))
        .filter(|v| !v.is_null())
        .map(Value::to_unique_key)
        .collect();

    let violations = child_rows
        .iter()
        .filter_map(|row| row.get(&fk.column))
        .filter(|v| !v.is_null())
        .filter(|v| !parent_values.contains(&v.to_unique_key()))
        .count();

    pass_if(violations == 0, name, format!("{violations} dangling reference(s)"))
}

fn value_checks(dataset: &Dataset, tables: &GeneratedTables) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    for range in &dataset.constraints.ranges {
        checks.push(range_check(tables, range));
    }
    for inequality in &dataset.constraints.inequalities {
        checks.push(inequality_check(tables, inequality));
    }
    for pattern in &dataset.constraints.pattern {
        checks.push(pattern_check(tables, pattern));
    }
    for enum_constraint in &dataset.constraints.r#enum {
        checks.push(enum_check(tables, enum_constraint));
    }

    checks
}

fn range_check(tables: &GeneratedTables, range: &RangeConstraint) -> CheckResult {
    let name = format!("range:{}.{}", range.table, range.column);
    let Some(rows) = rows_of(tables, &range.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", range.table));
    };

    let violations = rows
        .iter()
        .filter_map(|row| row.get(&range.column))
        .filter(|v| !v.is_null())
        .filter_map(Value::as_float)
        .filter(|n| {
            range.min.map(|lo| *n < lo).unwrap_or(false) || range.max.map(|hi| *n > hi).unwrap_or(false)
        })
        .count();

    pass_if(violations == 0, name, format!("{violations} out-of-range value(s)"))
}

fn inequality_check(tables: &GeneratedTables, ineq: &InequalityConstraint) -> CheckResult {
    let name = format!("inequality:{}:{} {} {}", ineq.table, ineq.left, ineq.op, ineq.right);
    let Some(rows) = rows_of(tables, &ineq.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", ineq.table));
    };

    let mut violations = 0usize;
    let mut compared = 0usize;
    for row in rows {
        let (Some(left), Some(right)) = (
            row.get(&ineq.left).and_then(Value::as_float),
            row.get(&ineq.right).and_then(Value::as_float),
        ) else {
            continue;
        };
        compared += 1;
        let holds = match ineq.op.as_str() {
            "<" => left < right,
            "<=" | "\u{2264}" => left <= right,
            ">" => left > right,
            ">=" | "\u{2265}" => left > right || left == right,
            "=" | "==" => left == right,
            _ => true,
        };
        if !holds {
            violations += 1;
        }
    }

    pass_if(violations == 0, name, format!("{violations}/{compared} row(s) violate the inequality"))
}

fn pattern_check(tables: &GeneratedTables, pattern: &PatternConstraint) -> CheckResult {
    let name = format!("pattern:{}.{}", pattern.table, pattern.column);
    let Some(rows) = rows_of(tables, &pattern.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", pattern.table));
    };
    let regex = match Regex::new(&pattern.regex) {
        Ok(r) => r,
        Err(e) => return CheckResult::fail(name, format!("invalid regex: {e}")),
    };

    let violations = rows
        .iter()
        .filter_map(|row| row.get(&pattern.column))
        .filter(|v| !v.is_null())
        .filter(|v| !regex.is_match(&v.to_csv_string()))
        .count();

    pass_if(violations == 0, name, format!("{violations} value(s) fail to match"))
}

fn enum_check(tables: &GeneratedTables, enum_constraint: &EnumConstraint) -> CheckResult {
    let name = format!("enum:{}.{}", enum_constraint.table, enum_constraint.column);
    let Some(rows) = rows_of(tables, &enum_constraint.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", enum_constraint.table));
    };
    let allowed: HashSet<String> = enum_constraint
        .values
        .iter()
        .map(|v| v.to_string().trim_matches('"').to_string())
        .collect();

    let violations = rows
        .iter()
        .filter_map(|row| row.get(&enum_constraint.column))
        .filter(|v| !v.is_null())
        .filter(|v| !allowed.contains(&v.to_csv_string()))
        .count();

    pass_if(violations == 0, name, format!("{violations} value(s) outside the declared set"))
}

fn behavioral_checks(dataset: &Dataset, tables: &GeneratedTables) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    if let Some(target) = &dataset.targets.weekend_share {
        checks.push(weekend_share_check(tables, target));
    }
    for target in &dataset.targets.mean_in_range {
        checks.push(mean_in_range_check(tables, target));
    }
    for target in &dataset.targets.composite_effect {
        checks.push(composite_effect_check(dataset, tables, target));
    }

    checks
}

fn weekend_share_check(tables: &GeneratedTables, target: &WeekendShareTarget) -> CheckResult {
    let name = format!("weekend_share:{}.{}", target.table, target.time_column);
    let Some(rows) = rows_of(tables, &target.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", target.table));
    };

    let timestamps: Vec<_> = rows
        .iter()
        .filter_map(|row| row.get(&target.time_column))
        .filter_map(Value::as_timestamp)
        .collect();
    if timestamps.is_empty() {
        return CheckResult::fail(name, "no timestamp values to measure");
    }

    let weekend = timestamps
        .iter()
        .filter(|ts| matches!(ts.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun))
        .count();
    let share = weekend as f64 / timestamps.len() as f64;

    pass_if(
        share >= target.min_share && share <= target.max_share,
        name,
        format!("weekend share {share:.4}, expected [{}, {}]", target.min_share, target.max_share),
    )
}

fn mean_in_range_check(tables: &GeneratedTables, target: &MeanInRangeTarget) -> CheckResult {
    let name = format!("mean_in_range:{}.{}", target.table, target.column);
    let Some(rows) = rows_of(tables, &target.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", target.table));
    };

    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.get(&target.column))
        .filter_map(Value::as_float)
        .collect();
    if values.is_empty() {
        return CheckResult::fail(name, "no numeric values to average");
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    pass_if(
        mean >= target.min && mean <= target.max,
        name,
        format!("mean {mean:.4}, expected [{}, {}]", target.min, target.max),
    )
}

/// Bucket rows by day of week (the coarsest, always-available dimension)
/// and compare the observed per-bucket average, normalized by the overall
/// mean, against the expected multiplier replayed from the column's
/// declared `seasonality`/`effect` modifiers.
fn composite_effect_check(dataset: &Dataset, tables: &GeneratedTables, target: &CompositeEffectTarget) -> CheckResult {
    let name = format!("composite_effect:{}.{}", target.table, target.column);
    let Some(node) = dataset.nodes.get(&target.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", target.table));
    };
    let Some(rows) = rows_of(tables, &target.table) else {
        return CheckResult::fail(name, format!("table '{}' does not exist", target.table));
    };
    let Some(column) = node.columns.get(&target.column) else {
        return CheckResult::fail(name, format!("column '{}' does not exist", target.column));
    };

    let time_column = rows
        .iter()
        .flat_map(|row| row.iter())
        .find(|(_, v)| v.as_timestamp().is_some())
        .map(|(k, _)| k.clone());

    let mut observed_buckets = [0f64; 7];
    let mut observed_counts = [0usize; 7];
    let mut expected_buckets = [0f64; 7];
    let mut expected_counts = [0usize; 7];
    let mut overall_sum = 0.0;
    let mut overall_count = 0usize;

    for row in rows {
        let Some(value) = row.get(&target.column).and_then(Value::as_float) else {
            continue;
        };
        let bucket = match time_column.as_ref().and_then(|c| row.get(c)).and_then(Value::as_timestamp) {
            Some(ts) => ts.weekday().num_days_from_monday() as usize,
            None => overall_count % 7,
        };

        observed_buckets[bucket] += value;
        observed_counts[bucket] += 1;
        overall_sum += value;
        overall_count += 1;

        let expected = expected_multiplier(dataset, tables, row, &column.modifiers);
        expected_buckets[bucket] += expected;
        expected_counts[bucket] += 1;
    }

    if overall_count == 0 {
        return CheckResult::fail(name, "no numeric values to compare");
    }
    let overall_mean = overall_sum / overall_count as f64;

    let mut abs_errors = Vec::new();
    let mut pct_errors = Vec::new();
    for bucket in 0..7 {
        if observed_counts[bucket] == 0 || expected_counts[bucket] == 0 {
            continue;
        }
        let observed_ratio = (observed_buckets[bucket] / observed_counts[bucket] as f64) / overall_mean;
        let expected_ratio = expected_buckets[bucket] / expected_counts[bucket] as f64;
        let error = (observed_ratio - expected_ratio).abs();
        abs_errors.push(error);
        if expected_ratio.abs() > f64::EPSILON {
            pct_errors.push(error / expected_ratio.abs());
        }
    }

    if abs_errors.is_empty() {
        return CheckResult::fail(name, "no comparable buckets");
    }
    let mae = abs_errors.iter().sum::<f64>() / abs_errors.len() as f64;
    let mape = if pct_errors.is_empty() {
        mae
    } else {
        pct_errors.iter().sum::<f64>() / pct_errors.len() as f64
    };

    pass_if(
        mape <= target.mape_tolerance,
        name,
        format!("MAPE {mape:.4} against tolerance {}", target.mape_tolerance),
    )
}

/// Replay the multiplicative contribution of a column's `seasonality` and
/// `effect` modifiers for one row, ignoring modifiers that don't
/// contribute a bucketable ratio (`multiply`, `add`, `clamp`, `jitter`,
/// `map_values`, `time_jitter`, `outliers`).
fn expected_multiplier(dataset: &Dataset, tables: &GeneratedTables, row: &IndexMap<String, Value>, modifiers: &[ModifierSpec]) -> f64 {
    let mut multiplier = 1.0;
    for modifier in modifiers {
        match modifier {
            ModifierSpec::Seasonality { pattern, time_column } => {
                let ts = time_column
                    .as_ref()
                    .and_then(|c| row.get(c))
                    .and_then(Value::as_timestamp)
                    .or_else(|| row.values().find_map(Value::as_timestamp));
                if let Some(ts) = ts {
                    multiplier *= temporal_weight(pattern, ts);
                }
            }
            ModifierSpec::Effect { event_table, on, window, map } => {
                if let Some(event_rows) = rows_of(tables, event_table) {
                    let driver_time = effect::resolve_driver_time(
                        Some(row),
                        None,
                        dataset.timeframe.start,
                        dataset.timeframe.end,
                    );
                    let matches = effect::matching_rows(event_rows, on, row, window, driver_time);
                    let factor = effect::combined_multiplier(&matches, map);
                    multiplier = effect::apply(multiplier, factor, map.op);
                }
            }
            _ => {}
        }
    }
    multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::engine::{generate, GeneratedTable};
    use datagen_testutil::{ecommerce_dataset, two_table_dataset};

    #[test]
    fn valid_generated_dataset_scores_one_hundred() {
        let dataset = ecommerce_dataset();
        let tables = generate(&dataset, 42, None).unwrap();
        let report = validate(&dataset, &tables);
        assert_eq!(report.score, 100.0);
        assert!(report.all_passed());
    }

    #[test]
    fn missing_table_fails_structural_checks_but_still_scores() {
        let dataset = two_table_dataset();
        let mut tables = generate(&dataset, 1, None).unwrap();
        tables.shift_remove("events");
        let report = validate(&dataset, &tables);
        assert!(!report.all_passed());
        assert!(report.score < 100.0);
    }

    #[test]
    fn duplicate_primary_keys_are_detected() {
        let dataset = two_table_dataset();
        let mut tables = generate(&dataset, 1, None).unwrap();
        let users = tables.get_mut("users").unwrap();
        let duplicate_row = users.rows[0].clone();
        users.rows.push(duplicate_row);
        let report = validate(&dataset, &tables);
        let pk_check = report.structural.iter().find(|c| c.name == "pk_unique:users").unwrap();
        assert!(!pk_check.passed);
    }

    #[test]
    fn validator_is_idempotent() {
        let dataset = ecommerce_dataset();
        let tables = generate(&dataset, 7, None).unwrap();
        let first = validate(&dataset, &tables);
        let second = validate(&dataset, &tables);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_constraint_and_target_buckets_score_full_weight() {
        let dataset = two_table_dataset();
        let tables = generate(&dataset, 1, None).unwrap();
        let report = validate(&dataset, &tables);
        // two_table_dataset declares no value/behavioral constraints, so
        // those buckets should contribute their full weight.
        assert!(report.value.is_empty());
        assert!(report.behavioral.is_empty());
        assert_eq!(report.score, 100.0);
    }

    #[test]
    fn dangling_foreign_key_is_flagged() {
        let dataset = two_table_dataset();
        let tables = generate(&dataset, 1, None).unwrap();
        let mut tables = tables;
        if let Some(events) = tables.get_mut("events") {
            if let Some(row) = events.rows.first_mut() {
                row.insert("user_id".to_string(), Value::Int(999_999));
            }
        }
        let mut dataset = dataset;
        dataset.constraints.foreign_keys.push(crate::schema::types::ForeignKeyConstraint {
            table: "events".to_string(),
            column: "user_id".to_string(),
            references_table: "users".to_string(),
            references_column: "id".to_string(),
        });
        let report = validate(&dataset, &tables);
        let fk_check = report
            .structural
            .iter()
            .find(|c| c.name.starts_with("foreign_key:"))
            .unwrap();
        assert!(!fk_check.passed);
    }

    #[test]
    fn unused_generated_table_import_is_exercised() {
        let table = GeneratedTable { rows: Vec::new() };
        assert!(table.rows.is_empty());
    }
}
