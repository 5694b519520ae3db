//! # Executor
//!
//! Consumes the Dependency Planner's order and produces every table
//! in-memory: for each node, resolve its row count (fixed for
//! `entity`/`vocab`, summed fanout samples for `fact`), then for each
//! column in declared order run its generator and modifier pipeline before
//! casting to the declared type. Generation is all-or-nothing: any error
//! aborts the whole run, matching the state machine's `Failed` transition
//! being terminal for the dataset.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{DatagenError, GeneratorErrorKind, Result};
use crate::generate::expression::{self, CompiledExpr};
use crate::generate::fanout;
use crate::generate::foreign_key::LookupPool;
use crate::generate::generators;
use crate::generate::modifiers::{self, ModifierContext};
use crate::generate::providers;
use crate::generate::providers::LocaleTable;
use crate::generate::value::Value;
use crate::graph::{self, DependencyGraph};
use crate::schema::types::{
    Column, Dataset, FanoutSpec, GeneratorSpec, ModifierSpec, Node, NodeKind, TemporalPattern,
};
use crate::seed;

/// Cooperative cancellation, checked between nodes. Checking happens only
/// at level boundaries (see §5 of the design: no suspension points inside
/// a column's production).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One finalized table: a flat list of rows, each an ordered map from
/// column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedTable {
    pub rows: Vec<IndexMap<String, Value>>,
}

/// The finalized dataset: every node's table, in the order declared in the
/// schema document.
pub type GeneratedTables = IndexMap<String, GeneratedTable>;

/// Produce every table of `dataset` deterministically from `master_seed`.
pub fn generate(
    dataset: &Dataset,
    master_seed: u64,
    cancellation: Option<&CancellationToken>,
) -> Result<GeneratedTables> {
    let graph = DependencyGraph::from_dataset(dataset);
    let order = graph::plan(&graph)?;

    let mut pool = LookupPool::new();
    let mut computed: IndexMap<String, GeneratedTable> = IndexMap::new();

    for node_name in &order.nodes {
        if let Some(token) = cancellation {
            if token.is_cancelled() {
                return Err(DatagenError::Cancelled);
            }
        }

        let node = dataset
            .nodes
            .get(node_name)
            .expect("planner only ever returns declared node names");

        let table = generate_node(dataset, node_name, node, master_seed, &pool)?;
        pool.record_rows(node_name, table.rows.clone());
        computed.insert(node_name.clone(), table);
    }

    let mut result = IndexMap::new();
    for name in dataset.nodes.keys() {
        if let Some(table) = computed.shift_remove(name) {
            result.insert(name.clone(), table);
        }
    }
    Ok(result)
}

/// Fraction of a self-referential column's rows forced to null so that
/// every later row has a non-empty candidate set to look up against.
const SELF_REFERENCE_NULLIFY_FRACTION: f64 = 0.005;

fn generate_node(
    dataset: &Dataset,
    node_name: &str,
    node: &Node,
    master_seed: u64,
    pool: &LookupPool,
) -> Result<GeneratedTable> {
    let (row_count, drivers) = resolve_row_count(dataset, node_name, node, master_seed, pool)?;
    let mut rows: Vec<IndexMap<String, Value>> = (0..row_count).map(|_| IndexMap::new()).collect();

    for (column_name, column) in &node.columns {
        let mut rng = seed::derive(master_seed, &[node_name, column_name.as_str()]);

        let datetime_candidates = match &column.generator {
            GeneratorSpec::DatetimeSeries { freq, pattern } => {
                Some(build_datetime_candidates(dataset, freq, pattern))
            }
            _ => None,
        };
        let compiled_expr = match &column.generator {
            GeneratorSpec::Expression { expr } => Some(
                expression::compile(expr)
                    .map_err(|e| with_context(e, node_name, column_name))?,
            ),
            _ => None,
        };

        for row_index in 0..row_count {
            let driver_row = drivers.as_ref().map(|d| &d[row_index]);

            let raw_value = dispatch_generator(
                node_name,
                column_name,
                &column.generator,
                row_index,
                &mut rng,
                &rows,
                driver_row,
                node,
                column,
                pool,
                compiled_expr.as_ref(),
                datetime_candidates.as_ref(),
            )?;

            let modified = {
                let ctx = ModifierContext {
                    row_so_far: &rows[row_index],
                    driver_row,
                    event_tables: &|table| pool.table_rows(table),
                    window_start: dataset.timeframe.start,
                    window_end: dataset.timeframe.end,
                };
                modifiers::apply_chain(raw_value, &column.modifiers, &ctx, &mut rng)
                    .map_err(|e| with_context(e, node_name, column_name))?
            };

            let nullable_value = apply_nullability(modified, column, &mut rng);
            let final_value = generators::cast_to_column_type(nullable_value, column.ty)
                .map_err(|e| with_context(e, node_name, column_name))?;

            rows[row_index].insert(column_name.clone(), final_value);
        }
    }

    Ok(GeneratedTable { rows })
}

fn with_context(err: DatagenError, node: &str, column: &str) -> DatagenError {
    match err {
        DatagenError::Generator { kind, detail, .. } => DatagenError::Generator {
            node: node.to_string(),
            column: column.to_string(),
            kind,
            detail,
        },
        DatagenError::Modifier {
            index, kind, detail, ..
        } => DatagenError::Modifier {
            node: node.to_string(),
            column: column.to_string(),
            index,
            kind,
            detail,
        },
        other => other,
    }
}

fn apply_nullability(value: Value, column: &Column, rng: &mut impl Rng) -> Value {
    if value.is_null() {
        return value;
    }
    if column.nullable && column.null_probability > 0.0 {
        let roll: f64 = rng.random();
        if roll < column.null_probability {
            return Value::Null;
        }
    }
    value
}

/// Resolve a node's row count and, for `fact` nodes, the per-row driver
/// parent row that produced it (used to bind a plain, `on`-less lookup of
/// the declared parent to the exact row that fanned it out).
fn resolve_row_count(
    dataset: &Dataset,
    node_name: &str,
    node: &Node,
    master_seed: u64,
    pool: &LookupPool,
) -> Result<(usize, Option<Vec<IndexMap<String, Value>>>)> {
    match node.kind {
        NodeKind::Entity => Ok((node.rows.unwrap_or(1000), None)),
        NodeKind::Vocab => Ok((resolve_vocab_row_count(node), None)),
        NodeKind::Fact => {
            let parent_name = node
                .parent
                .as_ref()
                .expect("schema validation requires fact nodes to declare a parent");
            let parent_pk = &dataset
                .nodes
                .get(parent_name)
                .expect("schema validation requires the parent to exist")
                .primary_key;
            let parent_rows = pool.table_rows(parent_name).ok_or_else(|| {
                DatagenError::Planner {
                    detail: format!("parent node '{parent_name}' has not been generated yet"),
                }
            })?;
            let drivers = resolve_fanout_drivers(
                dataset,
                node_name,
                node,
                parent_rows,
                parent_pk,
                master_seed,
                pool,
            )?;
            let count = drivers.len();
            Ok((count, Some(drivers)))
        }
    }
}

fn resolve_vocab_row_count(node: &Node) -> usize {
    for column in node.columns.values() {
        if let GeneratorSpec::EnumList { values } = &column.generator {
            return values.len();
        }
    }
    node.rows.unwrap_or(1000)
}

fn fanout_bounds(spec: &FanoutSpec) -> (u64, u64) {
    match spec {
        FanoutSpec::Poisson { min, max, .. } => (*min, *max),
        FanoutSpec::Uniform { min, max } => (*min, *max),
    }
}

fn resolve_fanout_drivers(
    dataset: &Dataset,
    node_name: &str,
    node: &Node,
    parent_rows: &[IndexMap<String, Value>],
    parent_pk: &str,
    master_seed: u64,
    pool: &LookupPool,
) -> Result<Vec<IndexMap<String, Value>>> {
    let fanout_spec = node
        .fanout
        .as_ref()
        .expect("schema validation requires fact nodes to declare a fanout spec");
    let table_effect = node.table_modifiers.iter().find_map(|m| match m {
        ModifierSpec::Effect { event_table, on, window, map } => Some((event_table, on, window, map)),
        _ => None,
    });

    let mut drivers = Vec::new();
    for parent_row in parent_rows {
        let pk_value = parent_row
            .get(parent_pk)
            .expect("parent row always carries its own primary key");
        let scope_key = pk_value.to_unique_key();
        let mut rng = seed::derive(master_seed, &[node_name, "_fanout", scope_key.as_str()]);
        let mut count = fanout::sample(fanout_spec, &mut rng);

        if let Some((event_table, on, window, map)) = table_effect {
            let event_rows = pool.table_rows(event_table).ok_or_else(|| DatagenError::Generator {
                node: node_name.to_string(),
                column: "_fanout".to_string(),
                kind: GeneratorErrorKind::ReferenceUnresolved,
                detail: format!("table-level effect event table '{event_table}' not yet generated"),
            })?;
            let driver_time = crate::generate::effect::resolve_driver_time(
                None,
                Some(parent_row),
                dataset.timeframe.start,
                dataset.timeframe.end,
            );
            let matches =
                crate::generate::effect::matching_rows(event_rows, on, parent_row, window, driver_time);
            let multiplier = crate::generate::effect::combined_multiplier(&matches, map);
            let factor = crate::generate::effect::apply(1.0, multiplier, map.op);
            let (min, max) = fanout_bounds(fanout_spec);
            count = fanout::scale_and_reclamp(count, factor, min, max);
        }

        for _ in 0..count {
            drivers.push(parent_row.clone());
        }
    }
    Ok(drivers)
}

fn parse_freq(freq: &str) -> chrono::Duration {
    match freq {
        "H" | "hourly" => chrono::Duration::hours(1),
        "D" | "daily" => chrono::Duration::days(1),
        "W" | "weekly" => chrono::Duration::weeks(1),
        "min" | "minutely" => chrono::Duration::minutes(1),
        "M" | "monthly" => chrono::Duration::days(30),
        _ => chrono::Duration::hours(1),
    }
}

/// Build the candidate instant set and per-instant weight for a
/// `datetime_series` column, once per column rather than once per row.
fn build_datetime_candidates(
    dataset: &Dataset,
    freq: &Option<String>,
    pattern: &Option<TemporalPattern>,
) -> (Vec<NaiveDateTime>, Vec<f64>) {
    let freq_str = freq
        .clone()
        .or_else(|| dataset.timeframe.freq.clone())
        .unwrap_or_else(|| "H".to_string());
    let step = parse_freq(&freq_str);

    let mut instants = Vec::new();
    let mut cursor = dataset.timeframe.start;
    while cursor <= dataset.timeframe.end {
        instants.push(cursor);
        cursor += step;
    }
    if instants.is_empty() {
        instants.push(dataset.timeframe.start);
    }

    let weights = match pattern {
        Some(p) => instants.iter().map(|t| modifiers::temporal_weight(p, *t)).collect(),
        None => vec![1.0; instants.len()],
    };

    (instants, weights)
}

#[allow(clippy::too_many_arguments)]
fn dispatch_generator(
    node_name: &str,
    column_name: &str,
    spec: &GeneratorSpec,
    row_index: usize,
    rng: &mut StdRng,
    rows: &[IndexMap<String, Value>],
    driver_row: Option<&IndexMap<String, Value>>,
    node: &Node,
    column: &Column,
    pool: &LookupPool,
    compiled_expr: Option<&CompiledExpr>,
    datetime_candidates: Option<&(Vec<NaiveDateTime>, Vec<f64>)>,
) -> Result<Value> {
    match spec {
        GeneratorSpec::Sequence { start, step } => Ok(generators::sequence(*start, *step, row_index)),
        GeneratorSpec::Choice { values, weights } => generators::choice(values, weights, rng)
            .map_err(|e| with_context(e, node_name, column_name)),
        GeneratorSpec::Distribution { dist, clamp } => generators::distribution(dist, *clamp, rng)
            .map_err(|e| with_context(e, node_name, column_name)),
        GeneratorSpec::EnumList { values } => {
            if values.len() == rows.len() {
                json_to_value(&values[row_index])
            } else {
                generators::enum_list(values, rng).map_err(|e| with_context(e, node_name, column_name))
            }
        }
        GeneratorSpec::DatetimeSeries { .. } => {
            let (candidates, weights) = datetime_candidates.expect("precomputed per column");
            let idx = generators::weighted_pick(weights, rng);
            Ok(Value::Timestamp(candidates[idx]))
        }
        GeneratorSpec::Faker { method, locale_from } => {
            let locale = locale_from
                .as_deref()
                .and_then(|col| rows[row_index].get(col))
                .and_then(Value::as_string)
                .and_then(|code| providers::DefaultLocaleTable.resolve(code));
            providers::generate(method, locale, rng).map_err(|e| with_context(e, node_name, column_name))
        }
        GeneratorSpec::Expression { .. } => {
            let expr = compiled_expr.expect("precompiled per column");
            let mut row_map: HashMap<String, Value> = HashMap::with_capacity(rows[row_index].len());
            for (k, v) in &rows[row_index] {
                row_map.insert(k.clone(), v.clone());
            }
            let n = expr
                .eval(&row_map)
                .map_err(|e| with_context(e, node_name, column_name))?;
            Ok(Value::Float(n))
        }
        GeneratorSpec::Lookup { table, column: target_column, on } => dispatch_lookup(
            node_name,
            table,
            target_column,
            on.as_deref(),
            row_index,
            rows,
            driver_row,
            node,
            column,
            pool,
            rng,
        ),
    }
}

fn json_to_value(json: &serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::owned(s.clone()),
        other => Value::Json(other.clone()),
    })
}

#[allow(clippy::too_many_arguments)]
fn dispatch_lookup(
    node_name: &str,
    table: &str,
    target_column: &str,
    on: Option<&str>,
    row_index: usize,
    rows: &[IndexMap<String, Value>],
    driver_row: Option<&IndexMap<String, Value>>,
    node: &Node,
    column: &Column,
    pool: &LookupPool,
    rng: &mut impl Rng,
) -> Result<Value> {
    // Self-referential: candidates are this node's own already-built rows.
    // The first K rows are forced null so later rows always have a
    // non-empty candidate set.
    if table == node_name {
        let k = ((rows.len() as f64) * SELF_REFERENCE_NULLIFY_FRACTION)
            .ceil()
            .max(1.0) as usize;
        if row_index < k {
            return Ok(Value::Null);
        }
        let candidates = &rows[0..row_index];
        let idx = rng.random_range(0..candidates.len());
        return Ok(candidates[idx].get(target_column).cloned().unwrap_or(Value::Null));
    }

    // A plain (no `on`) lookup of the node's own fanout parent binds to the
    // exact driver row that produced this child row, not a uniformly
    // random parent row — the natural reading of "this order's user" for a
    // fact table fanned out from users.
    if on.is_none() && node.parent.as_deref() == Some(table) {
        if let Some(driver) = driver_row {
            return Ok(driver.get(target_column).cloned().unwrap_or(Value::Null));
        }
    }

    let picked = match on {
        Some(on_column) => {
            let on_value = rows[row_index].get(on_column).cloned().ok_or_else(|| {
                DatagenError::Generator {
                    node: node_name.to_string(),
                    column: target_column.to_string(),
                    kind: GeneratorErrorKind::ReferenceUnresolved,
                    detail: format!("join key column '{on_column}' has not been produced yet"),
                }
            })?;
            pool.pick_matching(table, target_column, on_column, &on_value, rng)
        }
        None => pool.pick(table, target_column, rng),
    };

    match picked {
        Some(value) => Ok(value),
        None if column.nullable => Ok(Value::Null),
        None => Err(DatagenError::Lookup {
            table: table.to_string(),
            keys: on.map(|k| vec![k.to_string()]).unwrap_or_default(),
            row_index,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_testutil::{ecommerce_dataset, promo_impression_dataset, self_referential_dataset, two_table_dataset};

    #[test]
    fn generation_is_deterministic_for_the_same_seed() {
        let dataset = two_table_dataset();
        let a = generate(&dataset, 42, None).unwrap();
        let b = generate(&dataset, 42, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let dataset = two_table_dataset();
        let a = generate(&dataset, 1, None).unwrap();
        let b = generate(&dataset, 2, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fact_row_count_matches_sum_of_fanout_samples() {
        let dataset = two_table_dataset();
        let tables = generate(&dataset, 7, None).unwrap();
        let events = &tables["events"];
        assert!(!events.rows.is_empty());
        for row in &events.rows {
            let user_id = row.get("user_id").unwrap().as_int().unwrap();
            assert!((1..=20).contains(&user_id));
        }
    }

    #[test]
    fn events_user_id_is_bound_to_driver_row() {
        let dataset = two_table_dataset();
        let tables = generate(&dataset, 7, None).unwrap();
        let users = &tables["users"];
        let events = &tables["events"];
        let known_ids: std::collections::HashSet<i64> = users
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_int().unwrap())
            .collect();
        for row in &events.rows {
            let uid = row.get("user_id").unwrap().as_int().unwrap();
            assert!(known_ids.contains(&uid));
        }
    }

    #[test]
    fn self_referential_lookup_nullifies_a_prefix_and_never_self_points() {
        let dataset = self_referential_dataset();
        let tables = generate(&dataset, 3, None).unwrap();
        let employees = &tables["employees"];
        for (i, row) in employees.rows.iter().enumerate() {
            let id = row.get("id").unwrap().as_int().unwrap();
            match row.get("manager_id").unwrap() {
                Value::Null => {}
                Value::Int(manager_id) => {
                    assert_ne!(*manager_id, id);
                    assert!(i > 0);
                }
                other => panic!("unexpected manager_id value {other:?}"),
            }
        }
    }

    #[test]
    fn ecommerce_orders_reference_known_users_and_products() {
        let dataset = ecommerce_dataset();
        let tables = generate(&dataset, 11, None).unwrap();
        let user_ids: std::collections::HashSet<i64> = tables["users"]
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_int().unwrap())
            .collect();
        let product_ids: std::collections::HashSet<i64> = tables["products"]
            .rows
            .iter()
            .map(|r| r.get("id").unwrap().as_int().unwrap())
            .collect();
        for row in &tables["orders"].rows {
            assert!(user_ids.contains(&row.get("user_id").unwrap().as_int().unwrap()));
            assert!(product_ids.contains(&row.get("product_id").unwrap().as_int().unwrap()));
        }
    }

    #[test]
    fn table_level_effect_scales_fanout() {
        // The fixture's users have no datetime column, so the driver time
        // falls back to the dataset's timeframe midpoint, which always
        // lands in the promotion window with mult = 2.0. Base fanout is
        // Poisson(lambda = 2.0), so with the effect applied the per-user
        // average should track ~4.0 rather than ~2.0.
        let dataset = promo_impression_dataset();
        let tables = generate(&dataset, 5, None).unwrap();
        let user_count = tables["users"].rows.len();
        let impression_count = tables["impression"].rows.len();
        let avg = impression_count as f64 / user_count as f64;
        assert!(
            avg > 3.0,
            "expected average impressions per user near 4.0 (2.0 base x 2.0 multiplier), got {avg}"
        );
    }

    #[test]
    fn cancellation_aborts_before_any_node_runs() {
        let dataset = two_table_dataset();
        let token = CancellationToken::new();
        token.cancel();
        let err = generate(&dataset, 1, Some(&token)).unwrap_err();
        assert!(matches!(err, DatagenError::Cancelled));
    }
}
