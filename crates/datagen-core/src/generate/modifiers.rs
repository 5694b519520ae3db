//! # Modifier Pipeline
//!
//! Applies a column's declared modifier chain, in order, to the value its
//! generator produced. Each modifier only ever sees a numeric or string
//! `Value` plus whatever row/time context it specifically needs; a
//! modifier that cannot operate on the value it's handed (e.g. `multiply`
//! on a string) is an `IncompatibleType` error rather than a silent no-op.

use chrono::{Datelike, NaiveDateTime, Timelike};
use indexmap::IndexMap;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{DatagenError, ModifierErrorKind, Result};
use crate::generate::effect;
use crate::generate::generators;
use crate::generate::value::Value;
use crate::schema::types::{ModifierSpec, TemporalPattern};

fn err(index: usize, kind: ModifierErrorKind, detail: impl Into<String>) -> DatagenError {
    DatagenError::Modifier {
        node: String::new(),
        column: String::new(),
        index,
        kind,
        detail: detail.into(),
    }
}

fn as_numeric(value: &Value, index: usize) -> Result<f64> {
    value.as_float().ok_or_else(|| {
        err(
            index,
            ModifierErrorKind::IncompatibleType,
            "modifier requires a numeric value",
        )
    })
}

/// Context a modifier may need beyond the value itself: the row produced
/// so far (for `effect`'s key columns), the driver (parent) row (for
/// `effect`'s join-key resolution and its timestamp fallback chain), the
/// event-table rows it joins against, and the global time window (for
/// `time_jitter`'s reclamp).
pub struct ModifierContext<'a> {
    pub row_so_far: &'a IndexMap<String, Value>,
    pub driver_row: Option<&'a IndexMap<String, Value>>,
    pub event_tables: &'a dyn Fn(&str) -> Option<&'a [IndexMap<String, Value>]>,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

/// Apply a full modifier chain to `value` in declared order.
pub fn apply_chain(
    mut value: Value,
    modifiers: &[ModifierSpec],
    ctx: &ModifierContext,
    rng: &mut impl Rng,
) -> Result<Value> {
    for (index, modifier) in modifiers.iter().enumerate() {
        value = apply_one(value, modifier, index, ctx, rng)?;
    }
    Ok(value)
}

fn apply_one(
    value: Value,
    modifier: &ModifierSpec,
    index: usize,
    ctx: &ModifierContext,
    rng: &mut impl Rng,
) -> Result<Value> {
    match modifier {
        ModifierSpec::Multiply { factor } => {
            let n = as_numeric(&value, index)?;
            Ok(Value::Float(n * factor))
        }
        ModifierSpec::Add { amount } => {
            let n = as_numeric(&value, index)?;
            Ok(Value::Float(n + amount))
        }
        ModifierSpec::Clamp { min, max } => {
            let n = as_numeric(&value, index)?;
            Ok(Value::Float(n.clamp(*min, *max)))
        }
        ModifierSpec::Jitter { stddev } => {
            let n = as_numeric(&value, index)?;
            let normal = Normal::new(0.0, *stddev)
                .map_err(|e| err(index, ModifierErrorKind::BadArgs, e.to_string()))?;
            Ok(Value::Float(n + normal.sample(rng)))
        }
        ModifierSpec::MapValues { mapping } => {
            let key = value.to_unique_key();
            match mapping.get(&key) {
                Some(mapped) => json_to_value(mapped),
                None => Ok(value),
            }
        }
        ModifierSpec::Seasonality {
            pattern,
            time_column,
        } => {
            let n = as_numeric(&value, index)?;
            let time_col = time_column.as_deref().unwrap_or("__self__");
            let timestamp = resolve_timestamp(ctx.row_so_far, time_col, index)?;
            let weight = temporal_weight(pattern, timestamp);
            Ok(Value::Float(n * weight))
        }
        ModifierSpec::TimeJitter { stddev_seconds } => {
            let ts = value.as_timestamp().ok_or_else(|| {
                err(
                    index,
                    ModifierErrorKind::IncompatibleType,
                    "time_jitter requires a timestamp value",
                )
            })?;
            let normal = Normal::new(0.0, *stddev_seconds)
                .map_err(|e| err(index, ModifierErrorKind::BadArgs, e.to_string()))?;
            let offset_seconds = normal.sample(rng).round() as i64;
            let jittered = ts + chrono::Duration::seconds(offset_seconds);
            let clamped = jittered.clamp(ctx.window_start, ctx.window_end);
            Ok(Value::Timestamp(clamped))
        }
        ModifierSpec::Effect { event_table, on, window, map } => {
            let n = as_numeric(&value, index)?;
            let event_rows = (ctx.event_tables)(event_table).ok_or_else(|| {
                err(
                    index,
                    ModifierErrorKind::MissingDependency,
                    format!("event table '{event_table}' has not been generated"),
                )
            })?;
            let driver_time = effect::resolve_driver_time(
                Some(ctx.row_so_far),
                ctx.driver_row,
                ctx.window_start,
                ctx.window_end,
            );
            let local_row = ctx.driver_row.unwrap_or(ctx.row_so_far);
            let matches = effect::matching_rows(event_rows, on, local_row, window, driver_time);
            let multiplier = effect::combined_multiplier(&matches, map);
            Ok(Value::Float(effect::apply(n, multiplier, map.op)))
        }
        ModifierSpec::Outliers { probability, magnitude } => {
            let n = as_numeric(&value, index)?;
            let roll: f64 = rng.random();
            if roll < probability / 2.0 {
                let factor = generators::distribution(magnitude, None, rng)?
                    .as_float()
                    .expect("distribution() always returns Value::Float");
                Ok(Value::Float(n * factor))
            } else if roll < *probability {
                let factor = generators::distribution(magnitude, None, rng)?
                    .as_float()
                    .expect("distribution() always returns Value::Float");
                Ok(Value::Float(n / factor))
            } else {
                Ok(Value::Float(n))
            }
        }
    }
}

/// Resolve the timestamp a seasonality/effect modifier should key off of.
/// `"__self__"` means the value under modification is itself a timestamp
/// (resolved by the caller before invoking this — here it means "use the
/// row's own declared time column if present").
fn resolve_timestamp(
    row_so_far: &IndexMap<String, Value>,
    column: &str,
    index: usize,
) -> Result<NaiveDateTime> {
    row_so_far
        .get(column)
        .and_then(Value::as_timestamp)
        .ok_or_else(|| {
            err(
                index,
                ModifierErrorKind::MissingDependency,
                format!("no timestamp column '{column}' produced yet on this row"),
            )
        })
}

/// Multiplicative composition across whichever hour/day-of-week/month
/// dimensions the pattern declares. Dimensions it omits contribute a
/// weight of 1.0 (no effect). Each dimension's weights are normalized to
/// mean 1 before multiplying in, so a declared pattern reshapes the
/// distribution across the dimension without shifting the column's mean.
pub fn temporal_weight(pattern: &TemporalPattern, timestamp: NaiveDateTime) -> f64 {
    let mut weight = 1.0;
    if let Some(hours) = &pattern.hour_weights {
        weight *= normalized_weight(hours, timestamp.hour() as usize);
    }
    if let Some(dows) = &pattern.dow_weights {
        weight *= normalized_weight(dows, timestamp.weekday().num_days_from_monday() as usize);
    }
    if let Some(months) = &pattern.month_weights {
        weight *= normalized_weight(months, (timestamp.month() - 1) as usize);
    }
    weight
}

/// `weights[index]`, rescaled so the array's own mean is 1.
fn normalized_weight(weights: &[f64], index: usize) -> f64 {
    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    if mean <= 0.0 {
        1.0
    } else {
        weights[index] / mean
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
