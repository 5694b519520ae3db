//! # Generator Dispatch
//!
//! Produces one `Value` per row for each of the non-`faker`, non-`lookup`,
//! non-`expression` generator kinds. Those three live in
//! [`crate::generate::providers`], [`crate::generate::foreign_key`], and
//! [`crate::generate::expression`] respectively, since they need access to
//! state (a locale table, the lookup pool, the row built so far) the others
//! don't.

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal, Poisson};
use uuid::Uuid;

use crate::error::{DatagenError, GeneratorErrorKind, Result};
use crate::generate::value::Value;
use crate::schema::types::{ColumnType, DistributionKind, WeightSpec};

fn err(kind: GeneratorErrorKind, detail: impl Into<String>) -> DatagenError {
    DatagenError::Generator {
        node: String::new(),
        column: String::new(),
        kind,
        detail: detail.into(),
    }
}

/// `sequence`: `start + step * row_index`, as the declared integer/float
/// type (the schema types this column `int`, but nothing stops the
/// sequence spec from stepping by a non-unit amount).
pub fn sequence(start: i64, step: i64, row_index: usize) -> Value {
    Value::Int(start + step * row_index as i64)
}

/// `choice`: pick one of `values` under `weights`.
pub fn choice(values: &[serde_json::Value], weights: &WeightSpec, rng: &mut impl Rng) -> Result<Value> {
    if values.is_empty() {
        return Err(err(GeneratorErrorKind::EmptyDomain, "choice has no values"));
    }
    let weight_vec = resolve_weights(weights, values.len())?;
    let idx = weighted_pick(&weight_vec, rng);
    json_to_value(&values[idx])
}

/// Expand a [`WeightSpec`] into a concrete per-value weight vector.
fn resolve_weights(spec: &WeightSpec, n: usize) -> Result<Vec<f64>> {
    match spec {
        WeightSpec::Uniform => Ok(vec![1.0; n]),
        WeightSpec::Explicit { weights } => {
            if weights.len() != n {
                return Err(err(
                    GeneratorErrorKind::BadSpec,
                    "explicit weights length must match values length",
                ));
            }
            Ok(weights.clone())
        }
        WeightSpec::Zipf { s } => {
            // weight(rank) = 1 / rank^s, rank starting at 1 for the first value.
            Ok((1..=n).map(|rank| 1.0 / (rank as f64).powf(*s)).collect())
        }
        WeightSpec::HeadTail { head_share, tail_alpha } => {
            if !(0.0..=1.0).contains(head_share) {
                return Err(err(
                    GeneratorErrorKind::BadSpec,
                    "head_tail head_share must be in [0, 1]",
                ));
            }
            // The head is the first ceil(head_share * n) values; it shares
            // head_share of the mass uniformly. The rest form a Zipf-like
            // tail (rank 1 = first tail item) scaled to fill out the
            // remaining 1 - head_share.
            let head_count = (*head_share * n as f64).ceil() as usize;
            let head_count = head_count.min(n);
            let tail_count = n - head_count;
            let head_weight = if head_count > 0 { head_share / head_count as f64 } else { 0.0 };
            let tail_raw: Vec<f64> = (1..=tail_count).map(|j| 1.0 / (j as f64).powf(*tail_alpha)).collect();
            let tail_sum: f64 = tail_raw.iter().sum();
            let tail_mass = 1.0 - head_share;
            Ok((0..n)
                .map(|i| {
                    if i < head_count {
                        head_weight
                    } else if tail_sum > 0.0 {
                        tail_mass * tail_raw[i - head_count] / tail_sum
                    } else {
                        0.0
                    }
                })
                .collect())
        }
    }
}

/// Cumulative-distribution weighted sampling. Negative weights are clamped
/// to zero; if every weight is zero, falls back to a uniform pick so a
/// malformed weight vector never panics or starves every value but one.
pub fn weighted_pick(weights: &[f64], rng: &mut impl Rng) -> usize {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 {
        return rng.random_range(0..weights.len());
    }
    let mut target = rng.random::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        target -= w.max(0.0);
        if target <= 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

fn json_to_value(json: &serde_json::Value) -> Result<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                return Err(err(GeneratorErrorKind::BadSpec, "unrepresentable number"));
            }
        }
        serde_json::Value::String(s) => Value::owned(s.clone()),
        other => Value::Json(other.clone()),
    })
}

/// `distribution`: sample one of the four supported distributions, clamping
/// `normal`/`lognormal` to the mandatory `clamp` range (required by the
/// schema parser for those two kinds specifically, since they're
/// unbounded).
pub fn distribution(
    dist: &DistributionKind,
    clamp: Option<(f64, f64)>,
    rng: &mut impl Rng,
) -> Result<Value> {
    let raw = match dist {
        DistributionKind::Normal { mean, stddev } => {
            let normal = Normal::new(*mean, *stddev)
                .map_err(|e| err(GeneratorErrorKind::BadSpec, e.to_string()))?;
            normal.sample(rng)
        }
        DistributionKind::Lognormal { mean, stddev } => {
            let lognormal = LogNormal::new(*mean, *stddev)
                .map_err(|e| err(GeneratorErrorKind::BadSpec, e.to_string()))?;
            lognormal.sample(rng)
        }
        DistributionKind::Uniform { min, max } => {
            if min > max {
                return Err(err(GeneratorErrorKind::BadSpec, "uniform min must be <= max"));
            }
            rng.random_range(*min..=*max)
        }
        DistributionKind::Poisson { lambda } => {
            let poisson = Poisson::new(*lambda)
                .map_err(|e| err(GeneratorErrorKind::BadSpec, e.to_string()))?;
            poisson.sample(rng)
        }
    };

    let clamped = match clamp {
        Some((lo, hi)) => raw.clamp(lo, hi),
        None => raw,
    };
    Ok(Value::Float(clamped))
}

/// `enum_list`: a fixed ordered vocabulary, selected uniformly.
pub fn enum_list(values: &[serde_json::Value], rng: &mut impl Rng) -> Result<Value> {
    if values.is_empty() {
        return Err(err(GeneratorErrorKind::EmptyDomain, "enum_list has no values"));
    }
    let idx = rng.random_range(0..values.len());
    json_to_value(&values[idx])
}

/// Cast a generated [`Value`] to the column's declared [`ColumnType`],
/// where a cast is unambiguous (int<->float widening, anything to string,
/// or a literal string parsed into the declared temporal/uuid shape — the
/// latter lets `choice`/`enum_list` supply literal values for those column
/// types). Returns the value unchanged when already the right shape, or
/// when a string fails to parse as the declared type (a `TypeCastError` is
/// raised later by the caller for a non-nullable column).
pub fn cast_to_column_type(value: Value, ty: ColumnType) -> Result<Value> {
    Ok(match (ty, value) {
        (_, Value::Null) => Value::Null,
        (ColumnType::Int, Value::Float(f)) => Value::Int(f.round() as i64),
        (ColumnType::Float, Value::Int(i)) => Value::Float(i as f64),
        (ColumnType::String, v @ Value::String(_)) => v,
        (ColumnType::String, other) => Value::owned(other.to_string()),
        (ColumnType::Timestamp, Value::String(s)) => {
            match NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S") {
                Ok(ts) => Value::Timestamp(ts),
                Err(_) => Value::String(s),
            }
        }
        (ColumnType::Date, Value::String(s)) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => Value::String(s),
        },
        (ColumnType::Uuid, Value::String(s)) => match Uuid::parse_str(&s) {
            Ok(u) => Value::Uuid(u),
            Err(_) => Value::String(s),
        },
        (_, v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn sequence_steps_from_start() {
        assert_eq!(sequence(10, 2, 0), Value::Int(10));
        assert_eq!(sequence(10, 2, 3), Value::Int(16));
    }

    #[test]
    fn uniform_weights_give_every_value_a_chance() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let values: Vec<serde_json::Value> = vec!["a".into(), "b".into(), "c".into()];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let v = choice(&values, &WeightSpec::Uniform, &mut rng).unwrap();
            seen.insert(v.to_csv_string());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn explicit_weight_length_mismatch_is_bad_spec() {
        let values: Vec<serde_json::Value> = vec!["a".into(), "b".into()];
        let spec = WeightSpec::Explicit { weights: vec![1.0] };
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert!(choice(&values, &spec, &mut rng).is_err());
    }

    #[test]
    fn normal_distribution_respects_clamp() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let v = distribution(
                &DistributionKind::Normal {
                    mean: 0.0,
                    stddev: 100.0,
                },
                Some((-1.0, 1.0)),
                &mut rng,
            )
            .unwrap();
            let f = v.as_float().unwrap();
            assert!((-1.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn weighted_pick_falls_back_to_uniform_when_all_zero() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let weights = vec![0.0, 0.0, 0.0];
        let idx = weighted_pick(&weights, &mut rng);
        assert!(idx < 3);
    }

    #[test]
    fn zipf_weights_are_monotonically_decreasing() {
        let spec = WeightSpec::Zipf { s: 1.0 };
        let weights = resolve_weights(&spec, 4).unwrap();
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn head_tail_splits_mass_and_tapers_the_tail() {
        let spec = WeightSpec::HeadTail { head_share: 0.6, tail_alpha: 1.5 };
        let weights = resolve_weights(&spec, 5).unwrap();
        // head_count = ceil(0.6 * 5) = 3, so indices 0..3 are the uniform head.
        assert_eq!(weights[0], weights[1]);
        assert_eq!(weights[1], weights[2]);
        // the tail (indices 3, 4) strictly tapers off under tail_alpha > 0.
        assert!(weights[3] > weights[4]);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn head_tail_head_share_zero_is_pure_zipf_tail() {
        let spec = WeightSpec::HeadTail { head_share: 0.0, tail_alpha: 1.0 };
        let weights = resolve_weights(&spec, 4).unwrap();
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn cast_to_column_type_parses_literal_timestamp_strings() {
        let cast = cast_to_column_type(Value::owned("2024-06-01T12:30:00"), ColumnType::Timestamp).unwrap();
        assert_eq!(
            cast,
            Value::Timestamp(
                chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(12, 30, 0).unwrap()
            )
        );
    }

    #[test]
    fn cast_to_column_type_parses_literal_date_strings() {
        let cast = cast_to_column_type(Value::owned("2024-06-01"), ColumnType::Date).unwrap();
        assert_eq!(cast, Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
    }

    #[test]
    fn cast_to_column_type_leaves_unparseable_strings_alone() {
        let cast = cast_to_column_type(Value::owned("not-a-date"), ColumnType::Timestamp).unwrap();
        assert_eq!(cast, Value::owned("not-a-date"));
    }
}
