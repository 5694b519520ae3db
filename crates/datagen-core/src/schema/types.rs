//! # Schema Types
//!
//! The typed in-memory representation of a schema document: a [`Dataset`]
//! made of [`Node`]s, each with typed [`Column`]s carrying a [`GeneratorSpec`]
//! and an ordered [`ModifierSpec`] pipeline, plus dataset-level
//! [`Constraints`] and [`Targets`] consumed only by the validator.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A complete, parsed schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    pub version: u32,
    pub metadata: Metadata,
    pub timeframe: Timeframe,
    pub nodes: IndexMap<String, Node>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub targets: Targets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
}

/// The global time window generated timestamps are expected to fall within.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeframe {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// A coarse frequency hint (e.g. "daily", "hourly") used by
    /// `datetime_series` generators that don't specify their own.
    #[serde(default)]
    pub freq: Option<String>,
}

/// What kind of table a node represents, which drives row-count resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    Fact,
    Vocab,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    pub kind: NodeKind,
    /// Name of this node's primary-key column. Must name a declared column.
    pub primary_key: String,
    /// Row count for `entity`/`vocab` nodes; ignored for `fact` nodes, whose
    /// row count is the sum of per-parent-row fanout samples.
    #[serde(default)]
    pub rows: Option<usize>,
    /// The parent node this `fact` node fans out from. Required for `fact`,
    /// ignored otherwise.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub fanout: Option<FanoutSpec>,
    /// Table-level modifiers, applied to the fanout count itself rather
    /// than to any column. Only `effect` is meaningful here; declaring any
    /// other kind is a schema error.
    #[serde(default)]
    pub table_modifiers: Vec<ModifierSpec>,
    pub columns: IndexMap<String, Column>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    String,
    Date,
    Timestamp,
    Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    /// Probability in `[0, 1]` that a row's value is `Null` when `nullable`.
    #[serde(default)]
    pub null_probability: f64,
    pub generator: GeneratorSpec,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
}

/// How a `fact` node's per-parent-row count is sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FanoutSpec {
    Poisson { lambda: f64, min: u64, max: u64 },
    Uniform { min: u64, max: u64 },
}

/// How weighted-choice weights are specified.
///
/// Accepts two wire forms: the tagged-object form used by every other
/// `kind`-tagged spec in this module (`{"kind": "zipf", "s": 1.5}`), and the
/// compact string form named in the schema format (`"zipf@1.5"`,
/// `"head_tail@{0.6,1.5}"`, `"uniform"`). Both deserialize to the same
/// variants; only the tagged-object form round-trips back out of
/// `Serialize`, since the string form exists for document authors, not for
/// anything this crate re-emits.
#[derive(Debug, Clone)]
pub enum WeightSpec {
    Uniform,
    Explicit { weights: Vec<f64> },
    /// `s` is the Zipf exponent: `weight(rank) = 1 / rank^s`.
    Zipf { s: f64 },
    /// `head_share` of the mass is split uniformly across the first value
    /// (the "head"); the remaining values form a Zipf-like tail, with tail
    /// item `j` (1-indexed from the start of the tail) weighted
    /// `(1/j)^tail_alpha` before being scaled to fill out `1 - head_share`.
    HeadTail { head_share: f64, tail_alpha: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WeightSpecTagged {
    Uniform,
    Explicit { weights: Vec<f64> },
    Zipf { s: f64 },
    HeadTail { head_share: f64, tail_alpha: f64 },
}

impl From<WeightSpecTagged> for WeightSpec {
    fn from(tagged: WeightSpecTagged) -> Self {
        match tagged {
            WeightSpecTagged::Uniform => WeightSpec::Uniform,
            WeightSpecTagged::Explicit { weights } => WeightSpec::Explicit { weights },
            WeightSpecTagged::Zipf { s } => WeightSpec::Zipf { s },
            WeightSpecTagged::HeadTail { head_share, tail_alpha } => {
                WeightSpec::HeadTail { head_share, tail_alpha }
            }
        }
    }
}

impl From<WeightSpec> for WeightSpecTagged {
    fn from(spec: WeightSpec) -> Self {
        match spec {
            WeightSpec::Uniform => WeightSpecTagged::Uniform,
            WeightSpec::Explicit { weights } => WeightSpecTagged::Explicit { weights },
            WeightSpec::Zipf { s } => WeightSpecTagged::Zipf { s },
            WeightSpec::HeadTail { head_share, tail_alpha } => {
                WeightSpecTagged::HeadTail { head_share, tail_alpha }
            }
        }
    }
}

/// Parses the compact string encoding: `"uniform"`, `"zipf@<s>"`, or
/// `"head_tail@{<head_share>,<tail_alpha>}"`.
fn parse_weight_spec_string<E: serde::de::Error>(s: &str) -> Result<WeightSpec, E> {
    if s == "uniform" {
        return Ok(WeightSpec::Uniform);
    }
    if let Some(rest) = s.strip_prefix("zipf@") {
        let exponent: f64 = rest
            .parse()
            .map_err(|_| E::custom(format!("invalid zipf exponent in weight-kind string '{s}'")))?;
        return Ok(WeightSpec::Zipf { s: exponent });
    }
    if let Some(rest) = s.strip_prefix("head_tail@") {
        let rest = rest
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| E::custom(format!("malformed head_tail weight-kind string '{s}'")))?;
        let mut parts = rest.splitn(2, ',');
        let head_share: f64 = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(|| E::custom(format!("invalid head_share in weight-kind string '{s}'")))?;
        let tail_alpha: f64 = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(|| E::custom(format!("invalid tail_alpha in weight-kind string '{s}'")))?;
        return Ok(WeightSpec::HeadTail { head_share, tail_alpha });
    }
    Err(E::custom(format!("unrecognized weight-kind string '{s}'")))
}

impl<'de> Deserialize<'de> for WeightSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct WeightSpecVisitor;

        impl<'de> serde::de::Visitor<'de> for WeightSpecVisitor {
            type Value = WeightSpec;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a weight-kind string (e.g. \"zipf@1.5\") or a tagged object")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<WeightSpec, E>
            where
                E: serde::de::Error,
            {
                parse_weight_spec_string(v)
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<WeightSpec, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let tagged =
                    WeightSpecTagged::deserialize(serde::de::value::MapAccessDeserializer::new(map))?;
                Ok(tagged.into())
            }
        }

        deserializer.deserialize_any(WeightSpecVisitor)
    }
}

impl Serialize for WeightSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        WeightSpecTagged::from(self.clone()).serialize(serializer)
    }
}

/// The eight generator kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    Sequence {
        #[serde(default)]
        start: i64,
        #[serde(default = "default_step")]
        step: i64,
    },
    Choice {
        values: Vec<serde_json::Value>,
        #[serde(default = "default_weight_spec")]
        weights: WeightSpec,
    },
    Distribution {
        dist: DistributionKind,
        #[serde(default)]
        clamp: Option<(f64, f64)>,
    },
    DatetimeSeries {
        #[serde(default)]
        freq: Option<String>,
        #[serde(default)]
        pattern: Option<TemporalPattern>,
    },
    Faker {
        method: String,
        #[serde(default)]
        locale_from: Option<String>,
    },
    Lookup {
        table: String,
        column: String,
        /// When set, restrict candidates to rows whose `on` column matches
        /// the current row's column of the same name (a join key).
        #[serde(default)]
        on: Option<String>,
    },
    Expression {
        expr: String,
    },
    EnumList {
        values: Vec<serde_json::Value>,
    },
}

fn default_step() -> i64 {
    1
}

fn default_weight_spec() -> WeightSpec {
    WeightSpec::Uniform
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum DistributionKind {
    Normal { mean: f64, stddev: f64 },
    Lognormal { mean: f64, stddev: f64 },
    Uniform { min: f64, max: f64 },
    Poisson { lambda: f64 },
}

/// Composite hour-of-day / day-of-week / month weighting, multiplicative
/// across whichever dimensions are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalPattern {
    #[serde(default)]
    pub hour_weights: Option<[f64; 24]>,
    #[serde(default)]
    pub dow_weights: Option<[f64; 7]>,
    #[serde(default)]
    pub month_weights: Option<[f64; 12]>,
}

/// The nine modifier kinds, applied in declared order after the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierSpec {
    Multiply {
        factor: f64,
    },
    Add {
        amount: f64,
    },
    Clamp {
        min: f64,
        max: f64,
    },
    Jitter {
        stddev: f64,
    },
    MapValues {
        mapping: IndexMap<String, serde_json::Value>,
    },
    Seasonality {
        pattern: TemporalPattern,
        /// Column to read the timestamp from when it differs from the
        /// column being modified (defaults to the column itself).
        #[serde(default)]
        time_column: Option<String>,
    },
    TimeJitter {
        stddev_seconds: f64,
    },
    Effect {
        event_table: String,
        /// Join keys: `{local_key: effect_key}`, matched against the driver
        /// row (the parent row, or the row itself when there's no parent).
        /// Empty means every row of `event_table` is a candidate (a global
        /// effect).
        #[serde(default)]
        on: IndexMap<String, String>,
        window: EffectWindow,
        map: EffectMap,
    },
    Outliers {
        probability: f64,
        /// Distribution the spike/drop magnitude is sampled from per
        /// occurrence (a spike multiplies by the sample, a drop divides by
        /// it), rather than a single fixed factor.
        magnitude: DistributionKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCombine {
    Mul,
    Add,
}

/// Each event-table row carries its own `[start_col, end_col]` window; a
/// row matches when the driver timestamp falls inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectWindow {
    pub start_col: String,
    pub end_col: String,
}

/// Which column of a matched event row supplies the multiplier, how
/// multiple matches combine, and what to contribute when nothing matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectMap {
    pub field: String,
    pub op: EffectCombine,
    pub default: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub unique: Vec<UniqueConstraint>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    #[serde(default)]
    pub ranges: Vec<RangeConstraint>,
    #[serde(default)]
    pub inequalities: Vec<InequalityConstraint>,
    #[serde(default)]
    pub pattern: Vec<PatternConstraint>,
    #[serde(default)]
    pub r#enum: Vec<EnumConstraint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub table: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeConstraint {
    pub table: String,
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InequalityConstraint {
    pub table: String,
    pub left: String,
    /// One of `<`, `<=`, `>`, `>=`.
    pub op: String,
    pub right: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConstraint {
    pub table: String,
    pub column: String,
    pub regex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumConstraint {
    pub table: String,
    pub column: String,
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Targets {
    #[serde(default)]
    pub weekend_share: Option<WeekendShareTarget>,
    #[serde(default)]
    pub mean_in_range: Vec<MeanInRangeTarget>,
    #[serde(default)]
    pub composite_effect: Vec<CompositeEffectTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekendShareTarget {
    pub table: String,
    pub time_column: String,
    pub min_share: f64,
    pub max_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanInRangeTarget {
    pub table: String,
    pub column: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeEffectTarget {
    pub table: String,
    pub column: String,
    /// Maximum allowed mean absolute percentage error against the expected
    /// multiplicative composition of the column's effect/seasonality chain.
    pub mape_tolerance: f64,
}

#[cfg(test)]
mod weight_spec_tests {
    use super::*;

    #[test]
    fn parses_uniform_string() {
        let spec: WeightSpec = serde_json::from_str("\"uniform\"").unwrap();
        assert!(matches!(spec, WeightSpec::Uniform));
    }

    #[test]
    fn parses_zipf_string() {
        let spec: WeightSpec = serde_json::from_str("\"zipf@1.5\"").unwrap();
        assert!(matches!(spec, WeightSpec::Zipf { s } if (s - 1.5).abs() < 1e-9));
    }

    #[test]
    fn parses_head_tail_string() {
        let spec: WeightSpec = serde_json::from_str("\"head_tail@{0.6,1.5}\"").unwrap();
        match spec {
            WeightSpec::HeadTail { head_share, tail_alpha } => {
                assert!((head_share - 0.6).abs() < 1e-9);
                assert!((tail_alpha - 1.5).abs() < 1e-9);
            }
            other => panic!("expected HeadTail, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unrecognized_string() {
        let err = serde_json::from_str::<WeightSpec>("\"banana@1\"").unwrap_err();
        assert!(err.to_string().contains("unrecognized weight-kind string"));
    }

    #[test]
    fn still_accepts_tagged_object_form() {
        let spec: WeightSpec = serde_json::from_str(r#"{"kind": "zipf", "s": 2.0}"#).unwrap();
        assert!(matches!(spec, WeightSpec::Zipf { s } if (s - 2.0).abs() < 1e-9));
    }

    #[test]
    fn serializes_back_to_tagged_object_form() {
        let spec = WeightSpec::HeadTail { head_share: 0.6, tail_alpha: 1.5 };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "head_tail");
        assert_eq!(json["head_share"], 0.6);
        assert_eq!(json["tail_alpha"], 1.5);
    }
}
