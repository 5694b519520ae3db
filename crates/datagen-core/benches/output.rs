//! Benchmarks for output formatters — JSON and CSV serialization.
//!
//! Measures throughput of formatting pre-generated tables. Uses a
//! black-hole writer to isolate formatter cost from I/O.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use indexmap::IndexMap;
use std::io::Write;

use datagen_core::generate::{GeneratedTable, GeneratedTables};
use datagen_core::generate::Value;
use datagen_core::output::{write_csv, write_json};

struct NullWriter;

impl Write for NullWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn make_tables(row_count: usize) -> GeneratedTables {
    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        let mut row = IndexMap::new();
        row.insert("name".to_string(), Value::owned(format!("User {i}")));
        row.insert("email".to_string(), Value::owned(format!("user{i}@example.com")));
        row.insert("age".to_string(), Value::Int(20 + (i as i64 % 60)));
        row.insert("price".to_string(), Value::Float(9.99 + i as f64 * 0.01));
        row.insert("active".to_string(), Value::Bool(i % 3 != 0));
        row.insert(
            "created_at".to_string(),
            Value::Timestamp(
                chrono::NaiveDateTime::new(
                    chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                ) + chrono::Duration::seconds(i as i64),
            ),
        );
        if i % 10 == 0 {
            row.insert("bio".to_string(), Value::Null);
        } else {
            row.insert(
                "bio".to_string(),
                Value::owned(format!(
                    "A longer description field that contains commas, \"quotes\", and other special characters for row {i}."
                )),
            );
        }
        rows.push(row);
    }

    let mut tables = IndexMap::new();
    tables.insert("users".to_string(), GeneratedTable { rows });
    tables
}

fn bench_json_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("output/json");

    for row_count in [100, 1000, 10_000] {
        let tables = make_tables(row_count);
        group.throughput(Throughput::Elements(row_count as u64));
        group.bench_with_input(BenchmarkId::new("rows", row_count), &tables, |b, tables| {
            b.iter(|| {
                let mut w = NullWriter;
                write_json(&mut w, tables).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_csv_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("output/csv");

    for row_count in [100, 1000, 10_000] {
        let tables = make_tables(row_count);
        group.throughput(Throughput::Elements(row_count as u64));
        group.bench_with_input(BenchmarkId::new("rows", row_count), &tables, |b, tables| {
            b.iter(|| {
                let mut w = NullWriter;
                write_csv(&mut w, tables).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_json_output, bench_csv_output);
criterion_main!(benches);
