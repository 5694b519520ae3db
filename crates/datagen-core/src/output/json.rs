use std::io::Write;

use crate::error::{DatagenError, Result};
use crate::generate::engine::GeneratedTables;
use crate::generate::value::Value;

/// Write generated tables as JSON, streaming directly to `writer`
/// table-by-table and row-by-row rather than building the whole tree in
/// memory first.
pub fn write_json<W: Write>(writer: &mut W, tables: &GeneratedTables) -> Result<()> {
    let table_count = tables.len();

    write_str(writer, "{\n")?;

    for (table_idx, (table_name, table)) in tables.iter().enumerate() {
        let safe_table_key = json_key(table_name)?;
        write_str(writer, &format!("  {}: [\n", safe_table_key))?;

        let row_count = table.rows.len();
        for (row_idx, row) in table.rows.iter().enumerate() {
            write_str(writer, "    {")?;

            let col_count = row.len();
            for (col_idx, (col_name, value)) in row.iter().enumerate() {
                let safe_col_key = json_key(col_name)?;
                let val_str = json_value(value)?;
                write_str(writer, &format!("\n      {}: {}", safe_col_key, val_str))?;
                if col_idx < col_count - 1 {
                    write_str(writer, ",")?;
                }
            }

            write_str(writer, "\n    }")?;
            if row_idx < row_count - 1 {
                write_str(writer, ",")?;
            }
            write_str(writer, "\n")?;
        }

        write_str(writer, "  ]")?;
        if table_idx < table_count - 1 {
            write_str(writer, ",")?;
        }
        write_str(writer, "\n")?;
    }

    write_str(writer, "}\n")?;

    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes()).map_err(|e| DatagenError::Output {
        message: "writing JSON".to_string(),
        source: e,
    })
}

/// Serialize a string as an RFC 8259-compliant JSON key, via `serde_json`
/// rather than Rust's `{:?}` Debug format (which doesn't escape unicode
/// control characters per the JSON spec).
fn json_key(s: &str) -> Result<String> {
    serde_json::to_string(s).map_err(|e| DatagenError::Other(format!("JSON key error: {e}")))
}

fn json_value(value: &Value) -> Result<String> {
    let json_val = value_to_json(value);
    serde_json::to_string(&json_val)
        .map_err(|e| DatagenError::Other(format!("JSON serialization error: {e}")))
}

/// Timestamps render as ISO 8601 with millisecond precision and a
/// trailing `Z`. Bytes render as a lowercase hex string (no `base64`
/// dependency carried just for this).
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::json!(*i),
        Value::Float(f) => serde_json::json!(*f),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Timestamp(ts) => {
            serde_json::Value::String(format!("{}Z", ts.format("%Y-%m-%dT%H:%M:%S%.3f")))
        }
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => serde_json::Value::String(t.format("%H:%M:%S").to_string()),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Json(j) => j.clone(),
        Value::Bytes(_) => serde_json::Value::String(value.to_csv_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::engine::GeneratedTable;
    use indexmap::IndexMap;

    fn single_row_tables(table_name: &str, row: IndexMap<String, Value>) -> GeneratedTables {
        let mut tables = IndexMap::new();
        tables.insert(table_name.to_string(), GeneratedTable { rows: vec![row] });
        tables
    }

    #[test]
    fn writes_simple_table_as_json() {
        let mut row = IndexMap::new();
        row.insert("name".to_string(), Value::owned("Alice"));
        row.insert("active".to_string(), Value::Bool(true));
        let tables = single_row_tables("users", row);

        let mut output = Vec::new();
        write_json(&mut output, &tables).unwrap();

        let json_str = String::from_utf8(output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();
        assert!(parsed["users"].is_array());
        assert_eq!(parsed["users"][0]["name"], "Alice");
    }

    #[test]
    fn timestamps_render_with_millis_and_z_suffix() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_milli_opt(12, 30, 45, 123)
            .unwrap();
        let mut row = IndexMap::new();
        row.insert("created_at".to_string(), Value::Timestamp(ts));
        let tables = single_row_tables("events", row);

        let mut output = Vec::new();
        write_json(&mut output, &tables).unwrap();
        let json_str = String::from_utf8(output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();
        let ts_str = parsed["events"][0]["created_at"].as_str().unwrap();
        assert_eq!(ts_str, "2025-06-15T12:30:45.123Z");
    }

    #[test]
    fn column_order_is_deterministic_across_serializations() {
        let mut row = IndexMap::new();
        row.insert("alpha".to_string(), Value::Int(1));
        row.insert("beta".to_string(), Value::Int(2));
        row.insert("gamma".to_string(), Value::Int(3));
        let tables = single_row_tables("test", row);

        let mut first = Vec::new();
        write_json(&mut first, &tables).unwrap();
        let first = String::from_utf8(first).unwrap();

        for _ in 0..5 {
            let mut output = Vec::new();
            write_json(&mut output, &tables).unwrap();
            assert_eq!(String::from_utf8(output).unwrap(), first);
        }

        let alpha_pos = first.find("\"alpha\"").unwrap();
        let beta_pos = first.find("\"beta\"").unwrap();
        let gamma_pos = first.find("\"gamma\"").unwrap();
        assert!(alpha_pos < beta_pos && beta_pos < gamma_pos);
    }

    #[test]
    fn streaming_many_rows_produces_valid_json() {
        let mut rows = Vec::new();
        for i in 0..500 {
            let mut row = IndexMap::new();
            row.insert("id".to_string(), Value::Int(i));
            row.insert("name".to_string(), Value::owned(format!("user_{i}")));
            rows.push(row);
        }
        let mut tables = IndexMap::new();
        tables.insert("users".to_string(), GeneratedTable { rows });

        let mut output = Vec::new();
        write_json(&mut output, &tables).unwrap();
        let json_str = String::from_utf8(output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed["users"].as_array().unwrap().len(), 500);
    }
}
