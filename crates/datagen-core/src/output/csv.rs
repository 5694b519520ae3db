use std::io::Write;

use crate::error::{DatagenError, Result};
use crate::generate::engine::GeneratedTables;
use crate::generate::value::Value;
use indexmap::IndexMap;

/// Write generated tables as CSV, one `# Table: <name>` section per table.
pub fn write_csv<W: Write>(writer: &mut W, tables: &GeneratedTables) -> Result<()> {
    for (table_name, table) in tables {
        if table.rows.is_empty() {
            continue;
        }

        writeln!(writer, "# Table: {table_name}").map_err(|e| DatagenError::Output {
            message: format!("writing CSV header for {table_name}"),
            source: e,
        })?;

        write_csv_table(writer, table_name, &table.rows)?;

        writeln!(writer).map_err(|e| DatagenError::Output {
            message: "writing newline".to_string(),
            source: e,
        })?;
    }

    Ok(())
}

/// Write CSV for a single table (header row + data rows) to `writer`.
pub fn write_csv_table<W: Write>(
    writer: &mut W,
    table_name: &str,
    rows: &[IndexMap<String, Value>],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let columns: Vec<&String> = rows[0].keys().collect();
    writeln!(
        writer,
        "{}",
        columns.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(",")
    )
    .map_err(|e| DatagenError::Output {
        message: format!("writing CSV columns for {table_name}"),
        source: e,
    })?;

    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| row.get(*col).map(|v| csv_escape(&v.to_csv_string())).unwrap_or_default())
            .collect();

        writeln!(writer, "{}", values.join(",")).map_err(|e| DatagenError::Output {
            message: format!("writing CSV row for {table_name}"),
            source: e,
        })?;
    }

    Ok(())
}

/// Quote a field if it contains a comma, quote, or newline.
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::engine::GeneratedTable;

    #[test]
    fn escapes_commas_and_quotes() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn writes_header_and_rows_per_table() {
        let mut row = IndexMap::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("name".to_string(), Value::owned("Alice"));

        let mut tables = IndexMap::new();
        tables.insert("users".to_string(), GeneratedTable { rows: vec![row] });

        let mut output = Vec::new();
        write_csv(&mut output, &tables).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("# Table: users"));
        assert!(text.contains("id,name"));
        assert!(text.contains("1,Alice"));
    }

    #[test]
    fn skips_tables_with_no_rows() {
        let mut tables = IndexMap::new();
        tables.insert("empty".to_string(), GeneratedTable { rows: Vec::new() });

        let mut output = Vec::new();
        write_csv(&mut output, &tables).unwrap();
        assert!(String::from_utf8(output).unwrap().is_empty());
    }
}
