//! Export of derived rows: tab-separated (original columns + derived) or JSON.
//!
//! TSV goes through a polars frame and `CsvWriter`: original cells stay
//! strings, derived columns are `Float64` written with six decimals.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde_json::{Map, Value, json};

use crate::types::{DerivedRow, NumericColumn};

/// Original columns followed by the derived ones. An original column named
/// like a derived one is replaced, so re-exporting an export stays flat.
pub fn results_frame(header: &[String], rows: &[&DerivedRow]) -> Result<DataFrame> {
    let derived: Vec<String> = NumericColumn::DERIVED.iter().map(|c| c.name()).collect();
    let mut columns: Vec<Column> = Vec::with_capacity(header.len() + derived.len());

    for (idx, name) in header.iter().enumerate() {
        if derived.contains(name) {
            continue;
        }
        let values: Vec<&str> = rows
            .iter()
            .map(|row| row.row.cells.get(idx).map(String::as_str).unwrap_or(""))
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    for (column, name) in NumericColumn::DERIVED.iter().zip(&derived) {
        let values: Vec<Option<f64>> = rows.iter().map(|row| row.value(*column)).collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    DataFrame::new(columns).context("Failed to assemble export frame")
}

/// Render rows as TSV: the original header followed by the derived columns.
pub fn format_results(header: &[String], rows: &[&DerivedRow]) -> Result<String> {
    let mut frame = results_frame(header, rows)?;
    let mut buffer: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b'\t')
        .with_quote_style(QuoteStyle::Never)
        .with_float_precision(Some(6))
        .finish(&mut frame)
        .context("Failed to serialize rows as TSV")?;
    String::from_utf8(buffer).context("TSV export is not valid UTF-8")
}

pub fn write_results(path: &Path, header: &[String], rows: &[&DerivedRow]) -> Result<()> {
    let content = format_results(header, rows)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

/// One JSON object per row, keyed by column name. Numeric-looking cells of the
/// original table stay strings; derived columns are numbers. Each record also
/// carries its source `line` unless the table has its own `line` column.
pub fn to_json(header: &[String], rows: &[&DerivedRow]) -> Value {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (name, cell) in header.iter().zip(&row.row.cells) {
                if name.is_empty() {
                    continue;
                }
                record.insert(name.clone(), Value::String(cell.clone()));
            }
            for column in NumericColumn::DERIVED {
                let value = row.value(column).map(|v| json!(v)).unwrap_or(Value::Null);
                record.insert(column.name(), value);
            }
            // A source column called "line" wins over the row number
            record
                .entry("line")
                .or_insert_with(|| json!(row.row.line));
            Value::Object(record)
        })
        .collect();
    Value::Array(records)
}

pub fn write_json(path: &Path, header: &[String], rows: &[&DerivedRow]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create '{}'", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &to_json(header, rows))
        .with_context(|| format!("Failed to serialize rows to '{}'", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
