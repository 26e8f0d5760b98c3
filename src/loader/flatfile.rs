use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{
    config::FlatFileFormat,
    errors::DbError,
    loader::mapper::RowRecord,
    models::schema::{TableDefinition, NULL_SENTINEL},
};

/// Encodes one field the way the bulk loader's default `ESCAPED BY '\\'` reads it back.
/// With `null_marker` set, a `\N` value is written raw and loads as NULL.
pub fn encode_field(value: &str, enclose: bool, null_marker: bool) -> String {
    if null_marker && value == NULL_SENTINEL {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    if enclose {
        out.push('"');
    }
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' if enclose => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    if enclose {
        out.push('"');
    }
    out
}

pub fn decode_field(field: &str, format: &FlatFileFormat) -> String {
    if field == NULL_SENTINEL {
        return field.to_string();
    }
    let inner = if format.quoted && field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        &field[1..field.len() - 1]
    } else {
        field
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Renders rows in attribute order. Missing attributes get their null placeholder.
pub fn render_rows(table: &TableDefinition, rows: &[RowRecord], format: &FlatFileFormat) -> String {
    let attributes = table.ordered_attributes();
    let mut out = String::new();
    for row in rows {
        let fields: Vec<String> = attributes
            .iter()
            .map(|attr| {
                let value = row
                    .get(&attr.attribute_id)
                    .map(String::as_str)
                    .unwrap_or_else(|| attr.null_placeholder());
                let is_string = attr.is_string_type();
                encode_field(value, format.quoted && is_string, !is_string)
            })
            .collect();
        out.push_str(&fields.join(&format.field_separator));
        out.push_str(&format.row_separator);
    }
    out
}

/// Writes (or appends) one table's rows; returns the number of rows written.
pub fn write_table_file(
    path: &Path,
    table: &TableDefinition,
    rows: &[RowRecord],
    format: &FlatFileFormat,
    append: bool,
) -> Result<usize, DbError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| DbError::Export(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_rows(table, rows, format).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| DbError::Export(format!("{}: {}", path.display(), e)))?;
    debug!("Wrote {} rows for {} to {}", rows.len(), table.table_id, path.display());
    Ok(rows.len())
}

/// Reads a flat file back into field lists.
pub fn read_table_file(path: &Path, format: &FlatFileFormat) -> Result<Vec<Vec<String>>, DbError> {
    let content = fs::read_to_string(path)
        .map_err(|e| DbError::Import(format!("{}: {}", path.display(), e)))?;
    Ok(parse_rows(&content, format))
}

pub fn parse_rows(content: &str, format: &FlatFileFormat) -> Vec<Vec<String>> {
    let body = content
        .strip_suffix(format.row_separator.as_str())
        .unwrap_or(content);
    if body.is_empty() {
        return Vec::new();
    }
    body.split(format.row_separator.as_str())
        .map(|line| {
            line.split(format.field_separator.as_str())
                .map(|f| decode_field(f, format))
                .collect()
        })
        .collect()
}
