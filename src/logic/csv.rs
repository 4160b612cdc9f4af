// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! CSV serialization for record export.
//!
//! Rows are ordered key/value pairs; the header row is taken from the
//! first record's key order. Output is RFC 4180 compatible: fields
//! containing a comma, double quote, or newline are wrapped in double
//! quotes with inner quotes doubled.

use chrono::NaiveDate;

/// One flat record as ordered `(column, value)` pairs.
pub type Row = Vec<(String, String)>;

/// Serialize records to CSV text. Empty input produces empty output.
///
/// Columns follow the first row's key order; a row missing a column
/// contributes an empty field for it.
pub fn to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let headers: Vec<&str> = first.iter().map(|(key, _)| key.as_str()).collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let line = headers
            .iter()
            .map(|header| {
                row.iter()
                    .find(|(key, _)| key == header)
                    .map(|(_, value)| escape(value))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    lines.join("\n")
}

/// Suggested export file name: `fichas_medicas_<ISO date>.csv`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("fichas_medicas_{}.csv", date.format("%Y-%m-%d"))
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
