// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Listing formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

/// Rows of catalog metadata with named columns
pub struct Listing {
    pub title: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(title: impl Into<String>, columns: Vec<&'static str>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

pub struct ListingFormatter;

impl ListingFormatter {
    pub fn format(listing: &Listing, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(listing),
            OutputFormat::Json => Self::format_json(listing),
            OutputFormat::Csv => Self::format_csv(listing),
        }
    }

    /// Format a listing as a table using comfy-table
    fn format_table(listing: &Listing) -> String {
        if listing.rows.is_empty() {
            return format!("{}\n", format!("No {} found", listing.title).yellow());
        }

        let mut output = String::new();
        output.push_str(&format!("{}\n", listing.title.bold().green()));
        output.push_str(&format!("Rows: {}\n\n", listing.rows.len()));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        let header: Vec<Cell> = listing
            .columns
            .iter()
            .map(|col| Cell::new(col).fg(Color::Green))
            .collect();
        table.set_header(header);
        for row in &listing.rows {
            table.add_row(row.clone());
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_json(listing: &Listing) -> String {
        let rows: Vec<serde_json::Value> = listing
            .rows
            .iter()
            .map(|row| {
                let mut map = serde_json::Map::new();
                for (col, value) in listing.columns.iter().zip(row) {
                    map.insert(col.to_string(), serde_json::Value::String(value.clone()));
                }
                serde_json::Value::Object(map)
            })
            .collect();
        let json = serde_json::json!({
            "title": listing.title,
            "columns": listing.columns,
            "rows": rows,
        });
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize listing to JSON\"}".to_string()
        })
    }

    fn format_csv(listing: &Listing) -> String {
        let mut output = listing.columns.join(",");
        output.push('\n');
        for row in &listing.rows {
            let values: Vec<String> = row.iter().map(|v| Self::csv_escape(v)).collect();
            output.push_str(&values.join(","));
            output.push('\n');
        }
        output
    }

    fn csv_escape(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

/// Render an optional value, `-` when absent
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render a list of ids as `1, 2, 3`
pub fn join_ids<'a, I: IntoIterator<Item = &'a u64>>(ids: I) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
