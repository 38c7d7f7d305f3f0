//! Terminal rendering for command results.
//!
//! The gateway returns one structured result shape; the caller picks the
//! rendering: plain text, a column table, or serialized JSON.

use clap::ValueEnum;
use console::style;
use serde_json::Value;

/// Output rendering requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Key/value lines.
    Text,

    /// Column table (for list results).
    Table,

    /// Pretty-printed JSON.
    Json,
}

/// Render a result value to stdout in the requested format.
pub fn render(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
        OutputFormat::Text => render_text(value, 0),
        OutputFormat::Table => render_table(value),
    }
}

fn render_text(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{pad}{}:", style(key).dim());
                        render_text(item, indent + 1);
                    }
                    scalar => println!("{pad}{}: {}", style(key).dim(), scalar_str(scalar)),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                render_text(item, indent);
                if indent == 0 {
                    println!();
                }
            }
        }
        scalar => println!("{pad}{}", scalar_str(scalar)),
    }
}

/// Render an array of flat objects as a column table; anything else falls
/// back to text.
fn render_table(value: &Value) {
    let rows = match find_rows(value) {
        Some(rows) if !rows.is_empty() => rows,
        _ => return render_text(value, 0),
    };

    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let text = row
                        .get(column)
                        .map(cell_str)
                        .unwrap_or_default();
                    widths[i] = widths[i].max(text.len());
                    text
                })
                .collect()
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
        .collect();
    println!("{}", style(header.join("  ")).bold());

    for row in cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{:<width$}", text, width = widths[i]))
            .collect();
        println!("{}", line.join("  "));
    }
}

/// A table needs rows: either the value itself is an array, or it is an
/// object with exactly one array field (`{"workflows": [...]}`).
fn find_rows(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => {
            let arrays: Vec<&Value> = map.values().filter(|v| v.is_array()).collect();
            match arrays.as_slice() {
                [one] => one.as_array().cloned(),
                _ => None,
            }
        }
        _ => None,
    }
}

fn scalar_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => style("-").dim().to_string(),
        other => other.to_string(),
    }
}

fn cell_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}
