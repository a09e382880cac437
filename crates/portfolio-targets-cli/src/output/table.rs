use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, is_record_array};

/// Format output as tables: scalar fields first, then one table per
/// weight map or record list, then diagnostics.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => print_object(map),
        Value::Array(arr) => print_records(arr),
        _ => println!("{}", value),
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalars = 0;
    for (key, val) in map {
        if val.is_array() || val.is_object() {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
        scalars += 1;
    }
    if scalars > 0 {
        println!("{}", Table::from(builder));
    }

    for (key, val) in map {
        match val {
            Value::Object(inner) if !inner.is_empty() => {
                println!("\n{}:", title(key));
                print_pairs(inner);
            }
            Value::Array(arr) if is_record_array(val) => {
                println!("\n{}:", title(key));
                print_records(arr);
            }
            _ => {}
        }
    }

    if let Some(Value::Array(notes)) = map.get("diagnostics") {
        if !notes.is_empty() {
            println!("\nDiagnostics:");
            for n in notes {
                if let Value::String(s) = n {
                    println!("  - {}", s);
                }
            }
        }
    }
}

/// Two-column table for a map of scalars; nested values are shown as JSON.
fn print_pairs(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Key", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_records(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn title(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
