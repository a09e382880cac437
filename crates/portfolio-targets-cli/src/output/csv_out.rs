use serde_json::{Map, Value};
use std::io;

use super::{format_value, is_record_array};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Optimization results become `symbol,target_weight` rows; record lists
/// (bounds, sector constraints) become one row per record with a leading
/// `section` column.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(weights)) = map.get("target_weights") {
                let _ = wtr.write_record(["symbol", "target_weight"]);
                for (symbol, w) in weights {
                    let _ = wtr.write_record([symbol.as_str(), &format_value(w)]);
                }
            } else if map.values().any(is_record_array) {
                write_sections(&mut wtr, map);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_value(val)]);
                }
            }
        }
        Value::Array(arr) => {
            if let Some(Value::Object(first)) = arr.first() {
                let headers: Vec<&str> = first.keys().map(String::as_str).collect();
                let _ = wtr.write_record(&headers);
                for item in arr {
                    let _ = wtr.write_record(row(item, &headers));
                }
            } else {
                for item in arr {
                    let _ = wtr.write_record([format_value(item)]);
                }
            }
        }
        _ => {
            let _ = wtr.write_record([format_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_sections(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let Some(Value::Object(first)) = map
        .values()
        .find(|v| is_record_array(v))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
    else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut header_row = vec!["section"];
    header_row.extend(headers.iter().copied());
    let _ = wtr.write_record(&header_row);

    for (section, val) in map {
        if let Value::Array(arr) = val {
            if !is_record_array(val) {
                continue;
            }
            for item in arr {
                let mut record = vec![section.clone()];
                record.extend(row(item, &headers));
                let _ = wtr.write_record(&record);
            }
        }
    }
}

fn row(item: &Value, headers: &[&str]) -> Vec<String> {
    headers
        .iter()
        .map(|h| item.get(*h).map(format_value).unwrap_or_default())
        .collect()
}
