use serde_json::Value;

use super::format_value;

/// Print just the answer: one `symbol weight` line per target, the error
/// of a failed run, or the first field of anything else.
pub fn print_minimal(value: &Value) {
    let Value::Object(map) = value else {
        println!("{}", format_value(value));
        return;
    };

    if map.get("success") == Some(&Value::Bool(false)) {
        let msg = map.get("error").map(format_value).unwrap_or_default();
        println!("error: {}", msg);
        return;
    }

    if let Some(Value::Object(weights)) = map.get("target_weights") {
        for (symbol, w) in weights {
            println!("{} {}", symbol, format_value(w));
        }
        return;
    }

    if let Some(Value::Array(bounds)) = map.get("bounds") {
        for b in bounds {
            println!(
                "{} {} {}",
                b.get("symbol").map(format_value).unwrap_or_default(),
                b.get("lower").map(format_value).unwrap_or_default(),
                b.get("upper").map(format_value).unwrap_or_default()
            );
        }
        return;
    }

    if let Some((key, val)) = map.iter().next() {
        println!("{}: {}", key, format_value(val));
    }
}
