use serde::de::DeserializeOwned;
use std::io::{self, Read};

use super::file::DocumentFormat;

/// Snapshot piped on stdin, or `None` when stdin is a terminal or empty.
///
/// A document opening with `{` is parsed as JSON, anything else as YAML.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(buffer: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let format = if trimmed.starts_with('{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    };
    let value = format
        .parse(trimmed)
        .map_err(|e| format!("Failed to parse stdin as {:?}: {}", format, e))?;
    Ok(Some(value))
}
