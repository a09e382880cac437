use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Encoding of a snapshot or configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml` / `.yml` are YAML; anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, contents: &str) -> Result<T, String> {
        match self {
            DocumentFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            DocumentFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        }
    }
}

/// Read a snapshot or config file, choosing the parser from its extension.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let format = DocumentFormat::from_path(&canonical);
    let value = format
        .parse(&contents)
        .map_err(|e| format!("Failed to parse '{}' as {:?}: {}", canonical.display(), format, e))?;
    Ok(value)
}

fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.is_file() {
        return Err(format!("Not a readable file: {}", canonical.display()).into());
    }
    Ok(canonical)
}
