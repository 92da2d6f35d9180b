//! Load model definitions from JSON text or from a directory of `*.json` files.

use crate::config::ModelDefinitionConfig;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::Path;

/// Parse one definition object or an array of them.
pub fn parse_definitions(json: &str) -> Result<Vec<ModelDefinitionConfig>, ConfigError> {
    let value: Value = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(ConfigError::Load(
                "model definitions must be an object or an array of objects".into(),
            ))
        }
    };
    items
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| ConfigError::Load(e.to_string())))
        .collect()
}

/// Read every `*.json` file in `dir`, in file name order.
pub async fn load_definitions_from_dir(
    dir: impl AsRef<Path>,
) -> Result<Vec<ModelDefinitionConfig>, ConfigError> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(e.to_string()))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        tracing::debug!(path = %path.display(), "loading model definitions");
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        out.extend(parse_definitions(&text)?);
    }
    Ok(out)
}
