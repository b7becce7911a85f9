//! Variable loading from the site's data directory
//!
//! Every `*.toml` file in the data directory becomes one context entry keyed
//! by its file stem: `data/author.toml` is visible to templates as `author`.

use crate::Result;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Load all data files from `data_dir`
///
/// Files are loaded in file-name order so repeated builds see the same
/// context. A missing directory yields an empty map.
pub fn load_data_dir(data_dir: &Path) -> Result<IndexMap<String, JsonValue>> {
    let mut variables = IndexMap::new();

    if !data_dir.exists() {
        tracing::debug!("Data directory {} does not exist", data_dir.display());
        return Ok(variables);
    }

    let mut paths: Vec<_> = fs::read_dir(data_dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    for path in paths {
        if let Some((file_stem, vars)) = load_variable_file(&path)? {
            let wrapped =
                IndexMap::from([(file_stem, JsonValue::Object(vars.into_iter().collect()))]);
            merge_variables(&mut variables, wrapped);
        }
    }

    Ok(variables)
}

/// Load a single variable file (TOML only)
/// Returns the file stem (name without extension) and the loaded variables
fn load_variable_file(path: &Path) -> Result<Option<(String, IndexMap<String, JsonValue>)>> {
    if path.extension().and_then(|s| s.to_str()) != Some("toml") {
        return Ok(None);
    }

    let file_stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem.to_string(),
        None => return Ok(None),
    };

    let content = fs::read_to_string(path).map_err(|e| {
        jssg_core::Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let vars = parse_toml_table(&content).map_err(|e| {
        jssg_core::Error::Config(format!("Failed to parse TOML from {}: {e}", path.display()))
    })?;

    Ok(Some((file_stem, vars)))
}

/// Parse a TOML document into JSON values
///
/// TOML dates and datetimes become their RFC 3339 strings, which the
/// template date filters accept.
///
/// # Errors
///
/// Returns the parser error if `content` is not a TOML table
pub fn parse_toml_table(
    content: &str,
) -> std::result::Result<IndexMap<String, JsonValue>, toml::de::Error> {
    let table: toml::Table = toml::from_str(content)?;

    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect())
}

fn toml_to_json(value: toml::Value) -> JsonValue {
    match value {
        toml::Value::String(s) => JsonValue::String(s),
        toml::Value::Integer(i) => JsonValue::from(i),
        toml::Value::Float(f) => JsonValue::from(f),
        toml::Value::Boolean(b) => JsonValue::Bool(b),
        toml::Value::Datetime(dt) => JsonValue::String(dt.to_string()),
        toml::Value::Array(items) => {
            JsonValue::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => JsonValue::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Deep merge two variable maps (second overwrites first on conflicts)
pub fn merge_variables(
    base: &mut IndexMap<String, JsonValue>,
    overlay: IndexMap<String, JsonValue>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), &value) {
            (Some(JsonValue::Object(base_obj)), JsonValue::Object(overlay_obj)) => {
                let mut base_map: IndexMap<String, JsonValue> =
                    base_obj.clone().into_iter().collect();
                let overlay_map: IndexMap<String, JsonValue> =
                    overlay_obj.clone().into_iter().collect();
                merge_variables(&mut base_map, overlay_map);
                *base_obj = base_map.into_iter().collect();
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}
