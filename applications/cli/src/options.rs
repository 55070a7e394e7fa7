//! Options bundle assembly from files and `--set` flags

use crate::config::ShelfConfig;
use crate::OptionArgs;
use anyhow::{anyhow, bail, Context, Result};
use shelf_workflow::{RawOptions, Workflow};
use std::fs;
use std::path::Path;

/// Merge the options file, `--set` overrides, and config defaults
pub fn collect(args: &OptionArgs, workflow: Workflow, config: &ShelfConfig) -> Result<RawOptions> {
    let mut options = match &args.options {
        Some(path) => read_file(path)?,
        None => RawOptions::new(),
    };

    for assignment in &args.set {
        let (key, value) = parse_assignment(assignment)?;
        options.insert(key, value);
    }

    if workflow == Workflow::Cleaner && !options.contains_key("template") {
        options.insert("template".to_string(), config.default_template.clone());
    }

    tracing::debug!("Options for {}: {:?}", workflow, options);
    Ok(options)
}

/// Read a JSON or TOML options file (chosen by extension)
pub fn read_file(path: &Path) -> Result<RawOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file {}", path.display()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        table
            .into_iter()
            .map(|(key, value)| Ok((key.clone(), toml_scalar(&key, value)?)))
            .collect()
    } else {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        object
            .into_iter()
            .map(|(key, value)| Ok((key.clone(), json_scalar(&key, value)?)))
            .collect()
    }
}

fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", assignment))?;

    let key = key.trim();
    if key.is_empty() {
        bail!("Missing option name in '{}'", assignment);
    }
    Ok((key.to_string(), value.to_string()))
}

// Lists become comma-separated so `extensions = ["mp3", "flac"]` works
fn json_scalar(key: &str, value: serde_json::Value) -> Result<String> {
    use serde_json::Value;

    match value {
        Value::String(text) => Ok(text),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(items) => {
            let parts = items
                .into_iter()
                .map(|item| json_scalar(key, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(","))
        }
        Value::Object(_) => bail!("Option '{}' must be a plain value", key),
    }
}

fn toml_scalar(key: &str, value: toml::Value) -> Result<String> {
    use toml::Value;

    match value {
        Value::String(text) => Ok(text),
        Value::Boolean(flag) => Ok(flag.to_string()),
        Value::Integer(number) => Ok(number.to_string()),
        Value::Float(number) => Ok(number.to_string()),
        Value::Datetime(stamp) => Ok(stamp.to_string()),
        Value::Array(items) => {
            let parts = items
                .into_iter()
                .map(|item| toml_scalar(key, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(","))
        }
        Value::Table(_) => bail!("Option '{}' must be a plain value", key),
    }
}
