//! Placeholder substitution in configuration documents
//!
//! String values may reference `${NAMESPACE.VAR}` placeholders. Values come
//! from the environment file of the target environment, looked up first by
//! the full `NAMESPACE.VAR` name and then by `VAR` alone. Only string values
//! are rewritten; keys and non-string scalars are left untouched.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::errors::CliError;
use crate::filesys::file::File;

/// Variables available for substitution
pub type EnvVars = HashMap<String, String>;

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\}"));

fn placeholder() -> Result<&'static Regex, CliError> {
    LazyLock::force(&PLACEHOLDER)
        .as_ref()
        .map_err(|e| CliError::Internal(format!("placeholder pattern: {}", e)))
}

/// Load an `.env` style file
///
/// A missing file yields an empty set so projects without placeholders work
/// without creating one.
pub async fn load_env_file(file: &File) -> Result<EnvVars, CliError> {
    if !file.exists().await {
        warn!("Environment file {} not found", file.path().display());
        return Ok(EnvVars::new());
    }

    let contents = file.read_string().await?;
    let mut vars = EnvVars::new();
    for item in dotenvy::from_read_iter(contents.as_bytes()) {
        let (key, value) = item?;
        vars.insert(key, value);
    }
    debug!("Loaded {} variables from {}", vars.len(), file.path().display());
    Ok(vars)
}

/// Whether a file is parsed and injected before upload
pub fn is_structured(path: &Path) -> bool {
    matches!(
        File::new(path).extension().as_deref(),
        Some("json" | "yaml" | "yml")
    )
}

/// Substitute placeholders in one string
///
/// Unresolved names are appended to `missing` and left in place.
fn substitute(pattern: &Regex, input: &str, vars: &EnvVars, missing: &mut Vec<String>) -> String {
    pattern
        .replace_all(input, |caps: &Captures| {
            let full = format!("{}.{}", &caps[1], &caps[2]);
            match vars.get(&full).or_else(|| vars.get(&caps[2])) {
                Some(value) => value.clone(),
                None => {
                    if !missing.contains(&full) {
                        missing.push(full);
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn walk_json(
    pattern: &Regex,
    value: &mut serde_json::Value,
    vars: &EnvVars,
    missing: &mut Vec<String>,
) {
    match value {
        serde_json::Value::String(s) => *s = substitute(pattern, s, vars, missing),
        serde_json::Value::Array(items) => {
            items.iter_mut().for_each(|item| walk_json(pattern, item, vars, missing))
        }
        serde_json::Value::Object(map) => {
            map.values_mut().for_each(|item| walk_json(pattern, item, vars, missing))
        }
        _ => {}
    }
}

fn walk_yaml(
    pattern: &Regex,
    value: &mut serde_yaml::Value,
    vars: &EnvVars,
    missing: &mut Vec<String>,
) {
    match value {
        serde_yaml::Value::String(s) => *s = substitute(pattern, s, vars, missing),
        serde_yaml::Value::Sequence(items) => {
            items.iter_mut().for_each(|item| walk_yaml(pattern, item, vars, missing))
        }
        serde_yaml::Value::Mapping(map) => {
            map.values_mut().for_each(|item| walk_yaml(pattern, item, vars, missing))
        }
        serde_yaml::Value::Tagged(tagged) => walk_yaml(pattern, &mut tagged.value, vars, missing),
        _ => {}
    }
}

fn into_result(missing: Vec<String>) -> Result<(), CliError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::MissingVariables(missing))
    }
}

/// Substitute placeholders throughout a JSON document
pub fn inject_json(value: &mut serde_json::Value, vars: &EnvVars) -> Result<(), CliError> {
    let pattern = placeholder()?;
    let mut missing = Vec::new();
    walk_json(pattern, value, vars, &mut missing);
    into_result(missing)
}

/// Substitute placeholders throughout a YAML document
pub fn inject_yaml(value: &mut serde_yaml::Value, vars: &EnvVars) -> Result<(), CliError> {
    let pattern = placeholder()?;
    let mut missing = Vec::new();
    walk_yaml(pattern, value, vars, &mut missing);
    into_result(missing)
}

/// Parse a structured file, inject placeholders and serialize it again
///
/// Fails without output when any referenced variable is missing.
pub fn inject_document(path: &Path, contents: &str, vars: &EnvVars) -> Result<Vec<u8>, CliError> {
    if File::new(path).extension().as_deref() == Some("json") {
        let mut document: serde_json::Value = serde_json::from_str(contents)?;
        inject_json(&mut document, vars)?;
        Ok(serde_json::to_string_pretty(&document)?.into_bytes())
    } else {
        let mut document: serde_yaml::Value = serde_yaml::from_str(contents)?;
        inject_yaml(&mut document, vars)?;
        Ok(serde_yaml::to_string(&document)?.into_bytes())
    }
}
