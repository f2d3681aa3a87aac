use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;

const PLACEHOLDER: &str = r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";
const EXCLUDED: [&str; 2] = ["PLUGIN_ENDPOINT", "ENDPOINT"];

pub fn plugin_env<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(key, _)| key.contains("PLUGIN") && !EXCLUDED.contains(&key.as_str()))
        .collect()
}

pub fn expand(template: &str, env: &BTreeMap<String, String>) -> Result<String> {
    let placeholder = Regex::new(PLACEHOLDER).map_err(|e| Error::template(e.to_string()))?;

    let missing: Vec<&str> = placeholder
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !env.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(Error::template(format!(
            "undefined variable(s) in deployment values: {}",
            missing.join(", ")
        )));
    }

    Ok(placeholder
        .replace_all(template, |c: &regex::Captures| env[&c[1]].clone())
        .into_owned())
}

/// Expands `template` and parses it as the JSON values document.
pub fn parse_values(template: &str, env: &BTreeMap<String, String>) -> Result<serde_json::Value> {
    if template.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let expanded = expand(template, env)?;
    serde_json::from_str(&expanded)
        .map_err(|e| Error::template(format!("unable to parse deployment values: [{}]", e)))
}
