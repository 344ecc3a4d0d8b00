//! Survey files on disk
//!
//! A survey file holds authoring input: title, optional `randomize` flag and
//! the question list. YAML is chosen by extension, anything else is JSON.

use anyhow::{Context, Result};
use kiosk_core::NewSurvey;
use std::path::Path;

/// Read and parse a survey file without validating it
///
/// # Errors
/// Fails if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<NewSurvey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading survey file {}", path.display()))?;
    parse(&raw, is_yaml(path)).with_context(|| format!("parsing survey file {}", path.display()))
}

/// Parse survey text
///
/// # Errors
/// Fails on malformed input.
pub fn parse(raw: &str, yaml: bool) -> Result<NewSurvey> {
    if yaml {
        Ok(serde_yaml::from_str(raw)?)
    } else {
        Ok(serde_json::from_str(raw)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}
