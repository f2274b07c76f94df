//! Utility functions and helpers.

pub mod http;

use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use url::Url;

use crate::error::{AppError, Result};

/// Join an API path onto a base URL, keeping the base's own path.
///
/// `endpoint("http://host/api", "object/meta")` -> `http://host/api/object/meta`
pub fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Load the skip list: a JSON file holding an array of strings.
pub fn load_skip_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    parse_skip_list(&value)
        .map_err(|e| AppError::config(format!("{}: {}, please fix", path.display(), e)))
}

fn parse_skip_list(value: &serde_json::Value) -> std::result::Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| "skip list is not an array of strings".to_string())?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| format!("skip list entry {item} is not a string"))
        })
        .collect()
}

/// Compile skip patterns into one case-insensitive alternation.
pub fn skip_regex(patterns: &[String]) -> Result<Option<Regex>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let regex = RegexBuilder::new(&patterns.join("|"))
        .case_insensitive(true)
        .build()?;
    Ok(Some(regex))
}

/// Make a crate id safe to use as a file name.
pub fn sanitize_filename(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>'))
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
