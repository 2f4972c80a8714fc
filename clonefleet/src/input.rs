//! Reading repository locator lists.
//!
//! One locator per line; surrounding whitespace is trimmed and blank lines
//! are ignored. Duplicates are kept.

use crate::errors::Result;
use std::io::BufRead;
use std::path::Path;

/// Splits `text` into locators.
#[must_use]
pub fn parse_locators(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Reads locators from `reader`.
pub fn read_locators(reader: impl BufRead) -> Result<Vec<String>> {
    let mut locators = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            locators.push(line.to_string());
        }
    }
    Ok(locators)
}

/// Reads locators from a file.
pub async fn load_locators(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_locators(&text))
}
