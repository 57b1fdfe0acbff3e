//! Machine-readable export of a [`DocumentTree`] as YAML or JSON.
//!
//! The export carries the same data the site generator renders, keyed and
//! ordered the same way.

use crate::document::DocumentTree;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a document tree to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(tree: &DocumentTree) -> Result<String> {
    debug!("Serializing document tree to YAML");
    serde_yaml::to_string(tree).context("Failed to serialize document tree to YAML")
}

/// Serializes a document tree to JSON format with pretty printing.
///
/// # Arguments
///
/// * `tree` - The document tree to serialize
///
/// # Returns
///
/// Returns the JSON string representation of the tree.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(tree: &DocumentTree) -> Result<String> {
    debug!("Serializing document tree to JSON");
    serde_json::to_string_pretty(tree).context("Failed to serialize document tree to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// Overwrites the file if it exists.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
