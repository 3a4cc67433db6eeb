//! Loading configuration trees from TOML files.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rgbled::tree::loader::load_tree;
//! use std::path::Path;
//!
//! let tree = load_tree(Path::new("config/board.toml"))?;
//! ```

use figment::{
    providers::{Format, Toml},
    Figment,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::ConfigNode;

/// Error types for tree loading.
#[derive(Debug, thiserror::Error)]
pub enum TreeLoadError {
    /// File not found
    #[error("Tree file not found: {0}")]
    NotFound(String),

    /// Parse error (invalid TOML or unknown fields)
    #[error("Failed to parse tree: {0}")]
    ParseError(String),

    /// Structural error (duplicate sibling names, empty names)
    #[error("Tree validation failed: {0}")]
    ValidationError(String),
}

/// Load a configuration tree from a TOML file.
pub fn load_tree(path: &Path) -> Result<ConfigNode, TreeLoadError> {
    if !path.exists() {
        return Err(TreeLoadError::NotFound(path.display().to_string()));
    }

    debug!("Loading configuration tree from: {}", path.display());

    let tree: ConfigNode = Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| TreeLoadError::ParseError(format!("{}: {}", path.display(), e)))?;

    validate_tree(&tree)?;

    info!(
        "Loaded configuration tree '{}' ({} nodes)",
        tree.name,
        tree.descendants().count()
    );

    Ok(tree)
}

/// Load a configuration tree from a TOML string.
///
/// Useful for testing or embedded board descriptions.
pub fn load_tree_from_str(toml_content: &str) -> Result<ConfigNode, TreeLoadError> {
    let tree: ConfigNode =
        toml::from_str(toml_content).map_err(|e| TreeLoadError::ParseError(e.to_string()))?;

    validate_tree(&tree)?;
    Ok(tree)
}

/// Check structural rules: non-empty names, unique names among siblings.
pub fn validate_tree(tree: &ConfigNode) -> Result<(), TreeLoadError> {
    let mut errors = Vec::new();

    for (path, node) in tree.walk() {
        if node.name.trim().is_empty() {
            errors.push(format!("node with empty name at '{}'", path));
        }

        let mut seen = HashSet::new();
        for child in &node.children {
            if !seen.insert(child.name.as_str()) {
                errors.push(format!(
                    "duplicate child '{}' under '{}'",
                    child.name, path
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TreeLoadError::ValidationError(errors.join("\n")))
    }
}
