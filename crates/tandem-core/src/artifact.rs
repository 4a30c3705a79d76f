//! The canonical artifact tree exchanged with the serializer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GitSyncError, Result};

/// A deterministic file-tree representation of a resource's state.
///
/// Keys are `/`-separated paths relative to the worktree root, values are
/// UTF-8 documents. Iteration order is the lexical order of the paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactTree {
    files: BTreeMap<String, String>,
}

impl ArtifactTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document, validating its path.
    ///
    /// ```
    /// use tandem_core::ArtifactTree;
    ///
    /// let mut tree = ArtifactTree::new();
    /// tree.insert("pages/home.json", "{}").unwrap();
    /// assert!(tree.insert("../escape.json", "{}").is_err());
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let path = path.into();
        validate_path(&path)?;
        self.files.insert(path, content.into());
        Ok(())
    }

    /// Builder-style insert.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        self.insert(path, content)?;
        Ok(self)
    }

    /// Returns the document at `path`.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Iterates over `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Returns the paths of all documents.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Returns true if `path` is part of the tree.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the tree has no documents.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Checks that `path` is a safe relative path inside a worktree.
pub fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| GitSyncError::invalid_parameter(format!("artifact path '{}' {}", path, reason));

    if path.is_empty() {
        return Err(invalid("is empty"));
    }
    if path.starts_with('/') || path.contains('\\') || path.contains(':') {
        return Err(invalid("must be relative"));
    }

    for segment in path.split('/') {
        match segment {
            "" => return Err(invalid("contains an empty segment")),
            "." | ".." => return Err(invalid("must not navigate directories")),
            ".git" => return Err(invalid("must not touch version control internals")),
            _ => {},
        }
    }

    Ok(())
}
