//! Profile configuration for ragsync

use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default profile as TOML
pub const DEFAULT_PROFILE: &str = r#"# RagSync Profile

name = "default"

# Local corpus root. Required unless you index a checked-out snapshot
# of a remote ref (then set repo/ref as well and path to the checkout).
path = "."

# Remote repository identity, e.g. "nanograv/PINT". Optional; when set,
# the index is keyed to "repo:<repo>@<ref>" instead of the local path.
# repo = "owner/name"
ref = "master"

# Only these top-level directories are indexed (empty = all)
include = ["src", "docs", "examples", "tests"]

# Extension allowlist
ext = [".py", ".md", ".rst", ".txt"]

# Glob patterns excluded from indexing (matched against canonical paths)
exclude = ["**/__pycache__/**", "**/conftest.py"]

# Directory for persisted artifacts (tracker, sidecar, manifest, store)
persist = ".ragsync"

# Line-window chunking
chunk_lines = 80
chunk_overlap = 20

# Files above this size are skipped entirely
max_file_size_kb = 1024
"#;

/// RagSync profile: one indexed corpus, one persist directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_name")]
    pub name: String,
    /// Local corpus root (or the checkout directory of a remote ref)
    #[serde(default)]
    pub path: Option<String>,
    /// Remote repository, e.g. "owner/name"
    #[serde(default)]
    pub repo: Option<String>,
    /// Remote ref (branch or tag) the snapshot was taken from
    #[serde(rename = "ref", default = "default_ref")]
    pub gitref: String,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_ext")]
    pub ext: Vec<String>,
    /// Glob patterns matched against canonical paths; matches are skipped
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_persist")]
    pub persist: String,
    #[serde(default = "default_chunk_lines")]
    pub chunk_lines: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: usize,
}

// Default value functions
fn default_name() -> String {
    "default".to_string()
}
fn default_ref() -> String {
    "master".to_string()
}
fn default_include() -> Vec<String> {
    vec![
        "src".to_string(),
        "docs".to_string(),
        "examples".to_string(),
        "tests".to_string(),
    ]
}
fn default_ext() -> Vec<String> {
    vec![
        ".py".to_string(),
        ".md".to_string(),
        ".rst".to_string(),
        ".txt".to_string(),
    ]
}
fn default_persist() -> String {
    ".ragsync".to_string()
}
fn default_chunk_lines() -> usize {
    80
}
fn default_chunk_overlap() -> usize {
    20
}
fn default_max_file_size_kb() -> usize {
    1024
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: default_name(),
            path: None,
            repo: None,
            gitref: default_ref(),
            include: default_include(),
            ext: default_ext(),
            exclude: Vec::new(),
            persist: default_persist(),
            chunk_lines: default_chunk_lines(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size_kb: default_max_file_size_kb(),
        }
    }
}

impl Profile {
    /// Load a profile from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a profile from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::ConfigParse(e.to_string()))
    }

    /// Directory holding all persisted artifacts for this profile
    pub fn persist_dir(&self) -> PathBuf {
        PathBuf::from(&self.persist)
    }

    /// The displayed source: repo when set, otherwise the local path
    pub fn source_label(&self) -> String {
        self.repo
            .clone()
            .or_else(|| self.path.clone())
            .unwrap_or_default()
    }

    /// Size ceiling in bytes; larger items are never indexed
    pub fn max_file_bytes(&self) -> usize {
        self.max_file_size_kb * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_parses() {
        let profile = Profile::from_toml(DEFAULT_PROFILE).unwrap();
        assert_eq!(profile.name, "default");
        assert_eq!(profile.gitref, "master");
        assert_eq!(profile.chunk_lines, 80);
        assert_eq!(profile.chunk_overlap, 20);
        assert_eq!(profile.max_file_size_kb, 1024);
        assert_eq!(profile.path.as_deref(), Some("."));
        assert!(profile.repo.is_none());
        assert_eq!(profile.exclude.len(), 2);
    }

    #[test]
    fn test_minimal_profile_fills_defaults() {
        let profile = Profile::from_toml("path = \"/tmp/corpus\"").unwrap();
        assert_eq!(profile.path.as_deref(), Some("/tmp/corpus"));
        assert_eq!(profile.persist, ".ragsync");
        assert_eq!(profile.ext, vec![".py", ".md", ".rst", ".txt"]);
    }

    #[test]
    fn test_ref_field_rename() {
        let profile = Profile::from_toml("ref = \"main\"").unwrap();
        assert_eq!(profile.gitref, "main");
    }

    #[test]
    fn test_invalid_toml_is_config_parse_error() {
        let err = Profile::from_toml("chunk_lines = \"not a number\"").unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse(_)));
    }
}
