//! Error types for ragsync operations

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No source configured: profile needs a local 'path' (optionally tagged with 'repo'/'ref' for snapshot identity)")]
    NoSource,

    #[error("Corpus root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Profile already exists at {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("Glob pattern error: {0}")]
    GlobPattern(String),

    #[error("Store reload failed: {0}")]
    StoreReload(String),

    #[error("Split error in {path}: {message}")]
    Split { path: String, message: String },

    #[error("Manifest not found at {}. Run 'ragsync build' first.", .0.display())]
    ManifestMissing(PathBuf),
}
