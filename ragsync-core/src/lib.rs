//! RagSync Core - incremental corpus-to-index synchronization
//!
//! This library keeps a derived, searchable index in lockstep with a
//! source corpus: content-addressed change detection, a persisted
//! path-to-nodes tracker, and a build orchestrator that applies only
//! the deltas between runs.

pub mod build;
pub mod config;
pub mod corpus;
pub mod diff;
pub mod error;
pub mod manifest;
pub mod node;
pub mod store;
pub mod symbols;
pub mod tracker;

pub use build::{BuildMode, BuildReport, Builder, ItemFailure, ItemStage};
pub use config::Profile;
pub use corpus::{loader_for_profile, CorpusLoader, LocalLoader, RepoSnapshotLoader, SourceItem};
pub use diff::{diff_files, DiffReport};
pub use error::SyncError;
pub use manifest::{Counts, Manifest};
pub use node::{LineSplitter, Node, Splitter};
pub use store::{IndexStore, NodeLocation, SqliteStore};
pub use symbols::{extract_symbols, SymbolRow, SymbolSidecar};
pub use tracker::{fingerprint, FileEntry, Tracker, TrackerState};

/// Result type alias for ragsync operations
pub type Result<T> = std::result::Result<T, SyncError>;
