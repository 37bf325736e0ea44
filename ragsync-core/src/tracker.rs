//! Fingerprint tracker: the durable record of what the index contains

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const TRACKER_VERSION: u32 = 1;
pub const TRACKER_FILE: &str = "tracker.json";

/// Hex SHA-256 content fingerprint of one item's text
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Per-file record: content hash plus the derived nodes it owns.
///
/// An empty hash is the sentinel for "unverified": it never equals a
/// real digest, so the path classifies as modified on the next diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub hash: String,
    pub node_ids: Vec<String>,
}

/// Complete persisted tracker state for one index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerState {
    pub version: u32,
    #[serde(default)]
    pub source_identity: String,
    #[serde(default)]
    pub files: BTreeMap<String, FileEntry>,
}

impl TrackerState {
    /// Empty, versioned, source-identity-less state
    pub fn empty() -> Self {
        Self {
            version: TRACKER_VERSION,
            source_identity: String::new(),
            files: BTreeMap::new(),
        }
    }

    /// Total nodes across all entries
    pub fn node_count(&self) -> usize {
        self.files.values().map(|e| e.node_ids.len()).sum()
    }
}

/// Loads and atomically replaces the persisted tracker file
pub struct Tracker {
    path: PathBuf,
}

impl Tracker {
    pub fn new(persist_dir: &Path) -> Self {
        Self {
            path: persist_dir.join(TRACKER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read persisted state. Missing, unparseable, or wrong-version
    /// files all degrade to the empty state; the caller decides whether
    /// that means bootstrap or full rebuild.
    pub fn load(&self) -> TrackerState {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return TrackerState::empty(),
        };

        match serde_json::from_str::<TrackerState>(&content) {
            Ok(state) if state.version == TRACKER_VERSION => state,
            Ok(state) => {
                warn!(
                    found = state.version,
                    expected = TRACKER_VERSION,
                    "tracker version mismatch, treating as empty"
                );
                TrackerState::empty()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt tracker, treating as empty");
                TrackerState::empty()
            }
        }
    }

    /// Replace the tracker wholesale. Writes to a temporary sibling and
    /// renames, so readers never observe a half-written file.
    pub fn save(&self, state: &TrackerState) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
