//! Build manifest: a point-in-time summary, derived and disposable

use crate::config::Profile;
use crate::tracker::TrackerState;
use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub documents: usize,
    pub nodes: usize,
    pub symbols: usize,
}

/// Summary of the last successful build. Rebuildable from the tracker
/// and sidecar at any time; never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub source: String,
    #[serde(rename = "ref")]
    pub gitref: String,
    pub commit_sha_hint: String,
    pub persist_dir: String,
    pub counts: Counts,
    pub created: String,
    pub profile: Profile,
}

impl Manifest {
    /// Assemble from persisted state. Counts come from the tracker's
    /// files map and the sidecar rows, never from in-memory counters.
    pub fn assemble(profile: &Profile, state: &TrackerState, symbol_rows: usize) -> Self {
        let created = now_rfc3339();
        Self {
            source: profile.source_label(),
            gitref: profile.gitref.clone(),
            commit_sha_hint: format!("{}@{}", profile.gitref, created),
            persist_dir: profile.persist.clone(),
            counts: Counts {
                documents: state.files.len(),
                nodes: state.node_count(),
                symbols: symbol_rows,
            },
            created,
            profile: profile.clone(),
        }
    }

    pub fn write(&self, persist_dir: &Path) -> crate::Result<()> {
        fs::create_dir_all(persist_dir)?;
        let path = persist_dir.join(MANIFEST_FILE);
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load(persist_dir: &Path) -> crate::Result<Self> {
        let path = persist_dir.join(MANIFEST_FILE);
        let content =
            fs::read_to_string(&path).map_err(|_| SyncError::ManifestMissing(path.clone()))?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
