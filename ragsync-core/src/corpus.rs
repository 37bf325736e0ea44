//! Corpus loaders: local directory trees and checked-out remote snapshots

use crate::config::Profile;
use crate::SyncError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One corpus item, produced fresh on every run
#[derive(Debug, Clone)]
pub struct SourceItem {
    /// Canonical path: slash-normalized, relative to the corpus root
    pub path: String,
    pub text: String,
    /// File extension including the dot, e.g. ".py"
    pub ext: String,
}

/// Yields the current set of source items for one configured corpus
pub trait CorpusLoader {
    /// Stable identifier for the corpus origin, e.g. "local:/a" or
    /// "repo:owner/name@ref". An identity change between runs means the
    /// persisted tracker is not comparable and must be discarded.
    fn identity(&self) -> String;

    /// List all current items. Canonical paths are deterministic across
    /// repeated calls against the same source state.
    fn list(&self) -> crate::Result<Vec<SourceItem>>;
}

/// Loads a local directory tree, respecting .gitignore
#[derive(Debug)]
pub struct LocalLoader {
    root: PathBuf,
    include: Vec<String>,
    ext: Vec<String>,
    exclude: GlobSet,
}

impl LocalLoader {
    pub fn new(root: impl Into<PathBuf>, profile: &Profile) -> crate::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &profile.exclude {
            let glob = Glob::new(pattern).map_err(|e| SyncError::GlobPattern(e.to_string()))?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|e| SyncError::GlobPattern(e.to_string()))?;

        Ok(Self {
            root: root.into(),
            include: profile.include.clone(),
            ext: profile.ext.clone(),
            exclude,
        })
    }

    fn canonical_root(&self) -> String {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        normalize_slashes(&root.to_string_lossy())
    }

    /// Walk the root, applying include-dir and extension filters
    fn walk(&self) -> crate::Result<Vec<SourceItem>> {
        if !self.root.is_dir() {
            return Err(SyncError::RootNotFound(self.root.clone()));
        }

        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(true);
        builder.git_ignore(true);
        builder.git_global(true);
        builder.git_exclude(true);

        let mut items = Vec::new();

        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };

            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let canonical = normalize_slashes(&relative.to_string_lossy());

            if !self.dir_included(&canonical) {
                continue;
            }

            if self.exclude.is_match(&canonical) {
                continue;
            }

            let ext = extension_of(path);
            if !self.ext.is_empty() && !self.ext.contains(&ext) {
                continue;
            }

            // Binary or unreadable files are skipped, not indexed as errors
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %canonical, error = %e, "skipping unreadable file");
                    continue;
                }
            };

            items.push(SourceItem {
                path: canonical,
                text,
                ext,
            });
        }

        // Deterministic ordering across runs
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(items)
    }

    fn dir_included(&self, canonical: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }
        match canonical.split_once('/') {
            // Top-level files are always in scope
            None => true,
            Some((first, _)) => self.include.iter().any(|d| d == first),
        }
    }
}

impl CorpusLoader for LocalLoader {
    fn identity(&self) -> String {
        format!("local:{}", self.canonical_root())
    }

    fn list(&self) -> crate::Result<Vec<SourceItem>> {
        self.walk()
    }
}

/// Loads a locally checked-out snapshot of a remote ref.
///
/// Fetching is not this crate's concern; the snapshot directory is read
/// exactly like a local corpus, but the index is keyed to the remote
/// identity so switching refs forces a full rebuild.
pub struct RepoSnapshotLoader {
    inner: LocalLoader,
    repo: String,
    gitref: String,
}

impl RepoSnapshotLoader {
    pub fn new(
        checkout: impl Into<PathBuf>,
        repo: &str,
        gitref: &str,
        profile: &Profile,
    ) -> crate::Result<Self> {
        Ok(Self {
            inner: LocalLoader::new(checkout, profile)?,
            repo: repo.to_string(),
            gitref: gitref.to_string(),
        })
    }
}

impl CorpusLoader for RepoSnapshotLoader {
    fn identity(&self) -> String {
        format!("repo:{}@{}", self.repo, self.gitref)
    }

    fn list(&self) -> crate::Result<Vec<SourceItem>> {
        self.inner.list()
    }
}

/// Build the loader a profile describes, or fail when no source is set
pub fn loader_for_profile(profile: &Profile) -> crate::Result<Box<dyn CorpusLoader>> {
    match (&profile.path, &profile.repo) {
        (Some(path), Some(repo)) => Ok(Box::new(RepoSnapshotLoader::new(
            path,
            repo,
            &profile.gitref,
            profile,
        )?)),
        (Some(path), None) => Ok(Box::new(LocalLoader::new(path, profile)?)),
        (None, _) => Err(SyncError::NoSource),
    }
}

fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
