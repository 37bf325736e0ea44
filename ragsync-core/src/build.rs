//! Build orchestrator: decides between no-op, incremental update and
//! full rebuild, and keeps all persisted artifacts consistent

use crate::config::Profile;
use crate::corpus::{CorpusLoader, SourceItem};
use crate::diff::{diff_files, DiffReport};
use crate::manifest::Manifest;
use crate::node::Splitter;
use crate::store::{IndexStore, NodeLocation};
use crate::symbols::{extract_symbols, SymbolRow, SymbolSidecar};
use crate::tracker::{fingerprint, FileEntry, Tracker, TrackerState, TRACKER_VERSION};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How the run touched the index store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// No corpus changes; zero store calls issued
    Noop,
    /// Store recreated from the complete current corpus
    FullRebuild,
    /// Targeted delete + insert for changed paths only
    Incremental,
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::FullRebuild => "full-rebuild",
            Self::Incremental => "incremental",
        }
    }
}

/// Which per-item operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Split,
    Insert,
    Delete,
}

/// One localized, non-fatal failure. The run continues; the affected
/// path may be left without node_ids.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub path: String,
    pub stage: ItemStage,
    pub message: String,
}

impl ItemFailure {
    fn new(path: &str, stage: ItemStage, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_string(),
            stage,
            message: error.to_string(),
        }
    }
}

/// Summary of one build invocation
#[derive(Debug)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub bootstrapped: bool,
    pub diff: DiffReport,
    pub manifest: Manifest,
    pub failures: Vec<ItemFailure>,
}

/// Sequences one build: corpus → fingerprints → tracker → diff →
/// {noop | bootstrap | full rebuild | incremental} → persist
pub struct Builder<'a> {
    profile: &'a Profile,
    loader: &'a dyn CorpusLoader,
    splitter: &'a dyn Splitter,
    store: &'a mut dyn IndexStore,
}

impl<'a> Builder<'a> {
    pub fn new(
        profile: &'a Profile,
        loader: &'a dyn CorpusLoader,
        splitter: &'a dyn Splitter,
        store: &'a mut dyn IndexStore,
    ) -> Self {
        Self {
            profile,
            loader,
            splitter,
            store,
        }
    }

    pub fn run(&mut self) -> crate::Result<BuildReport> {
        let persist_dir = self.profile.persist_dir();
        std::fs::create_dir_all(&persist_dir)?;

        // LOAD_CORPUS: current items and their content fingerprints.
        // Oversized items are skipped outright, never recorded.
        let mut items = self.loader.list()?;
        let ceiling = self.profile.max_file_bytes();
        items.retain(|item| {
            if item.text.len() > ceiling {
                debug!(path = %item.path, bytes = item.text.len(), "skipping oversized item");
                false
            } else {
                true
            }
        });

        let current: BTreeMap<String, String> = items
            .iter()
            .map(|i| (i.path.clone(), fingerprint(&i.text)))
            .collect();
        let by_path: BTreeMap<&str, &SourceItem> =
            items.iter().map(|i| (i.path.as_str(), i)).collect();

        // LOAD_TRACKER
        let tracker = Tracker::new(&persist_dir);
        let sidecar = SymbolSidecar::new(&persist_dir);
        let mut previous = tracker.load();
        let identity = self.loader.identity();

        // BOOTSTRAP: store on disk but tracker empty — reconstruct the
        // files map from the store's node listing. The store itself is
        // never touched here.
        let mut store_loaded = false;
        let mut bootstrapped = false;
        if previous.files.is_empty() && self.store.exists() {
            match self.store.reload() {
                Ok(()) => {
                    store_loaded = true;
                    match self.store.node_locations() {
                        Ok(locations) => {
                            previous.files = bootstrap_files(&locations, &current);
                            bootstrapped = true;
                            info!(
                                files = previous.files.len(),
                                "bootstrapped tracker from store contents"
                            );
                        }
                        Err(e) => warn!(error = %e, "store listing failed, skipping bootstrap"),
                    }
                }
                Err(e) => warn!(error = %e, "store reload failed, skipping bootstrap"),
            }
        }

        // DIFF and mode decision. A changed source identity is never an
        // ordinary incremental change: the old path-hash history is not
        // comparable, so the diff is bypassed entirely.
        let identity_changed =
            !previous.source_identity.is_empty() && previous.source_identity != identity;
        if identity_changed {
            info!(
                previous = %previous.source_identity,
                current = %identity,
                "source identity changed, forcing full rebuild"
            );
        }

        let (mode, diff, state, rows, failures) = if identity_changed || previous.files.is_empty()
        {
            let mut diff = DiffReport::default();
            diff.added = current.keys().cloned().collect();
            let (state, rows, failures) = self.full_rebuild(&items, &current, &identity)?;
            (BuildMode::FullRebuild, diff, state, rows, failures)
        } else {
            let diff = diff_files(&previous.files, &current);
            if diff.is_empty() {
                let (state, rows) = self.noop(&sidecar, previous, &current, &identity);
                (BuildMode::Noop, diff, state, rows, Vec::new())
            } else {
                let reloaded = store_loaded || match self.store.reload() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "store reload failed, forcing full rebuild");
                        false
                    }
                };
                if reloaded {
                    let (state, rows, failures) =
                        self.incremental(&sidecar, &previous, &by_path, &current, &diff, &identity);
                    (BuildMode::Incremental, diff, state, rows, failures)
                } else {
                    let (state, rows, failures) =
                        self.full_rebuild(&items, &current, &identity)?;
                    (BuildMode::FullRebuild, diff, state, rows, failures)
                }
            }
        };

        // PERSIST: tracker, sidecar, manifest. Counts are summed from
        // the new files map and sidecar rows, not in-memory counters.
        if mode != BuildMode::Noop {
            if let Err(e) = self.store.persist() {
                warn!(error = %e, "store persist failed; row changes are already durable");
            }
        }
        tracker.save(&state)?;
        sidecar.save(&rows)?;
        let manifest = Manifest::assemble(self.profile, &state, rows.len());
        manifest.write(&persist_dir)?;

        info!(
            mode = mode.as_str(),
            documents = manifest.counts.documents,
            nodes = manifest.counts.nodes,
            symbols = manifest.counts.symbols,
            failures = failures.len(),
            "build complete"
        );

        Ok(BuildReport {
            mode,
            bootstrapped,
            diff,
            manifest,
            failures,
        })
    }

    /// No corpus changes: restamp identity and back-fill any missing
    /// hashes, but issue no store calls.
    fn noop(
        &self,
        sidecar: &SymbolSidecar,
        previous: TrackerState,
        current: &BTreeMap<String, String>,
        identity: &str,
    ) -> (TrackerState, Vec<SymbolRow>) {
        let mut state = previous;
        state.version = TRACKER_VERSION;
        state.source_identity = identity.to_string();
        for (path, entry) in state.files.iter_mut() {
            if entry.hash.is_empty() {
                if let Some(hash) = current.get(path) {
                    entry.hash = hash.clone();
                }
            }
        }
        let rows = sidecar.load();
        (state, rows)
    }

    /// Recreate the store from the complete current corpus and rebuild
    /// the tracker and sidecar from scratch.
    fn full_rebuild(
        &mut self,
        items: &[SourceItem],
        current: &BTreeMap<String, String>,
        identity: &str,
    ) -> crate::Result<(TrackerState, Vec<SymbolRow>, Vec<ItemFailure>)> {
        self.store.reset()?;

        let mut files = BTreeMap::new();
        let mut rows = Vec::new();
        let mut failures = Vec::new();

        for item in items {
            let hash = current.get(&item.path).cloned().unwrap_or_default();
            match self.split_and_insert(item) {
                Ok(node_ids) => {
                    files.insert(item.path.clone(), FileEntry { hash, node_ids });
                }
                Err(failure) => {
                    warn_item(&failure);
                    files.insert(
                        item.path.clone(),
                        FileEntry {
                            hash,
                            node_ids: Vec::new(),
                        },
                    );
                    failures.push(failure);
                }
            }
            rows.extend(extract_symbols(&item.path, &item.ext, &item.text));
        }

        let state = TrackerState {
            version: TRACKER_VERSION,
            source_identity: identity.to_string(),
            files,
        };
        Ok((state, rows, failures))
    }

    /// Delete nodes of stale paths, insert nodes for fresh paths, copy
    /// unchanged entries forward, and patch the sidecar by subtraction
    /// and append.
    fn incremental(
        &mut self,
        sidecar: &SymbolSidecar,
        previous: &TrackerState,
        by_path: &BTreeMap<&str, &SourceItem>,
        current: &BTreeMap<String, String>,
        diff: &DiffReport,
        identity: &str,
    ) -> (TrackerState, Vec<SymbolRow>, Vec<ItemFailure>) {
        let mut failures = Vec::new();
        let stale = diff.stale();
        let fresh = diff.fresh();

        // Best-effort deletes. On failure the stale entry is still
        // dropped from the new tracker; the store may retain orphans
        // until the next full rebuild.
        for path in &stale {
            let Some(entry) = previous.files.get(path) else {
                continue;
            };
            if entry.node_ids.is_empty() {
                continue;
            }
            if let Err(e) = self.store.delete(&entry.node_ids) {
                let failure = ItemFailure::new(path, ItemStage::Delete, &e);
                warn!(
                    path = %path,
                    orphaned = entry.node_ids.len(),
                    error = %e,
                    "delete failed, store may retain orphaned nodes"
                );
                failures.push(failure);
            }
        }

        // Copy unchanged entries forward; removed paths are simply absent
        let mut files: BTreeMap<String, FileEntry> = BTreeMap::new();
        for path in &diff.unchanged {
            if let Some(entry) = previous.files.get(path) {
                files.insert(path.clone(), entry.clone());
            }
        }

        for path in &fresh {
            let Some(item) = by_path.get(path.as_str()) else {
                continue;
            };
            let hash = current.get(path).cloned().unwrap_or_default();
            match self.split_and_insert(item) {
                Ok(node_ids) => {
                    files.insert(path.clone(), FileEntry { hash, node_ids });
                }
                Err(failure) => {
                    warn_item(&failure);
                    files.insert(
                        path.clone(),
                        FileEntry {
                            hash,
                            node_ids: Vec::new(),
                        },
                    );
                    failures.push(failure);
                }
            }
        }

        // Sidecar sync: same classification as the store, so the two
        // derived stores never disagree about which paths are current
        let mut rows: Vec<SymbolRow> = sidecar
            .load()
            .into_iter()
            .filter(|row| !stale.contains(&row.path))
            .collect();
        for path in &fresh {
            if let Some(item) = by_path.get(path.as_str()) {
                rows.extend(extract_symbols(&item.path, &item.ext, &item.text));
            }
        }

        let state = TrackerState {
            version: TRACKER_VERSION,
            source_identity: identity.to_string(),
            files,
        };
        (state, rows, failures)
    }

    /// Split one item and insert its nodes. The splitter may drop
    /// custom metadata, so ownership is force-stamped here before the
    /// nodes reach the store.
    fn split_and_insert(
        &mut self,
        item: &SourceItem,
    ) -> std::result::Result<Vec<String>, ItemFailure> {
        let mut nodes = match self.splitter.split(item) {
            Ok(nodes) => nodes,
            Err(e) => return Err(ItemFailure::new(&item.path, ItemStage::Split, e)),
        };
        for node in &mut nodes {
            node.path = item.path.clone();
            node.ext = item.ext.clone();
        }
        if let Err(e) = self.store.insert(&nodes) {
            return Err(ItemFailure::new(&item.path, ItemStage::Insert, e));
        }
        Ok(nodes.into_iter().map(|n| n.id).collect())
    }
}

fn warn_item(failure: &ItemFailure) {
    warn!(
        path = %failure.path,
        stage = ?failure.stage,
        error = %failure.message,
        "item failed, continuing"
    );
}

/// Group the store's node listing by canonical path. Entries whose
/// current hash is unknown get the empty sentinel, so they classify as
/// modified on the next diff until re-confirmed.
pub fn bootstrap_files(
    locations: &[NodeLocation],
    current: &BTreeMap<String, String>,
) -> BTreeMap<String, FileEntry> {
    let mut files: BTreeMap<String, FileEntry> = BTreeMap::new();
    for location in locations {
        let entry = files.entry(location.path.clone()).or_insert_with(|| FileEntry {
            hash: current.get(&location.path).cloned().unwrap_or_default(),
            node_ids: Vec::new(),
        });
        entry.node_ids.push(location.id.clone());
    }
    files
}
