//! Index store: persistent home of derived nodes
//!
//! The store owns similarity search elsewhere in the system; the sync
//! engine only needs insert-by-id, delete-by-id, reload, and a single
//! versioned node listing for bootstrap.

use crate::node::Node;
use crate::SyncError;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const SCHEMA_VERSION: i32 = 1;
pub const STORE_FILE: &str = "index.db";

/// One row of the store's exported node listing: where each node came
/// from. This is the only shape bootstrap ever parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    pub id: String,
    pub path: String,
}

/// Persistent store of derived nodes
pub trait IndexStore {
    /// Whether a persisted form exists on disk
    fn exists(&self) -> bool;

    /// Load the persisted form. Failure is non-fatal to the caller and
    /// forces a full rebuild.
    fn reload(&mut self) -> crate::Result<()>;

    /// Create a fresh, empty store (replacing any persisted content)
    fn reset(&mut self) -> crate::Result<()>;

    fn insert(&mut self, nodes: &[Node]) -> crate::Result<()>;

    fn delete(&mut self, node_ids: &[String]) -> crate::Result<()>;

    /// Versioned export of every node's id and canonical path
    fn node_locations(&self) -> crate::Result<Vec<NodeLocation>>;

    /// Capture the on-disk snapshot at the end of a build
    fn persist(&mut self) -> crate::Result<()>;
}

/// SQLite-backed node store
pub struct SqliteStore {
    db_path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteStore {
    pub fn new(persist_dir: &Path) -> Self {
        Self {
            db_path: persist_dir.join(STORE_FILE),
            conn: None,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> crate::Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        Ok(conn)
    }

    fn conn(&self) -> crate::Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| SyncError::StoreReload("store not loaded".to_string()))
    }

    fn conn_mut(&mut self) -> crate::Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| SyncError::StoreReload("store not loaded".to_string()))
    }
}

impl IndexStore for SqliteStore {
    fn exists(&self) -> bool {
        self.db_path.exists()
    }

    fn reload(&mut self) -> crate::Result<()> {
        if !self.db_path.exists() {
            return Err(SyncError::StoreReload(format!(
                "no persisted store at {}",
                self.db_path.display()
            )));
        }

        let conn = self.open()?;
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version != SCHEMA_VERSION {
            return Err(SyncError::StoreReload(format!(
                "schema is v{version}, expected v{SCHEMA_VERSION}"
            )));
        }

        self.conn = Some(conn);
        Ok(())
    }

    fn reset(&mut self) -> crate::Result<()> {
        // Start from a clean file so a corrupt or wrong-version store
        // cannot survive a full rebuild
        self.conn = None;
        if self.db_path.exists() {
            std::fs::remove_file(&self.db_path)?;
        }
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.db_path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(sidecar));
        }

        let conn = self.open()?;
        conn.execute_batch(
            "
            CREATE TABLE nodes (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                ext TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                text TEXT NOT NULL
            );
            CREATE INDEX idx_nodes_path ON nodes(path);
            PRAGMA user_version = 1;
            ",
        )?;
        self.conn = Some(conn);
        Ok(())
    }

    // One item's batch commits as a unit: a failure partway rolls the
    // whole batch back, so an item that errors leaves zero rows behind
    fn insert(&mut self, nodes: &[Node]) -> crate::Result<()> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO nodes (id, path, ext, start_line, end_line, text)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            for node in nodes {
                stmt.execute(params![
                    node.id,
                    node.path,
                    node.ext,
                    node.start_line as i64,
                    node.end_line as i64,
                    node.text,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, node_ids: &[String]) -> crate::Result<()> {
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM nodes WHERE id = ?")?;
            for id in node_ids {
                stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn node_locations(&self) -> crate::Result<Vec<NodeLocation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, path FROM nodes ORDER BY path, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(NodeLocation {
                id: row.get(0)?,
                path: row.get(1)?,
            })
        })?;

        let mut locations = Vec::new();
        for row in rows {
            locations.push(row?);
        }
        Ok(locations)
    }

    fn persist(&mut self) -> crate::Result<()> {
        if let Some(conn) = &self.conn {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node(id: &str, path: &str, text: &str) -> Node {
        Node {
            id: id.to_string(),
            path: path.to_string(),
            ext: ".py".to_string(),
            text: text.to_string(),
            start_line: 1,
            end_line: 1,
        }
    }

    #[test]
    fn test_reset_insert_delete_locations() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::new(dir.path());
        assert!(!store.exists());

        store.reset().unwrap();
        store
            .insert(&[node("n1", "a.py", "x"), node("n2", "a.py", "y"), node("n3", "b.py", "z")])
            .unwrap();
        store.persist().unwrap();
        assert!(store.exists());

        let locations = store.node_locations().unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].path, "a.py");

        store.delete(&["n1".to_string(), "n2".to_string()]).unwrap();
        let locations = store.node_locations().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].id, "n3");
    }

    #[test]
    fn test_reload_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = SqliteStore::new(dir.path());
            store.reset().unwrap();
            store.insert(&[node("n1", "a.py", "x")]).unwrap();
            store.persist().unwrap();
        }

        let mut store = SqliteStore::new(dir.path());
        store.reload().unwrap();
        assert_eq!(store.node_locations().unwrap().len(), 1);
    }

    #[test]
    fn test_reload_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::new(dir.path());
        assert!(matches!(store.reload(), Err(SyncError::StoreReload(_))));
    }

    #[test]
    fn test_reload_wrong_schema_fails() {
        let dir = TempDir::new().unwrap();
        {
            let conn = Connection::open(dir.path().join(STORE_FILE)).unwrap();
            conn.execute_batch("PRAGMA user_version = 42;").unwrap();
        }
        let mut store = SqliteStore::new(dir.path());
        assert!(matches!(store.reload(), Err(SyncError::StoreReload(_))));
    }

    #[test]
    fn test_failed_insert_batch_leaves_no_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::new(dir.path());
        store.reset().unwrap();
        store.persist().unwrap();

        // Reject one id so the batch errors on its second row
        {
            let conn = Connection::open(dir.path().join(STORE_FILE)).unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON nodes
                 WHEN NEW.id = 'poison' BEGIN
                     SELECT RAISE(ABORT, 'rejected');
                 END;",
            )
            .unwrap();
        }

        let result = store.insert(&[node("n1", "a.py", "x"), node("poison", "a.py", "y")]);
        assert!(result.is_err());
        // The first row must not survive the failed batch
        assert!(store.node_locations().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_previous_content() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::new(dir.path());
        store.reset().unwrap();
        store.insert(&[node("n1", "a.py", "x")]).unwrap();

        store.reset().unwrap();
        assert!(store.node_locations().unwrap().is_empty());
    }
}
