//! SQLite-backed node store.
//!
//! Records live in memory in a [`NodeArena`] and are written through to a
//! single `nodes` table whenever the session is saved, a node is checked
//! in, or a category is created. Each write is one SQLite transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use rulevault_core::error::{StoreError, StoreResult};
use rulevault_core::store::NodeArena;
use rulevault_core::traits::{NodeStore, NodeStoreConfig};
use rulevault_core::types::{NodeId, NodeKind, NodeRecord, Property, Value};

/// Node store persisted in a SQLite database.
///
/// Several workspaces can share one database file; each store only sees
/// the records of its own workspace.
pub struct SqliteNodeStore {
    conn: Mutex<Connection>,
    arena: Mutex<NodeArena>,
    workspace: String,
}

impl SqliteNodeStore {
    /// Open (or create) the database at `path`.
    pub fn new(path: impl AsRef<Path>, workspace: impl Into<String>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::backend(format!("creating {}", parent.display()), e)
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::backend(format!("opening {}", path.display()), e))?;
        Self::with_connection(conn, workspace.into())
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::backend("opening in-memory database", e))?;
        Self::with_connection(conn, "default".to_string())
    }

    pub fn from_config(config: &NodeStoreConfig) -> StoreResult<Self> {
        Self::new(config.resolved_path(), config.workspace.clone())
    }

    fn with_connection(conn: Connection, workspace: String) -> StoreResult<Self> {
        init_schema(&conn)?;
        let records = load_records(&conn, &workspace)?;
        info!(workspace = %workspace, nodes = records.len(), "opened sqlite node store");
        Ok(Self {
            conn: Mutex::new(conn),
            arena: Mutex::new(NodeArena::from_records(records)),
            workspace,
        })
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// Number of nodes held, version records and snapshots included.
    pub fn node_count(&self) -> StoreResult<usize> {
        Ok(self.arena()?.len())
    }

    fn arena(&self) -> StoreResult<MutexGuard<'_, NodeArena>> {
        self.arena
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn persist(&self, records: &[&NodeRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::backend("beginning transaction", e))?;
        let now = Utc::now().to_rfc3339();
        for record in records {
            let json = serde_json::to_string(record)?;
            tx.execute(
                r#"
                INSERT INTO nodes (id, workspace, kind, name, record, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    name = excluded.name,
                    record = excluded.record,
                    updated_at = excluded.updated_at
                "#,
                params![
                    record.id.to_string(),
                    self.workspace,
                    record.kind.as_str(),
                    record.name,
                    json,
                    now,
                ],
            )
            .map_err(|e| StoreError::backend(format!("writing node {}", record.id), e))?;
        }
        tx.commit()
            .map_err(|e| StoreError::backend("committing transaction", e))?;
        debug!(count = records.len(), "persisted node records");
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            record TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_workspace ON nodes(workspace);
        CREATE INDEX IF NOT EXISTS idx_nodes_kind_name ON nodes(workspace, kind, name);
        "#,
    )
    .map_err(|e| StoreError::backend("initializing schema", e))
}

fn load_records(conn: &Connection, workspace: &str) -> StoreResult<Vec<NodeRecord>> {
    let mut stmt = conn
        .prepare("SELECT record FROM nodes WHERE workspace = ?1")
        .map_err(|e| StoreError::backend("loading nodes", e))?;
    let rows = stmt
        .query_map(params![workspace], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError::backend("loading nodes", e))?;

    let mut records = Vec::new();
    for row in rows {
        let json = row.map_err(|e| StoreError::backend("loading nodes", e))?;
        records.push(serde_json::from_str(&json)?);
    }
    Ok(records)
}

impl NodeStore for SqliteNodeStore {
    fn supports_versioning(&self) -> bool {
        true
    }

    /// Category nodes are shared by every item and persisted immediately,
    /// without the session's other pending writes.
    fn create_node(&self, kind: NodeKind, name: &str) -> StoreResult<NodeId> {
        let mut arena = self.arena()?;
        if kind != NodeKind::Category {
            return arena.create_node(kind, name);
        }
        let record = NodeRecord::new(NodeKind::Category, name);
        self.persist(&[&record])?;
        let id = arena.insert_persisted(record);
        debug!(node = %id, name, "created category node");
        Ok(id)
    }

    fn contains(&self, id: NodeId) -> StoreResult<bool> {
        Ok(self.arena()?.contains(id))
    }

    fn node_kind(&self, id: NodeId) -> StoreResult<NodeKind> {
        Ok(self.arena()?.record(id)?.kind)
    }

    fn node_name(&self, id: NodeId) -> StoreResult<String> {
        Ok(self.arena()?.record(id)?.name.clone())
    }

    fn property(&self, id: NodeId, name: &str) -> StoreResult<Property> {
        self.arena()?.property(id, name)
    }

    fn has_property(&self, id: NodeId, name: &str) -> StoreResult<bool> {
        self.arena()?.has_property(id, name)
    }

    fn set_property(&self, id: NodeId, name: &str, value: Property) -> StoreResult<()> {
        self.arena()?.set_property(id, name, value)
    }

    fn frozen_node(&self, version: NodeId) -> StoreResult<NodeId> {
        self.arena()?.frozen_node(version)
    }

    fn checkout(&self, id: NodeId) -> StoreResult<()> {
        self.arena()?.checkout(id)
    }

    /// Stages the touched records and commits them to the arena only once
    /// they are on disk.
    fn checkin(&self, id: NodeId, stamp: BTreeMap<String, Property>) -> StoreResult<NodeId> {
        let mut arena = self.arena()?;
        let staged = arena.stage_checkin(id, stamp)?;
        self.persist(&staged.records())?;
        let touched: Vec<NodeId> = staged.records().iter().map(|r| r.id).collect();
        let version = arena.commit_checkin(staged);
        arena.mark_clean(touched);
        Ok(version)
    }

    fn is_checked_out(&self, id: NodeId) -> StoreResult<bool> {
        self.arena()?.is_checked_out(id)
    }

    fn base_version(&self, id: NodeId) -> StoreResult<NodeId> {
        self.arena()?.base_version(id)
    }

    fn predecessors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.arena()?.predecessors(id)
    }

    fn successors(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        self.arena()?.successors(id)
    }

    fn create_reference(&self, target: NodeId) -> StoreResult<Value> {
        self.arena()?.create_reference(target)
    }

    fn find_category(&self, name: &str) -> StoreResult<Option<NodeId>> {
        Ok(self.arena()?.find_category(name))
    }

    fn save(&self) -> StoreResult<()> {
        let mut arena = self.arena()?;
        self.persist(&arena.dirty_records())?;
        arena.mark_saved();
        arena.mark_persisted();
        Ok(())
    }
}
