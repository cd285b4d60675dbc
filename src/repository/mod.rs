//! Stock record repository
//!
//! The public contract of the data-access layer: per-kind get/add/load/
//! edit/list operations plus stock removal, combining the query composer,
//! bind-parameter builder, pagination engine, and lineage manager over one
//! bootstrapped database. Each operation is synchronous and self-contained;
//! the repository keeps no mutable state of its own between calls.

pub(crate) mod bind;
mod error;
pub(crate) mod lineage;
mod page;
mod plasmid;
pub(crate) mod query;
mod strain;

pub use error::{RepoError, RepoResult};
pub use page::{cursor_from, ListPage, ListParams, DEFAULT_PAGE_SIZE};
pub use query::{FilterExpr, FilterOp, ListFilter, ListShape};

use crate::model::{StockId, StockKind, StockProperties, StockRecord};
use crate::storage::{bootstrap, CollectionConfig, Database};
use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Repository over the stock database.
///
/// Opening a repository runs the idempotent schema bootstrap; a bootstrap
/// failure is fatal and the repository is never handed out.
pub struct StockRepository {
    db: Database,
    cfg: CollectionConfig,
}

impl StockRepository {
    /// Open or create a repository at the given database path.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_config(path, CollectionConfig::default())
    }

    /// Open with explicit collection names (e.g. to point the term graph at
    /// a collaborator-owned ontology collection).
    pub fn open_with_config(path: impl AsRef<Path>, cfg: CollectionConfig) -> RepoResult<Self> {
        let db = Database::open(path)?;
        bootstrap(&db, &cfg)?;
        info!("stock repository ready");
        Ok(Self { db, cfg })
    }

    /// In-memory repository (useful for testing)
    pub fn open_in_memory() -> RepoResult<Self> {
        let db = Database::open_in_memory()?;
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg)?;
        Ok(Self { db, cfg })
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.cfg
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Mint the next sequential identifier for the given kind.
    ///
    /// The counter row is created on first use; the upsert+RETURNING form
    /// increments atomically, so concurrent inserts never share a suffix.
    pub(crate) fn next_stock_id(
        conn: &Connection,
        cfg: &CollectionConfig,
        kind: StockKind,
    ) -> rusqlite::Result<String> {
        let value: i64 = conn.query_row(
            &format!(
                "INSERT INTO {keygen} (name, value) VALUES (:name, 1)
                 ON CONFLICT(name) DO UPDATE SET value = value + 1
                 RETURNING value",
                keygen = cfg.key_generator,
            ),
            named_params! { ":name": kind.as_str() },
            |row| row.get(0),
        )?;
        Ok(format!("{}{}", kind.id_prefix(), value))
    }

    /// Resolve a stock identifier to its properties-document key through the
    /// type edge. `None` means the identifier is absent for that kind.
    pub(crate) fn resolve_propkey(
        conn: &Connection,
        cfg: &CollectionConfig,
        id: &str,
        kind: StockKind,
    ) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            &query::propkey_query(cfg),
            named_params! { ":id": id, ":kind": kind.as_str() },
            |row| row.get(0),
        )
        .optional()
    }

    /// Insert the typed stock→properties edge.
    pub(crate) fn insert_type_edge(
        conn: &Connection,
        cfg: &CollectionConfig,
        stock_id: &str,
        prop_key: &str,
        kind: StockKind,
    ) -> rusqlite::Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {edge} (key, from_id, to_id, type)
                 VALUES (:key, :from_id, :to_id, :type)",
                edge = cfg.stock_type_edge,
            ),
            named_params! {
                ":key": Uuid::new_v4().to_string(),
                ":from_id": stock_id,
                ":to_id": prop_key,
                ":type": kind.as_str(),
            },
        )?;
        Ok(())
    }

    /// Delete a stock of either kind: the record, its properties document,
    /// and every incident edge, after an existence check. Absence is
    /// reported as `NotFound`, and nothing is mutated in that case.
    pub fn remove_stock(&self, id: &StockId) -> RepoResult<()> {
        let op = "remove_stock";
        let mut conn = self.db.lock();

        let exists = lineage::stock_exists(&conn, &self.cfg, id.as_str()).map_err(|e| {
            RepoError::Query {
                operation: op,
                id: id.to_string(),
                source: e,
            }
        })?;
        if !exists {
            return Err(RepoError::NotFound(id.to_string()));
        }

        let delete_err = |e| RepoError::Delete {
            operation: op,
            id: id.to_string(),
            source: e,
        };
        let tx = conn.transaction().map_err(delete_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {prop} WHERE key IN
                     (SELECT to_id FROM {edge} WHERE from_id = :id)",
                prop = self.cfg.stockprop,
                edge = self.cfg.stock_type_edge,
            ),
            named_params! { ":id": id.as_str() },
        )
        .map_err(delete_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {edge} WHERE from_id = :id",
                edge = self.cfg.stock_type_edge
            ),
            named_params! { ":id": id.as_str() },
        )
        .map_err(delete_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {edge} WHERE from_id = :id OR to_id = :id",
                edge = self.cfg.parent_edge
            ),
            named_params! { ":id": id.as_str() },
        )
        .map_err(delete_err)?;
        tx.execute(
            &format!(
                "DELETE FROM {edge} WHERE from_id = :id",
                edge = self.cfg.term_edge
            ),
            named_params! { ":id": id.as_str() },
        )
        .map_err(delete_err)?;
        tx.execute(
            &format!("DELETE FROM {stock} WHERE stock_id = :id", stock = self.cfg.stock),
            named_params! { ":id": id.as_str() },
        )
        .map_err(delete_err)?;
        tx.commit().map_err(delete_err)?;

        tracing::debug!(id = %id, "removed stock");
        Ok(())
    }
}

/// Core-record columns shared by every merged row shape, in the order the
/// query composer selects them.
pub(crate) struct StockRow {
    pub stock_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: String,
    pub updated_by: String,
    pub summary: String,
    pub editable_summary: String,
    pub depositor: String,
    pub genes_json: String,
    pub dbxrefs_json: String,
    pub publications_json: String,
}

impl StockRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            stock_id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
            created_by: row.get(3)?,
            updated_by: row.get(4)?,
            summary: row.get(5)?,
            editable_summary: row.get(6)?,
            depositor: row.get(7)?,
            genes_json: row.get(8)?,
            dbxrefs_json: row.get(9)?,
            publications_json: row.get(10)?,
        })
    }

    pub(crate) fn into_record(self, properties: StockProperties) -> RepoResult<StockRecord> {
        Ok(StockRecord {
            stock_id: StockId::new(self.stock_id),
            created_at: millis_to_datetime(self.created_at)?,
            updated_at: millis_to_datetime(self.updated_at)?,
            created_by: self.created_by,
            updated_by: self.updated_by,
            summary: self.summary,
            editable_summary: self.editable_summary,
            depositor: self.depositor,
            genes: serde_json::from_str(&self.genes_json)?,
            dbxrefs: serde_json::from_str(&self.dbxrefs_json)?,
            publications: serde_json::from_str(&self.publications_json)?,
            properties,
        })
    }
}

pub(crate) fn millis_to_datetime(ms: i64) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(RepoError::Timestamp(ms))
}
