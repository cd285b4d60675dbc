//! Idempotent schema bootstrap
//!
//! Provisions every document collection, edge collection, named graph, and
//! index the repository needs, in fixed dependency order: documents first,
//! then edges, then graphs referencing both, then indexes. Every statement
//! is find-or-create (`IF NOT EXISTS` / `INSERT OR IGNORE`), so a second
//! run against the same database is a no-op. A failing step aborts with
//! [`RepoError::Bootstrap`] and leaves partial state in place; the next run
//! repeats the ensure logic safely.

use crate::repository::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Database;

/// Names of every collection, edge collection, and graph the repository
/// touches.
///
/// Defaults match the original deployment. The ontology term collection
/// (`term_collection`) is owned by a collaborator library and referenced
/// purely by name when the stock→term graph is registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Core stock document collection
    pub stock: String,
    /// Kind-specific properties document collection
    pub stockprop: String,
    /// Auto-incrementing key generator collection
    pub key_generator: String,
    /// Edge collection typing the stock→properties link
    pub stock_type_edge: String,
    /// Edge collection recording strain→parent lineage
    pub parent_edge: String,
    /// Edge collection linking stocks to ontology terms
    pub term_edge: String,
    /// Named graph over the stock→term edges
    pub term_graph: String,
    /// Collaborator-owned ontology term collection, referenced by name only
    pub term_collection: String,
    /// Named-graph registry collection
    pub graph_registry: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            stock: "stock".to_string(),
            stockprop: "stockprop".to_string(),
            key_generator: "stock_key_generator".to_string(),
            stock_type_edge: "stock_type".to_string(),
            parent_edge: "parent_strain".to_string(),
            term_edge: "stock_term".to_string(),
            term_graph: "stockterm_graph".to_string(),
            term_collection: "cvterm".to_string(),
            graph_registry: "graphs".to_string(),
        }
    }
}

/// Definition stored for a named graph: the edge collection plus the
/// document collections its endpoints may come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub edge_collection: String,
    pub from_collections: Vec<String>,
    pub to_collections: Vec<String>,
}

/// Run the full bootstrap sequence against the database.
pub fn bootstrap(db: &Database, cfg: &CollectionConfig) -> RepoResult<()> {
    let conn = db.lock();
    ensure_document_collections(&conn, cfg)?;
    ensure_edge_collections(&conn, cfg)?;
    ensure_graphs(&conn, cfg)?;
    ensure_indexes(&conn, cfg)?;
    info!(
        stock = %cfg.stock,
        stockprop = %cfg.stockprop,
        term_graph = %cfg.term_graph,
        "schema bootstrap complete"
    );
    Ok(())
}

fn step_err(step: &str) -> impl FnOnce(rusqlite::Error) -> RepoError + '_ {
    move |e| RepoError::Bootstrap {
        step: step.to_string(),
        source: e,
    }
}

fn ensure_document_collections(conn: &Connection, cfg: &CollectionConfig) -> RepoResult<()> {
    debug!("ensuring document collections");
    conn.execute_batch(&format!(
        r#"
        -- Core stock records; timestamps at millisecond resolution
        CREATE TABLE IF NOT EXISTS {stock} (
            stock_id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            created_by TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            editable_summary TEXT NOT NULL DEFAULT '',
            depositor TEXT NOT NULL DEFAULT '',
            genes_json TEXT NOT NULL DEFAULT '[]',
            dbxrefs_json TEXT NOT NULL DEFAULT '[]',
            publications_json TEXT NOT NULL DEFAULT '[]'
        );

        -- Kind-specific properties documents. Strain and plasmid fields
        -- share the collection; the populated set follows the type edge.
        CREATE TABLE IF NOT EXISTS {stockprop} (
            key TEXT PRIMARY KEY,
            systematic_name TEXT,
            label TEXT,
            species TEXT,
            plasmid TEXT,
            names_json TEXT,
            term TEXT,
            image_map TEXT,
            sequence TEXT,
            name TEXT
        );

        -- Monotonic counters backing the human-readable id sequence
        CREATE TABLE IF NOT EXISTS {keygen} (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        "#,
        stock = cfg.stock,
        stockprop = cfg.stockprop,
        keygen = cfg.key_generator,
    ))
    .map_err(step_err("document collections"))
}

fn ensure_edge_collections(conn: &Connection, cfg: &CollectionConfig) -> RepoResult<()> {
    debug!("ensuring edge collections");
    conn.execute_batch(&format!(
        r#"
        -- Typed stock→properties link; `type` is the kind discriminator
        CREATE TABLE IF NOT EXISTS {stock_type} (
            key TEXT PRIMARY KEY,
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            type TEXT NOT NULL
        );

        -- Strain lineage: from parent stock to child stock
        CREATE TABLE IF NOT EXISTS {parent} (
            key TEXT PRIMARY KEY,
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL
        );

        -- Stock→ontology-term annotations
        CREATE TABLE IF NOT EXISTS {term} (
            key TEXT PRIMARY KEY,
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL
        );
        "#,
        stock_type = cfg.stock_type_edge,
        parent = cfg.parent_edge,
        term = cfg.term_edge,
    ))
    .map_err(step_err("edge collections"))
}

fn ensure_graphs(conn: &Connection, cfg: &CollectionConfig) -> RepoResult<()> {
    debug!("ensuring named graphs");
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {registry} (
                name TEXT PRIMARY KEY,
                definition_json TEXT NOT NULL
            )",
            registry = cfg.graph_registry,
        ),
        [],
    )
    .map_err(step_err("graph registry"))?;

    let definition = GraphDefinition {
        edge_collection: cfg.term_edge.clone(),
        from_collections: vec![cfg.stock.clone()],
        to_collections: vec![cfg.term_collection.clone()],
    };
    let definition_json = serde_json::to_string(&definition)?;
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {registry} (name, definition_json) VALUES (?1, ?2)",
            registry = cfg.graph_registry,
        ),
        params![cfg.term_graph, definition_json],
    )
    .map_err(step_err("named graphs"))?;
    Ok(())
}

fn ensure_indexes(conn: &Connection, cfg: &CollectionConfig) -> RepoResult<()> {
    debug!("ensuring indexes");
    conn.execute_batch(&format!(
        r#"
        -- Point lookups resolve ids through this index
        CREATE UNIQUE INDEX IF NOT EXISTS idx_{stock}_stock_id
            ON {stock}(stock_id);

        -- Listings order by creation time descending
        CREATE INDEX IF NOT EXISTS idx_{stock}_created_at
            ON {stock}(created_at);

        CREATE INDEX IF NOT EXISTS idx_{stock_type}_from
            ON {stock_type}(from_id);

        -- A strain has at most one inbound parent edge; concurrent
        -- duplicate inserts fail here instead of racing silently.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_{parent}_child
            ON {parent}(to_id);

        CREATE INDEX IF NOT EXISTS idx_{term}_from
            ON {term}(from_id);
        "#,
        stock = cfg.stock,
        stock_type = cfg.stock_type_edge,
        parent = cfg.parent_edge,
        term = cfg.term_edge,
    ))
    .map_err(step_err("indexes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(db: &Database) -> Vec<String> {
        let conn = db.lock();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn bootstrap_creates_all_collections() {
        let db = Database::open_in_memory().unwrap();
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg).unwrap();

        let tables = table_names(&db);
        for expected in [
            "stock",
            "stockprop",
            "stock_key_generator",
            "stock_type",
            "parent_strain",
            "stock_term",
            "graphs",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg).unwrap();
        let first = table_names(&db);

        // Second run must not error or duplicate anything
        bootstrap(&db, &cfg).unwrap();
        assert_eq!(first, table_names(&db));

        let conn = db.lock();
        let graph_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM graphs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(graph_rows, 1);
    }

    #[test]
    fn term_graph_references_collaborator_collection() {
        let db = Database::open_in_memory().unwrap();
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg).unwrap();

        let conn = db.lock();
        let definition_json: String = conn
            .query_row(
                "SELECT definition_json FROM graphs WHERE name = ?1",
                params![cfg.term_graph],
                |row| row.get(0),
            )
            .unwrap();
        let definition: GraphDefinition = serde_json::from_str(&definition_json).unwrap();
        assert_eq!(definition.edge_collection, cfg.term_edge);
        assert_eq!(definition.to_collections, vec![cfg.term_collection.clone()]);
    }

    #[test]
    fn lineage_child_index_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg).unwrap();

        let conn = db.lock();
        conn.execute(
            "INSERT INTO parent_strain (key, from_id, to_id) VALUES ('e1', 'DBS01', 'DBS02')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO parent_strain (key, from_id, to_id) VALUES ('e2', 'DBS03', 'DBS02')",
            [],
        );
        assert!(dup.is_err());
    }
}
