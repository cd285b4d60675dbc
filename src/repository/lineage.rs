//! Lineage manager
//!
//! A strain carries at most one inbound parent edge; its source is the
//! parent stock, its target the child. Three transitions exist for a
//! create/edit supplying a parent: first assignment inserts the edge,
//! re-assignment moves the existing edge's source in place, and an absent
//! parent field leaves any edge untouched. The parent-existence check and
//! the edge mutation are separate statements; the unique index on the
//! child column turns a concurrent duplicate insert into a fast failure.

use crate::repository::{RepoError, RepoResult};
use crate::storage::CollectionConfig;
use rusqlite::{named_params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

/// Check whether a stock document exists at all (any kind).
pub(crate) fn stock_exists(
    conn: &Connection,
    cfg: &CollectionConfig,
    id: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!("SELECT 1 FROM {} WHERE stock_id = :id", cfg.stock),
        named_params! { ":id": id },
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

/// Resolve the inbound parent edge of a strain, returning the edge key and
/// the parent stock identifier.
pub(crate) fn parent_edge(
    conn: &Connection,
    cfg: &CollectionConfig,
    child: &str,
) -> rusqlite::Result<Option<(String, String)>> {
    conn.query_row(
        &format!(
            "SELECT key, from_id FROM {} WHERE to_id = :child",
            cfg.parent_edge
        ),
        named_params! { ":child": child },
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Point `child` at `parent`, inserting or re-targeting the single lineage
/// edge as needed. The caller has already decided that a parent was
/// supplied; the no-parent case never reaches here.
pub(crate) fn apply_parent(
    conn: &Connection,
    cfg: &CollectionConfig,
    child: &str,
    parent: &str,
) -> RepoResult<()> {
    if !stock_exists(conn, cfg, parent).map_err(|e| RepoError::Query {
        operation: "lineage",
        id: parent.to_string(),
        source: e,
    })? {
        return Err(RepoError::ParentNotFound(parent.to_string()));
    }

    match parent_edge(conn, cfg, child).map_err(|e| RepoError::Query {
        operation: "lineage",
        id: child.to_string(),
        source: e,
    })? {
        None => {
            let key = Uuid::new_v4().to_string();
            conn.execute(
                &format!(
                    "INSERT INTO {} (key, from_id, to_id) VALUES (:key, :parent, :child)",
                    cfg.parent_edge
                ),
                named_params! { ":key": key, ":parent": parent, ":child": child },
            )
            .map_err(|e| RepoError::Insert {
                operation: "lineage",
                id: child.to_string(),
                source: e,
            })?;
            debug!(child = %child, parent = %parent, "assigned parent strain");
        }
        Some((key, previous)) => {
            if previous == parent {
                return Ok(());
            }
            conn.execute(
                &format!(
                    "UPDATE {} SET from_id = :parent WHERE key = :key",
                    cfg.parent_edge
                ),
                named_params! { ":parent": parent, ":key": key },
            )
            .map_err(|e| RepoError::Update {
                operation: "lineage",
                id: child.to_string(),
                source: e,
            })?;
            debug!(
                child = %child,
                parent = %parent,
                previous = %previous,
                "re-assigned parent strain"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{bootstrap, Database};

    fn seeded_db() -> (Database, CollectionConfig) {
        let db = Database::open_in_memory().unwrap();
        let cfg = CollectionConfig::default();
        bootstrap(&db, &cfg).unwrap();
        {
            let conn = db.lock();
            for id in ["DBS01", "DBS02", "DBS03"] {
                conn.execute(
                    "INSERT INTO stock (stock_id, created_at, updated_at, created_by, updated_by)
                     VALUES (?1, 1, 1, 'c', 'c')",
                    [id],
                )
                .unwrap();
            }
        }
        (db, cfg)
    }

    fn edge_rows(db: &Database) -> Vec<(String, String)> {
        let conn = db.lock();
        let mut stmt = conn
            .prepare("SELECT from_id, to_id FROM parent_strain")
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn first_assignment_inserts_edge() {
        let (db, cfg) = seeded_db();
        apply_parent(&db.lock(), &cfg, "DBS02", "DBS01").unwrap();
        assert_eq!(
            edge_rows(&db),
            vec![("DBS01".to_string(), "DBS02".to_string())]
        );
    }

    #[test]
    fn reassignment_moves_existing_edge() {
        let (db, cfg) = seeded_db();
        let conn = db.lock();
        apply_parent(&conn, &cfg, "DBS02", "DBS01").unwrap();
        let key_before: String = conn
            .query_row("SELECT key FROM parent_strain", [], |row| row.get(0))
            .unwrap();

        apply_parent(&conn, &cfg, "DBS02", "DBS03").unwrap();
        drop(conn);

        // Same edge, updated source; never a second row
        assert_eq!(
            edge_rows(&db),
            vec![("DBS03".to_string(), "DBS02".to_string())]
        );
        let conn = db.lock();
        let key_after: String = conn
            .query_row("SELECT key FROM parent_strain", [], |row| row.get(0))
            .unwrap();
        assert_eq!(key_before, key_after);
    }

    #[test]
    fn missing_parent_is_a_distinct_error() {
        let (db, cfg) = seeded_db();
        let err = apply_parent(&db.lock(), &cfg, "DBS02", "DBS099").unwrap_err();
        assert!(matches!(err, RepoError::ParentNotFound(id) if id == "DBS099"));
        assert!(edge_rows(&db).is_empty());
    }

    #[test]
    fn same_parent_is_a_no_op() {
        let (db, cfg) = seeded_db();
        let conn = db.lock();
        apply_parent(&conn, &cfg, "DBS02", "DBS01").unwrap();
        apply_parent(&conn, &cfg, "DBS02", "DBS01").unwrap();
        drop(conn);
        assert_eq!(edge_rows(&db).len(), 1);
    }
}
