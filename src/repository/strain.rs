//! Strain operations

use crate::model::{NewStrain, StockId, StockKind, StockProperties, StockRecord, StrainProperties, StrainUpdate};
use crate::repository::bind::{self, as_params, BindValue};
use crate::repository::query::{self, ListShape};
use crate::repository::{lineage, page, ListPage, ListParams, RepoError, RepoResult, StockRepository, StockRow};
use chrono::Utc;
use rusqlite::OptionalExtension;
use tracing::debug;
use uuid::Uuid;

/// Strain-specific columns of the merged row, following the shared core
/// columns; `parent` comes from the lineage-edge LEFT JOIN.
struct StrainColumns {
    systematic_name: Option<String>,
    label: Option<String>,
    species: Option<String>,
    plasmid: Option<String>,
    names_json: Option<String>,
    term: Option<String>,
    parent: Option<String>,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StockRow, StrainColumns)> {
    let core = StockRow::from_row(row)?;
    let extra = StrainColumns {
        systematic_name: row.get(11)?,
        label: row.get(12)?,
        species: row.get(13)?,
        plasmid: row.get(14)?,
        names_json: row.get(15)?,
        term: row.get(16)?,
        parent: row.get(17)?,
    };
    Ok((core, extra))
}

fn into_record((core, extra): (StockRow, StrainColumns)) -> RepoResult<StockRecord> {
    let names = match extra.names_json.as_deref() {
        Some(json) if !json.is_empty() => serde_json::from_str(json)?,
        _ => Vec::new(),
    };
    let properties = StockProperties::Strain(StrainProperties {
        systematic_name: extra.systematic_name.unwrap_or_default(),
        label: extra.label.unwrap_or_default(),
        species: extra.species.unwrap_or_default(),
        plasmid: extra.plasmid.filter(|s| !s.is_empty()),
        parent: extra.parent.map(StockId::new),
        names,
        term: extra.term.filter(|s| !s.is_empty()),
    });
    core.into_record(properties)
}

fn supplied_parent(parent: &Option<String>) -> Option<&str> {
    parent.as_deref().filter(|p| !p.is_empty())
}

impl StockRepository {
    /// Point lookup; absence is `Ok(None)`, never an error.
    pub fn get_strain(&self, id: &StockId) -> RepoResult<Option<StockRecord>> {
        let conn = self.db().lock();
        let row = conn
            .query_row(
                &query::get_query(StockKind::Strain, self.config()),
                rusqlite::named_params! { ":id": id.as_str() },
                map_row,
            )
            .optional()
            .map_err(|e| RepoError::Query {
                operation: "get_strain",
                id: id.to_string(),
                source: e,
            })?;
        row.map(into_record).transpose()
    }

    /// Insert a new strain. The key generator mints the identity; the
    /// record, its properties document, and the type edge go in as one
    /// transaction. A supplied parent is verified up front and its lineage
    /// edge written as a separate statement afterwards.
    pub fn add_strain(&self, attrs: &NewStrain) -> RepoResult<StockRecord> {
        let now_ms = Utc::now().timestamp_millis();
        self.insert_strain(None, attrs, now_ms, now_ms)
    }

    /// Insert a strain with caller-supplied identity and timestamps, for
    /// migrating pre-existing records.
    pub fn load_strain(&self, id: &StockId, attrs: &NewStrain) -> RepoResult<StockRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let created_ms = attrs
            .created_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(now_ms);
        let updated_ms = attrs
            .updated_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(created_ms);
        self.insert_strain(Some(id.as_str()), attrs, created_ms, updated_ms)
    }

    fn insert_strain(
        &self,
        id: Option<&str>,
        attrs: &NewStrain,
        created_ms: i64,
        updated_ms: i64,
    ) -> RepoResult<StockRecord> {
        let op = "add_strain";
        let cfg = self.config();
        let mut conn = self.db().lock();

        // Verify the parent before creating anything
        if let Some(parent) = supplied_parent(&attrs.parent) {
            let found = lineage::stock_exists(&conn, cfg, parent).map_err(|e| RepoError::Query {
                operation: op,
                id: parent.to_string(),
                source: e,
            })?;
            if !found {
                return Err(RepoError::ParentNotFound(parent.to_string()));
            }
        }

        let insert_err = |id: String| {
            move |e| RepoError::Insert {
                operation: op,
                id,
                source: e,
            }
        };

        let tx = conn
            .transaction()
            .map_err(insert_err(StockKind::Strain.as_str().to_string()))?;
        let stock_id = match id {
            Some(id) => id.to_string(),
            None => Self::next_stock_id(&tx, cfg, StockKind::Strain)
                .map_err(insert_err(StockKind::Strain.as_str().to_string()))?,
        };
        let prop_key = Uuid::new_v4().to_string();
        let binds = bind::strain_insert_binds(&stock_id, &prop_key, attrs, created_ms, updated_ms)?;

        tx.execute(
            &format!(
                "INSERT INTO {stock} (stock_id, created_at, updated_at, created_by, updated_by, \
                         summary, editable_summary, depositor, genes_json, dbxrefs_json, publications_json) \
                 VALUES (:stock_id, :created_at, :updated_at, :created_by, :updated_by, \
                         :summary, :editable_summary, :depositor, :genes_json, :dbxrefs_json, :publications_json)",
                stock = cfg.stock,
            ),
            as_params(&binds.stock).as_slice(),
        )
        .map_err(insert_err(stock_id.clone()))?;
        tx.execute(
            &format!(
                "INSERT INTO {prop} (key, systematic_name, label, species, plasmid, names_json, term) \
                 VALUES (:key, :systematic_name, :label, :species, :plasmid, :names_json, :term)",
                prop = cfg.stockprop,
            ),
            as_params(&binds.prop).as_slice(),
        )
        .map_err(insert_err(stock_id.clone()))?;
        Self::insert_type_edge(&tx, cfg, &stock_id, &prop_key, StockKind::Strain)
            .map_err(insert_err(stock_id.clone()))?;
        tx.commit().map_err(insert_err(stock_id.clone()))?;

        // Lineage edge is a separate statement outside the insert unit
        if let Some(parent) = supplied_parent(&attrs.parent) {
            lineage::apply_parent(&conn, cfg, &stock_id, parent)?;
        }
        drop(conn);

        debug!(id = %stock_id, "added strain");
        let id = StockId::new(stock_id);
        self.get_strain(&id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Partial update: only caller-supplied fields change; the rest of the
    /// record and its properties document stay untouched. Supplying a
    /// parent drives the lineage state machine; omitting it leaves any
    /// existing lineage edge alone. The parent is verified before any
    /// write, so a failed edit applies nothing.
    pub fn edit_strain(&self, id: &StockId, update: &StrainUpdate) -> RepoResult<StockRecord> {
        let op = "edit_strain";
        let cfg = self.config();
        let now_ms = Utc::now().timestamp_millis();
        let mut conn = self.db().lock();

        // Step one: the id must resolve to a properties key for this kind.
        // Absence here is a not-found condition, not a statement failure.
        let prop_key = Self::resolve_propkey(&conn, cfg, id.as_str(), StockKind::Strain)
            .map_err(|e| RepoError::Query {
                operation: op,
                id: id.to_string(),
                source: e,
            })?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        // A supplied parent must exist before anything is written; failing
        // after the record update would leave the edit half-applied
        if let Some(parent) = supplied_parent(&update.parent) {
            let found = lineage::stock_exists(&conn, cfg, parent).map_err(|e| RepoError::Query {
                operation: op,
                id: parent.to_string(),
                source: e,
            })?;
            if !found {
                return Err(RepoError::ParentNotFound(parent.to_string()));
            }
        }

        let binds = bind::strain_update_binds(update, now_ms)?;
        let update_err = |e| RepoError::Update {
            operation: op,
            id: id.to_string(),
            source: e,
        };

        // Step two: both documents in one transactional unit
        let tx = conn.transaction().map_err(update_err)?;
        let mut stock_values = binds.stock_values.clone();
        stock_values.push((":id".to_string(), BindValue::Text(id.to_string())));
        tx.execute(
            &format!(
                "UPDATE {stock} SET {sets} WHERE stock_id = :id",
                stock = cfg.stock,
                sets = binds.stock_sets.join(", "),
            ),
            as_params(&stock_values).as_slice(),
        )
        .map_err(update_err)?;
        if binds.has_prop_changes() {
            let mut prop_values = binds.prop_values.clone();
            prop_values.push((":key".to_string(), BindValue::Text(prop_key.clone())));
            tx.execute(
                &format!(
                    "UPDATE {prop} SET {sets} WHERE key = :key",
                    prop = cfg.stockprop,
                    sets = binds.prop_sets.join(", "),
                ),
                as_params(&prop_values).as_slice(),
            )
            .map_err(update_err)?;
        }
        tx.commit().map_err(update_err)?;

        if let Some(parent) = supplied_parent(&update.parent) {
            lineage::apply_parent(&conn, cfg, id.as_str(), parent)?;
        }
        drop(conn);

        debug!(id = %id, "edited strain");
        self.get_strain(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Cursor-paginated listing, newest first. See the pagination engine
    /// for the lookahead and boundary-duplication rules.
    pub fn list_strains(&self, params: &ListParams) -> RepoResult<ListPage> {
        self.list_stocks(StockKind::Strain, params, "list_strains", map_row, into_record)
    }

    /// Bulk point lookup; ids with no strain record are simply absent from
    /// the result.
    pub fn list_strains_by_ids(&self, ids: &[StockId]) -> RepoResult<Vec<StockRecord>> {
        self.list_stocks_by_ids(StockKind::Strain, ids, "list_strains_by_ids", map_row, into_record)
    }

    /// Shared list implementation for both kinds.
    pub(crate) fn list_stocks<C, M, F>(
        &self,
        kind: StockKind,
        params: &ListParams,
        op: &'static str,
        map: M,
        finish: F,
    ) -> RepoResult<ListPage>
    where
        M: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<C>,
        F: Fn(C) -> RepoResult<StockRecord>,
    {
        let cfg = self.config();
        let compiled = params
            .filter
            .as_ref()
            .map(|f| query::compile_filter(f, kind))
            .transpose()?;
        let shape = ListShape::for_request(
            params.cursor.is_some(),
            compiled.as_ref().map(|c| c.sql.as_str()),
        );

        let sql = query::list_query(kind, cfg, shape);
        let mut values = vec![(":limit".to_string(), BindValue::Int(params.limit + 1))];
        if let Some(cursor) = params.cursor {
            values.push((":cursor".to_string(), BindValue::Int(cursor)));
        }
        if let Some(compiled) = &compiled {
            values.extend(compiled.binds.iter().cloned());
        }

        let query_err = |e| RepoError::Query {
            operation: op,
            id: kind.as_str().to_string(),
            source: e,
        };
        let conn = self.db().lock();
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;
        let rows = stmt
            .query_map(as_params(&values).as_slice(), map)
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        drop(stmt);
        drop(conn);

        let records = rows.into_iter().map(finish).collect::<RepoResult<Vec<_>>>()?;
        Ok(page::paginate(records, params.limit))
    }

    pub(crate) fn list_stocks_by_ids<C, M, F>(
        &self,
        kind: StockKind,
        ids: &[StockId],
        op: &'static str,
        map: M,
        finish: F,
    ) -> RepoResult<Vec<StockRecord>>
    where
        M: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<C>,
        F: Fn(C) -> RepoResult<StockRecord>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query_err = |e| RepoError::Query {
            operation: op,
            id: kind.as_str().to_string(),
            source: e,
        };
        let sql = query::ids_query(kind, self.config(), ids.len());
        let conn = self.db().lock();
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(ids.iter().map(|id| id.as_str())),
                map,
            )
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        drop(stmt);
        drop(conn);

        rows.into_iter().map(finish).collect()
    }
}
