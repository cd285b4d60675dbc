//! Plasmid operations

use crate::model::{NewPlasmid, PlasmidProperties, PlasmidUpdate, StockId, StockKind, StockProperties, StockRecord};
use crate::repository::bind::{self, as_params, BindValue};
use crate::repository::query;
use crate::repository::{ListPage, ListParams, RepoError, RepoResult, StockRepository, StockRow};
use chrono::Utc;
use rusqlite::OptionalExtension;
use tracing::debug;
use uuid::Uuid;

struct PlasmidColumns {
    image_map: Option<String>,
    sequence: Option<String>,
    name: Option<String>,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StockRow, PlasmidColumns)> {
    let core = StockRow::from_row(row)?;
    let extra = PlasmidColumns {
        image_map: row.get(11)?,
        sequence: row.get(12)?,
        name: row.get(13)?,
    };
    Ok((core, extra))
}

fn into_record((core, extra): (StockRow, PlasmidColumns)) -> RepoResult<StockRecord> {
    let properties = StockProperties::Plasmid(PlasmidProperties {
        image_map: extra.image_map.unwrap_or_default(),
        sequence: extra.sequence.unwrap_or_default(),
        name: extra.name.unwrap_or_default(),
    });
    core.into_record(properties)
}

impl StockRepository {
    /// Point lookup; absence is `Ok(None)`, never an error.
    pub fn get_plasmid(&self, id: &StockId) -> RepoResult<Option<StockRecord>> {
        let conn = self.db().lock();
        let row = conn
            .query_row(
                &query::get_query(StockKind::Plasmid, self.config()),
                rusqlite::named_params! { ":id": id.as_str() },
                map_row,
            )
            .optional()
            .map_err(|e| RepoError::Query {
                operation: "get_plasmid",
                id: id.to_string(),
                source: e,
            })?;
        row.map(into_record).transpose()
    }

    /// Insert a new plasmid: record, properties document, and type edge in
    /// one transaction, identity minted by the key generator.
    pub fn add_plasmid(&self, attrs: &NewPlasmid) -> RepoResult<StockRecord> {
        let now_ms = Utc::now().timestamp_millis();
        self.insert_plasmid(None, attrs, now_ms, now_ms)
    }

    /// Insert a plasmid with caller-supplied identity and timestamps, for
    /// migrating pre-existing records.
    pub fn load_plasmid(&self, id: &StockId, attrs: &NewPlasmid) -> RepoResult<StockRecord> {
        let now_ms = Utc::now().timestamp_millis();
        let created_ms = attrs
            .created_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(now_ms);
        let updated_ms = attrs
            .updated_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(created_ms);
        self.insert_plasmid(Some(id.as_str()), attrs, created_ms, updated_ms)
    }

    fn insert_plasmid(
        &self,
        id: Option<&str>,
        attrs: &NewPlasmid,
        created_ms: i64,
        updated_ms: i64,
    ) -> RepoResult<StockRecord> {
        let op = "add_plasmid";
        let cfg = self.config();
        let mut conn = self.db().lock();

        let insert_err = |id: String| {
            move |e| RepoError::Insert {
                operation: op,
                id,
                source: e,
            }
        };

        let tx = conn
            .transaction()
            .map_err(insert_err(StockKind::Plasmid.as_str().to_string()))?;
        let stock_id = match id {
            Some(id) => id.to_string(),
            None => Self::next_stock_id(&tx, cfg, StockKind::Plasmid)
                .map_err(insert_err(StockKind::Plasmid.as_str().to_string()))?,
        };
        let prop_key = Uuid::new_v4().to_string();
        let binds = bind::plasmid_insert_binds(&stock_id, &prop_key, attrs, created_ms, updated_ms)?;

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
                "INSERT INTO {prop} (key, image_map, sequence, name) \
                 VALUES (:key, :image_map, :sequence, :name)",
                prop = cfg.stockprop,
            ),
            as_params(&binds.prop).as_slice(),
        )
        .map_err(insert_err(stock_id.clone()))?;
        Self::insert_type_edge(&tx, cfg, &stock_id, &prop_key, StockKind::Plasmid)
            .map_err(insert_err(stock_id.clone()))?;
        tx.commit().map_err(insert_err(stock_id.clone()))?;
        drop(conn);

        debug!(id = %stock_id, "added plasmid");
        let id = StockId::new(stock_id);
        self.get_plasmid(&id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Partial update; only caller-supplied fields change.
    pub fn edit_plasmid(&self, id: &StockId, update: &PlasmidUpdate) -> RepoResult<StockRecord> {
        let op = "edit_plasmid";
        let cfg = self.config();
        let now_ms = Utc::now().timestamp_millis();
        let mut conn = self.db().lock();

        let prop_key = Self::resolve_propkey(&conn, cfg, id.as_str(), StockKind::Plasmid)
            .map_err(|e| RepoError::Query {
                operation: op,
                id: id.to_string(),
                source: e,
            })?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        let binds = bind::plasmid_update_binds(update, now_ms)?;
        let update_err = |e| RepoError::Update {
            operation: op,
            id: id.to_string(),
            source: e,
        };

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
        drop(conn);

        debug!(id = %id, "edited plasmid");
        self.get_plasmid(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Cursor-paginated listing, newest first.
    pub fn list_plasmids(&self, params: &ListParams) -> RepoResult<ListPage> {
        self.list_stocks(StockKind::Plasmid, params, "list_plasmids", map_row, into_record)
    }

    /// Bulk point lookup; missing ids are simply absent from the result.
    pub fn list_plasmids_by_ids(&self, ids: &[StockId]) -> RepoResult<Vec<StockRecord>> {
        self.list_stocks_by_ids(StockKind::Plasmid, ids, "list_plasmids_by_ids", map_row, into_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn repo() -> StockRepository {
        StockRepository::open_in_memory().unwrap()
    }

    fn new_plasmid(name: &str) -> NewPlasmid {
        NewPlasmid {
            created_by: "curator@dictybase.org".to_string(),
            updated_by: "curator@dictybase.org".to_string(),
            summary: format!("{name} summary"),
            name: name.to_string(),
            sequence: "ATGCATGC".to_string(),
            ..Default::default()
        }
    }

    fn plasmid_props(record: &StockRecord) -> &PlasmidProperties {
        record.properties.as_plasmid().expect("plasmid properties")
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    /// Seed `count` plasmids with strictly distinct creation times.
    fn seed(repo: &StockRepository, count: i64) -> Vec<StockId> {
        (0..count)
            .map(|i| {
                let mut attrs = new_plasmid(&format!("pDM{i}"));
                attrs.created_at = Some(at(1_700_000_000_000 + i * 1000));
                let id = StockId::new(format!("DBP0{:06}", i + 1));
                repo.load_plasmid(&id, &attrs).unwrap().stock_id
            })
            .collect()
    }

    #[test]
    fn added_plasmid_gets_prefixed_id_and_properties() {
        let repo = repo();
        let record = repo.add_plasmid(&new_plasmid("pDM304")).unwrap();
        assert!(record.stock_id.as_str().starts_with("DBP0"));
        assert_eq!(plasmid_props(&record).name, "pDM304");
        assert_eq!(plasmid_props(&record).sequence, "ATGCATGC");
    }

    #[test]
    fn kinds_do_not_leak_across_lookups() {
        let repo = repo();
        let plasmid = repo.add_plasmid(&new_plasmid("pDM304")).unwrap();
        // A plasmid id resolves only through plasmid lookups
        assert!(repo.get_strain(&plasmid.stock_id).unwrap().is_none());
        assert!(repo.get_plasmid(&plasmid.stock_id).unwrap().is_some());
    }

    #[test]
    fn load_honors_caller_identity_and_timestamps() {
        let repo = repo();
        let created = at(1_600_000_000_000);
        let mut attrs = new_plasmid("pLoaded");
        attrs.created_at = Some(created);
        attrs.updated_at = Some(created);

        let record = repo
            .load_plasmid(&StockId::new("DBP0000099"), &attrs)
            .unwrap();
        assert_eq!(record.stock_id.as_str(), "DBP0000099");
        assert_eq!(record.created_at, created);
        assert_eq!(record.updated_at, created);
    }

    #[test]
    fn partial_update_keeps_unmentioned_fields() {
        let repo = repo();
        let record = repo.add_plasmid(&new_plasmid("pDM304")).unwrap();

        let edited = repo
            .edit_plasmid(
                &record.stock_id,
                &PlasmidUpdate::new("editor@dictybase.org").with_name("pDM304-v2"),
            )
            .unwrap();
        assert_eq!(plasmid_props(&edited).name, "pDM304-v2");
        assert_eq!(plasmid_props(&edited).sequence, "ATGCATGC");
        assert_eq!(edited.summary, record.summary);
        assert_eq!(edited.created_at, record.created_at);
        assert_eq!(edited.updated_by, "editor@dictybase.org");
    }

    #[test]
    fn edit_missing_plasmid_is_not_found() {
        let repo = repo();
        let err = repo
            .edit_plasmid(
                &StockId::new("DBP0999999"),
                &PlasmidUpdate::new("editor@dictybase.org"),
            )
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[test]
    fn lookahead_page_carries_cursor_to_next_page() {
        let repo = repo();
        seed(&repo, 10);

        // 10 records, limit 4: page one is 4 + the lookahead row
        let page1 = repo.list_plasmids(&ListParams::new(4)).unwrap();
        assert_eq!(page1.records.len(), 5);
        let cursor = page1.next_cursor.expect("more pages");
        let boundary = page1.records.last().unwrap().stock_id.clone();
        assert_eq!(cursor, page1.records[4].created_at.timestamp_millis());

        // The boundary record heads the next page (inclusive cursor bound)
        let page2 = repo
            .list_plasmids(&ListParams::new(4).with_cursor(cursor))
            .unwrap();
        assert_eq!(page2.records[0].stock_id, boundary);
    }

    #[test]
    fn cursor_chain_visits_every_record_with_boundary_overlap() {
        let repo = repo();
        let seeded = seed(&repo, 10);
        let limit = 4;

        let mut seen: Vec<StockId> = Vec::new();
        let mut cursor = None;
        let mut boundaries = 0;
        loop {
            let mut params = ListParams::new(limit);
            if let Some(c) = cursor {
                params = params.with_cursor(c);
            }
            let page = repo.list_plasmids(&params).unwrap();
            let mut records = page.records;
            if !seen.is_empty() {
                // Head of each later page duplicates the previous boundary
                assert_eq!(records.first().map(|r| &r.stock_id), seen.last());
                records.remove(0);
                boundaries += 1;
            }
            seen.extend(records.into_iter().map(|r| r.stock_id));
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        assert_eq!(seen.len(), seeded.len());
        assert!(boundaries >= 2);
        for id in seeded {
            assert!(seen.contains(&id));
        }
    }

    #[test]
    fn listing_orders_newest_first() {
        let repo = repo();
        seed(&repo, 3);
        let page = repo.list_plasmids(&ListParams::new(10)).unwrap();
        let times: Vec<_> = page.records.iter().map(|r| r.created_at).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(times, sorted);
    }
}
