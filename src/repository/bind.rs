//! Bind-parameter builder
//!
//! Converts caller-supplied attribute sets into named-parameter maps for the
//! query composer. "New" sets come back complete: every column present, list
//! fields normalized to explicit empty JSON arrays, optional scalars to empty
//! strings. "Update" sets come back sparse and split in two, since core-record
//! fields and properties-document fields live in different collections. Each
//! half carries only the non-empty inputs, so an update statement touches
//! exactly what the caller mentioned. `updated_by`/`updated_at` are always
//! present.

use crate::model::{NewPlasmid, NewStrain, PlasmidUpdate, StrainUpdate};
use crate::repository::RepoResult;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;

/// A value bound to a named query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i64),
}

impl ToSql for BindValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            BindValue::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            BindValue::Int(i) => Ok(ToSqlOutput::Owned(Value::Integer(*i))),
        }
    }
}

/// Named parameters for one statement. Keys carry the `:` prefix expected
/// by the driver.
pub type NamedBinds = Vec<(String, BindValue)>;

/// Borrowed view usable directly as statement parameters.
pub fn as_params(binds: &NamedBinds) -> Vec<(&str, &dyn ToSql)> {
    binds
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn text(name: &str, value: impl Into<String>) -> (String, BindValue) {
    (format!(":{name}"), BindValue::Text(value.into()))
}

fn int(name: &str, value: i64) -> (String, BindValue) {
    (format!(":{name}"), BindValue::Int(value))
}

fn json_list(values: &[String]) -> RepoResult<String> {
    Ok(serde_json::to_string(values)?)
}

/// Complete parameter maps for inserting one record and its properties
/// document.
#[derive(Debug)]
pub struct InsertBinds {
    pub stock: NamedBinds,
    pub prop: NamedBinds,
}

/// Sparse SET lists and parameter maps for a partial update.
#[derive(Debug, Default)]
pub struct UpdateBinds {
    /// `column = :column` fragments for the core record
    pub stock_sets: Vec<String>,
    pub stock_values: NamedBinds,
    /// `column = :column` fragments for the properties document
    pub prop_sets: Vec<String>,
    pub prop_values: NamedBinds,
}

impl UpdateBinds {
    /// True when the update touches the properties document at all
    pub fn has_prop_changes(&self) -> bool {
        !self.prop_sets.is_empty()
    }

    fn set_stock(&mut self, column: &str, value: impl Into<String>) {
        self.stock_sets.push(format!("{column} = :{column}"));
        self.stock_values.push(text(column, value));
    }

    fn set_prop(&mut self, column: &str, value: impl Into<String>) {
        self.prop_sets.push(format!("{column} = :{column}"));
        self.prop_values.push(text(column, value));
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn present_list(value: &Option<Vec<String>>) -> Option<&[String]> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn stock_insert_binds(
    stock_id: &str,
    created_by: &str,
    updated_by: &str,
    summary: &str,
    editable_summary: &str,
    depositor: &str,
    genes: &[String],
    dbxrefs: &[String],
    publications: &[String],
    created_at_ms: i64,
    updated_at_ms: i64,
) -> RepoResult<NamedBinds> {
    Ok(vec![
        text("stock_id", stock_id),
        int("created_at", created_at_ms),
        int("updated_at", updated_at_ms),
        text("created_by", created_by),
        text("updated_by", updated_by),
        text("summary", summary),
        text("editable_summary", editable_summary),
        text("depositor", depositor),
        text("genes_json", json_list(genes)?),
        text("dbxrefs_json", json_list(dbxrefs)?),
        text("publications_json", json_list(publications)?),
    ])
}

/// Build the full insert maps for a strain.
pub fn strain_insert_binds(
    stock_id: &str,
    prop_key: &str,
    attrs: &NewStrain,
    created_at_ms: i64,
    updated_at_ms: i64,
) -> RepoResult<InsertBinds> {
    let stock = stock_insert_binds(
        stock_id,
        &attrs.created_by,
        &attrs.updated_by,
        &attrs.summary,
        &attrs.editable_summary,
        &attrs.depositor,
        &attrs.genes,
        &attrs.dbxrefs,
        &attrs.publications,
        created_at_ms,
        updated_at_ms,
    )?;
    let prop = vec![
        text("key", prop_key),
        text("systematic_name", &attrs.systematic_name),
        text("label", &attrs.label),
        text("species", &attrs.species),
        text("plasmid", attrs.plasmid.clone().unwrap_or_default()),
        text("names_json", json_list(&attrs.names)?),
        text("term", attrs.term.clone().unwrap_or_default()),
    ];
    Ok(InsertBinds { stock, prop })
}

/// Build the full insert maps for a plasmid.
pub fn plasmid_insert_binds(
    stock_id: &str,
    prop_key: &str,
    attrs: &NewPlasmid,
    created_at_ms: i64,
    updated_at_ms: i64,
) -> RepoResult<InsertBinds> {
    let stock = stock_insert_binds(
        stock_id,
        &attrs.created_by,
        &attrs.updated_by,
        &attrs.summary,
        &attrs.editable_summary,
        &attrs.depositor,
        &attrs.genes,
        &attrs.dbxrefs,
        &attrs.publications,
        created_at_ms,
        updated_at_ms,
    )?;
    let prop = vec![
        text("key", prop_key),
        text("image_map", &attrs.image_map),
        text("sequence", &attrs.sequence),
        text("name", &attrs.name),
    ];
    Ok(InsertBinds { stock, prop })
}

fn shared_update_binds(
    binds: &mut UpdateBinds,
    updated_by: &str,
    updated_at_ms: i64,
    summary: &Option<String>,
    editable_summary: &Option<String>,
    depositor: &Option<String>,
    genes: &Option<Vec<String>>,
    dbxrefs: &Option<Vec<String>>,
    publications: &Option<Vec<String>>,
) -> RepoResult<()> {
    // Always stamped, even for otherwise-empty updates
    binds.set_stock("updated_by", updated_by);
    binds.stock_sets.push("updated_at = :updated_at".to_string());
    binds.stock_values.push(int("updated_at", updated_at_ms));

    if let Some(v) = present(summary) {
        binds.set_stock("summary", v);
    }
    if let Some(v) = present(editable_summary) {
        binds.set_stock("editable_summary", v);
    }
    if let Some(v) = present(depositor) {
        binds.set_stock("depositor", v);
    }
    if let Some(v) = present_list(genes) {
        binds.set_stock("genes_json", json_list(v)?);
    }
    if let Some(v) = present_list(dbxrefs) {
        binds.set_stock("dbxrefs_json", json_list(v)?);
    }
    if let Some(v) = present_list(publications) {
        binds.set_stock("publications_json", json_list(v)?);
    }
    Ok(())
}

/// Build the sparse update maps for a strain edit.
///
/// The `parent` field is deliberately absent here: lineage lives on an edge,
/// not the properties document, and is handled by the lineage manager.
pub fn strain_update_binds(update: &StrainUpdate, updated_at_ms: i64) -> RepoResult<UpdateBinds> {
    let mut binds = UpdateBinds::default();
    shared_update_binds(
        &mut binds,
        &update.updated_by,
        updated_at_ms,
        &update.summary,
        &update.editable_summary,
        &update.depositor,
        &update.genes,
        &update.dbxrefs,
        &update.publications,
    )?;

    if let Some(v) = present(&update.systematic_name) {
        binds.set_prop("systematic_name", v);
    }
    if let Some(v) = present(&update.label) {
        binds.set_prop("label", v);
    }
    if let Some(v) = present(&update.species) {
        binds.set_prop("species", v);
    }
    if let Some(v) = present(&update.plasmid) {
        binds.set_prop("plasmid", v);
    }
    if let Some(v) = present_list(&update.names) {
        binds.prop_sets.push("names_json = :names_json".to_string());
        binds.prop_values.push(text("names_json", json_list(v)?));
    }
    if let Some(v) = present(&update.term) {
        binds.set_prop("term", v);
    }
    Ok(binds)
}

/// Build the sparse update maps for a plasmid edit.
pub fn plasmid_update_binds(update: &PlasmidUpdate, updated_at_ms: i64) -> RepoResult<UpdateBinds> {
    let mut binds = UpdateBinds::default();
    shared_update_binds(
        &mut binds,
        &update.updated_by,
        updated_at_ms,
        &update.summary,
        &update.editable_summary,
        &update.depositor,
        &update.genes,
        &update.dbxrefs,
        &update.publications,
    )?;

    if let Some(v) = present(&update.image_map) {
        binds.set_prop("image_map", v);
    }
    if let Some(v) = present(&update.sequence) {
        binds.set_prop("sequence", v);
    }
    if let Some(v) = present(&update.name) {
        binds.set_prop("name", v);
    }
    Ok(binds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strain_binds_are_complete_and_normalized() {
        let attrs = NewStrain {
            created_by: "curator@dictybase.org".to_string(),
            updated_by: "curator@dictybase.org".to_string(),
            systematic_name: "AX4-1".to_string(),
            label: "AX4".to_string(),
            species: "Dictyostelium discoideum".to_string(),
            ..Default::default()
        };
        let binds = strain_insert_binds("DBS01", "prop-1", &attrs, 1000, 1000).unwrap();

        // Every stock column is present even though most inputs were empty
        assert_eq!(binds.stock.len(), 11);
        let genes = binds
            .stock
            .iter()
            .find(|(name, _)| name == ":genes_json")
            .unwrap();
        assert_eq!(genes.1, BindValue::Text("[]".to_string()));
        let summary = binds
            .stock
            .iter()
            .find(|(name, _)| name == ":summary")
            .unwrap();
        assert_eq!(summary.1, BindValue::Text(String::new()));

        // Optional scalars normalize to empty strings on the prop side
        let plasmid = binds
            .prop
            .iter()
            .find(|(name, _)| name == ":plasmid")
            .unwrap();
        assert_eq!(plasmid.1, BindValue::Text(String::new()));
    }

    #[test]
    fn update_binds_contain_only_supplied_fields() {
        let update = StrainUpdate::new("editor@dictybase.org")
            .with_summary("revised summary")
            .with_species("Dictyostelium purpureum");
        let binds = strain_update_binds(&update, 2000).unwrap();

        assert_eq!(
            binds.stock_sets,
            vec![
                "updated_by = :updated_by".to_string(),
                "updated_at = :updated_at".to_string(),
                "summary = :summary".to_string(),
            ]
        );
        assert_eq!(binds.prop_sets, vec!["species = :species".to_string()]);
        assert!(binds.has_prop_changes());
    }

    #[test]
    fn empty_update_still_stamps_updater_identity() {
        let update = PlasmidUpdate::new("editor@dictybase.org");
        let binds = plasmid_update_binds(&update, 3000).unwrap();

        assert_eq!(binds.stock_sets.len(), 2);
        assert!(binds.stock_sets.contains(&"updated_by = :updated_by".to_string()));
        assert!(binds.stock_sets.contains(&"updated_at = :updated_at".to_string()));
        assert!(!binds.has_prop_changes());
    }

    #[test]
    fn empty_string_counts_as_unset() {
        let mut update = StrainUpdate::new("editor@dictybase.org");
        update.label = Some(String::new());
        update.genes = Some(Vec::new());
        let binds = strain_update_binds(&update, 4000).unwrap();

        assert!(!binds.has_prop_changes());
        assert!(!binds
            .stock_sets
            .iter()
            .any(|s| s.starts_with("genes_json")));
    }
}
