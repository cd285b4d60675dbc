//! Query composer
//!
//! Assembles the fixed family of traversal shapes the repository runs:
//! point get, list, and the cursor/filter list variants. Every list query is
//! one parameterized template per kind; the shape variants inject optional
//! predicate clauses instead of duplicating the template. Each query walks
//! one hop from the core collection over the type edge to the properties
//! document and merges the two into a single row; strain queries also walk
//! the lineage edge to resolve the parent identifier.

use crate::model::StockKind;
use crate::repository::bind::{BindValue, NamedBinds};
use crate::repository::{RepoError, RepoResult};
use crate::storage::CollectionConfig;

/// One of the closed family of list-query shapes, selected from which of
/// {cursor, filter} the caller supplied. The filtered shapes carry their
/// rendered predicate fragment, so a filter clause can never go missing at
/// composition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape<'a> {
    Plain,
    Cursored,
    Filtered(&'a str),
    FilteredCursored(&'a str),
}

impl<'a> ListShape<'a> {
    pub fn for_request(has_cursor: bool, filter_sql: Option<&'a str>) -> Self {
        match (has_cursor, filter_sql) {
            (false, None) => ListShape::Plain,
            (true, None) => ListShape::Cursored,
            (false, Some(fragment)) => ListShape::Filtered(fragment),
            (true, Some(fragment)) => ListShape::FilteredCursored(fragment),
        }
    }

    pub(crate) fn has_cursor(self) -> bool {
        matches!(self, ListShape::Cursored | ListShape::FilteredCursored(_))
    }

    pub(crate) fn filter_sql(self) -> Option<&'a str> {
        match self {
            ListShape::Filtered(fragment) | ListShape::FilteredCursored(fragment) => Some(fragment),
            ListShape::Plain | ListShape::Cursored => None,
        }
    }
}

/// Comparison operator of a structured filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
        }
    }
}

/// A single `(field, operator, value)` predicate, validated against the
/// per-kind field whitelist before translation.
#[derive(Debug, Clone)]
pub struct FilterExpr {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FilterExpr {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Caller-supplied listing filter.
///
/// `Expr` is the supported path: expressions are validated and translated to
/// bound predicates. `Raw` splices caller text into the query verbatim, a
/// deprecated compatibility mode for trusted callers only; malformed
/// fragments surface as statement errors, never as validation errors.
#[derive(Debug, Clone)]
pub enum ListFilter {
    Expr(Vec<FilterExpr>),
    Raw(String),
}

/// Filterable fields shared by both stock kinds, mapped to core columns.
const STOCK_FIELDS: &[(&str, &str)] = &[
    ("stock_id", "s.stock_id"),
    ("created_at", "s.created_at"),
    ("updated_at", "s.updated_at"),
    ("created_by", "s.created_by"),
    ("updated_by", "s.updated_by"),
    ("summary", "s.summary"),
    ("editable_summary", "s.editable_summary"),
    ("depositor", "s.depositor"),
];

const STRAIN_FIELDS: &[(&str, &str)] = &[
    ("systematic_name", "p.systematic_name"),
    ("label", "p.label"),
    ("species", "p.species"),
    ("plasmid", "p.plasmid"),
    ("term", "p.term"),
];

const PLASMID_FIELDS: &[(&str, &str)] = &[
    ("image_map", "p.image_map"),
    ("sequence", "p.sequence"),
    ("name", "p.name"),
];

fn column_for(kind: StockKind, field: &str) -> Option<&'static str> {
    let kind_fields = match kind {
        StockKind::Strain => STRAIN_FIELDS,
        StockKind::Plasmid => PLASMID_FIELDS,
    };
    STOCK_FIELDS
        .iter()
        .chain(kind_fields.iter())
        .find(|(name, _)| *name == field)
        .map(|(_, column)| *column)
}

/// A filter rendered to a predicate clause plus its bound values.
#[derive(Debug)]
pub(crate) struct CompiledFilter {
    pub sql: String,
    pub binds: NamedBinds,
}

/// Translate a filter for the given stock kind.
pub(crate) fn compile_filter(filter: &ListFilter, kind: StockKind) -> RepoResult<CompiledFilter> {
    match filter {
        ListFilter::Raw(fragment) => {
            // Trusted-caller passthrough; no validation by design
            tracing::debug!(fragment = %fragment, "splicing raw filter fragment");
            Ok(CompiledFilter {
                sql: fragment.clone(),
                binds: Vec::new(),
            })
        }
        ListFilter::Expr(exprs) => {
            if exprs.is_empty() {
                return Err(RepoError::BadFilter("empty expression list".to_string()));
            }
            let mut clauses = Vec::with_capacity(exprs.len());
            let mut binds = Vec::with_capacity(exprs.len());
            for (idx, expr) in exprs.iter().enumerate() {
                let column = column_for(kind, &expr.field).ok_or_else(|| {
                    RepoError::BadFilter(format!(
                        "unknown field {} for kind {}",
                        expr.field, kind
                    ))
                })?;
                let name = format!(":f{idx}");
                clauses.push(format!("{} {} {}", column, expr.op.sql(), name));
                binds.push((name, BindValue::Text(expr.value.clone())));
            }
            Ok(CompiledFilter {
                sql: clauses.join(" AND "),
                binds,
            })
        }
    }
}

/// Merged projection of a strain row: core record, properties document, and
/// parent resolved through the lineage edge.
fn strain_select(cfg: &CollectionConfig) -> String {
    format!(
        "SELECT s.stock_id, s.created_at, s.updated_at, s.created_by, s.updated_by, \
                s.summary, s.editable_summary, s.depositor, \
                s.genes_json, s.dbxrefs_json, s.publications_json, \
                p.systematic_name, p.label, p.species, p.plasmid, p.names_json, p.term, \
                pe.from_id AS parent \
         FROM {stock} s \
         JOIN {stock_type} t ON t.from_id = s.stock_id AND t.type = 'strain' \
         JOIN {stockprop} p ON p.key = t.to_id \
         LEFT JOIN {parent} pe ON pe.to_id = s.stock_id",
        stock = cfg.stock,
        stock_type = cfg.stock_type_edge,
        stockprop = cfg.stockprop,
        parent = cfg.parent_edge,
    )
}

fn plasmid_select(cfg: &CollectionConfig) -> String {
    format!(
        "SELECT s.stock_id, s.created_at, s.updated_at, s.created_by, s.updated_by, \
                s.summary, s.editable_summary, s.depositor, \
                s.genes_json, s.dbxrefs_json, s.publications_json, \
                p.image_map, p.sequence, p.name \
         FROM {stock} s \
         JOIN {stock_type} t ON t.from_id = s.stock_id AND t.type = 'plasmid' \
         JOIN {stockprop} p ON p.key = t.to_id",
        stock = cfg.stock,
        stock_type = cfg.stock_type_edge,
        stockprop = cfg.stockprop,
    )
}

fn select_for(kind: StockKind, cfg: &CollectionConfig) -> String {
    match kind {
        StockKind::Strain => strain_select(cfg),
        StockKind::Plasmid => plasmid_select(cfg),
    }
}

/// Compose the list query for the given shape. The filter fragment, when
/// the shape carries one, is the output of [`compile_filter`]. Results are
/// newest-first and limited to `:limit` rows (the caller passes `limit + 1`
/// for the pagination lookahead).
pub(crate) fn list_query(kind: StockKind, cfg: &CollectionConfig, shape: ListShape<'_>) -> String {
    let mut query = select_for(kind, cfg);
    let mut clauses: Vec<String> = Vec::new();
    if shape.has_cursor() {
        // Inclusive bound: the cursor row reappears as the next page's head
        clauses.push("s.created_at <= :cursor".to_string());
    }
    if let Some(fragment) = shape.filter_sql() {
        clauses.push(format!("({fragment})"));
    }
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    query.push_str(" ORDER BY s.created_at DESC LIMIT :limit");
    query
}

/// Compose the point-lookup query for one stock identifier.
pub(crate) fn get_query(kind: StockKind, cfg: &CollectionConfig) -> String {
    let mut query = select_for(kind, cfg);
    query.push_str(" WHERE s.stock_id = :id");
    query
}

/// Compose the bulk lookup for an explicit id list; `count` positional
/// placeholders are generated. No result-order guarantee beyond the ids
/// matching.
pub(crate) fn ids_query(kind: StockKind, cfg: &CollectionConfig, count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    let mut query = select_for(kind, cfg);
    query.push_str(&format!(" WHERE s.stock_id IN ({placeholders})"));
    query.push_str(" ORDER BY s.created_at DESC");
    query
}

/// First step of every edit: resolve a stock identifier to its
/// properties-document key through the type edge.
pub(crate) fn propkey_query(cfg: &CollectionConfig) -> String {
    format!(
        "SELECT t.to_id FROM {stock_type} t WHERE t.from_id = :id AND t.type = :kind",
        stock_type = cfg.stock_type_edge,
    )
}
