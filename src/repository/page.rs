//! Pagination engine
//!
//! Listings are keyed by creation time, newest first. The repository always
//! fetches one row beyond the requested limit; receiving exactly that many
//! rows is the signal that more pages exist. The cursor is the last returned
//! row's creation time in milliseconds and is applied as an inclusive upper
//! bound on the next call, so the last row of one page reappears as the
//! first row of the next. This is an accepted, documented boundary property.

use crate::model::StockRecord;
use crate::repository::query::ListFilter;
use chrono::{DateTime, Utc};

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Parameters of a list request.
#[derive(Debug)]
pub struct ListParams {
    /// Millisecond cursor from a previous page, if any
    pub cursor: Option<i64>,
    /// Maximum page size; the response may carry one extra lookahead row
    pub limit: i64,
    pub filter: Option<ListFilter>,
}

impl ListParams {
    pub fn new(limit: i64) -> Self {
        Self {
            cursor: None,
            limit,
            filter: None,
        }
    }

    pub fn with_cursor(mut self, cursor: i64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug)]
pub struct ListPage {
    /// Up to `limit + 1` records; when `next_cursor` is set the final record
    /// is the lookahead row and doubles as the head of the next page
    pub records: Vec<StockRecord>,
    pub next_cursor: Option<i64>,
}

/// Encode a creation time as a cursor.
pub fn cursor_from(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Apply the lookahead rule to rows fetched with `LIMIT limit + 1`.
///
/// Exactly `limit + 1` rows back means more pages exist; anything fewer is
/// the final page and yields no cursor.
pub(crate) fn paginate(records: Vec<StockRecord>, limit: i64) -> ListPage {
    let next_cursor = if records.len() as i64 == limit + 1 {
        records.last().map(|r| cursor_from(r.created_at))
    } else {
        None
    };
    ListPage {
        records,
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlasmidProperties, StockId, StockProperties};

    fn record(id: &str, created_ms: i64) -> StockRecord {
        StockRecord {
            stock_id: StockId::new(id),
            created_at: DateTime::from_timestamp_millis(created_ms).unwrap(),
            updated_at: DateTime::from_timestamp_millis(created_ms).unwrap(),
            created_by: "curator@dictybase.org".to_string(),
            updated_by: "curator@dictybase.org".to_string(),
            summary: String::new(),
            editable_summary: String::new(),
            depositor: String::new(),
            genes: Vec::new(),
            dbxrefs: Vec::new(),
            publications: Vec::new(),
            properties: StockProperties::Plasmid(PlasmidProperties::default()),
        }
    }

    #[test]
    fn full_lookahead_yields_cursor_from_last_row() {
        let rows: Vec<_> = (0..5).map(|i| record(&format!("DBP0{i}"), 1000 - i)).collect();
        let page = paginate(rows, 4);
        assert_eq!(page.records.len(), 5);
        assert_eq!(page.next_cursor, Some(996));
    }

    #[test]
    fn short_page_is_final() {
        let rows: Vec<_> = (0..3).map(|i| record(&format!("DBP0{i}"), 1000 - i)).collect();
        let page = paginate(rows, 4);
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn exact_limit_without_lookahead_is_final() {
        let rows: Vec<_> = (0..4).map(|i| record(&format!("DBP0{i}"), 1000 - i)).collect();
        let page = paginate(rows, 4);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn default_params_request_a_full_page() {
        let params = ListParams::default();
        assert_eq!(params.limit, DEFAULT_PAGE_SIZE);
        assert!(params.cursor.is_none());
        assert!(params.filter.is_none());
    }

    #[test]
    fn empty_result_is_final() {
        let page = paginate(Vec::new(), 10);
        assert!(page.records.is_empty());
        assert_eq!(page.next_cursor, None);
    }
}
