//! Stockstore: graph-backed repository for biological stock records
//!
//! Persists and retrieves strains and plasmids in an embedded database,
//! keeping typed relationships (a stock's properties document, a strain's
//! parent lineage, and ontology-term associations) as graph edges rather
//! than foreign keys.
//!
//! # Core Concepts
//!
//! - **StockRecord**: the canonical entity, merging the core record and its
//!   kind-specific properties document
//! - **Lineage edge**: the single mutable parent→child edge of a strain
//! - **Cursor**: a millisecond-timestamp pagination token marking the oldest
//!   record already returned
//!
//! # Example
//!
//! ```
//! use stockstore::StockRepository;
//!
//! let repo = StockRepository::open_in_memory().unwrap();
//! // Schema is bootstrapped; repository is ready for use
//! ```

mod model;
pub mod repository;
pub mod storage;

pub use model::{
    NewPlasmid, NewStrain, PlasmidProperties, PlasmidUpdate, StockId, StockKind, StockProperties,
    StockRecord, StrainProperties, StrainUpdate,
};
pub use repository::{
    cursor_from, FilterExpr, FilterOp, ListFilter, ListPage, ListParams, ListShape, RepoError,
    RepoResult, StockRepository, DEFAULT_PAGE_SIZE,
};
pub use storage::{bootstrap, CollectionConfig, Database, GraphDefinition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
