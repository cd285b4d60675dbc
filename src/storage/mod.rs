//! Database handle and schema bootstrap
//!
//! The repository talks to a single embedded SQLite database. Collections
//! and edge collections are tables, and named graphs are rows in a small
//! registry table, all provisioned idempotently by [`bootstrap`].

mod database;
mod schema;

pub use database::Database;
pub use schema::{bootstrap, CollectionConfig, GraphDefinition};
