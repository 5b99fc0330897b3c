//! Storefront Sync - catalog seeding, upsert and export for the storefront database
//!
//! Rows flow from the generated product catalog (or a JSON file) through the
//! upsert engine into SQLite, and back out through the export engine as
//! JSON documents.

pub mod catalog;
pub mod error;
pub mod export;
pub mod schema;
pub mod store;
pub mod upsert;
pub mod value;

pub use catalog::{ProductCatalog, ProductEntry};
pub use error::{Result, SyncError};
pub use export::{export_table, read_table, read_table_with_connection, ExportReport};
pub use schema::{
    init_schema, prepare_store, reset_schema, validate_identifier, ColumnType, TableSchema,
};
pub use store::{ConnectionProvider, StoreConfig};
pub use upsert::{load_rows, upsert, upsert_with_connection};
pub use value::{Row, StoreValue};
