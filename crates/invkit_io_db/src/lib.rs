//! `invkit_io_db` v1:
//! Inventory sources for the report engine.
//!
//! Architecture:
//! - `conf`     : connection defaults and table names
//! - `spec`     : connection options and store errors
//! - `util`     : row shaping shared by both sources
//! - `pg`       : PostgreSQL source (`sqlx` pool on an owned tokio runtime)
//! - `snapshot` : offline source over Arrow IPC table dumps (`polars`)
pub mod conf;
pub mod pg;
pub mod snapshot;
pub mod spec;
pub mod util;

pub use pg::PgInventorySource;
pub use snapshot::SnapshotInventorySource;
pub use spec::{DbError, SpecDbConnection};
