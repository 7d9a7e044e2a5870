//! Persistent root registry for rootcat.
//!
//! Roots, and the file and folder snapshots recorded for them, live in a
//! single SQLite database. Registry and record functions take an explicit
//! [`rusqlite::Connection`]; [`Database`] owns the connection and its
//! lifecycle.

mod database;
mod error;
pub mod records;
pub mod registry;

pub use database::Database;
pub use error::{RegistryError, Result};
pub use records::{RecordSummary, count_files, list_files, list_folders, record_scan};
pub use registry::{list, lookup, register, remove, rename_or_repath};
