//! Core types and policy for rootcat.
//!
//! This crate provides the data structures shared by the scanner and the
//! registry: roots, file and folder records, configuration, errors, and the
//! filter engine that decides what a walk prunes and catalogs.

mod config;
mod error;
mod filter;
mod record;
mod stats;

pub use config::{CatalogConfig, DEFAULT_MAX_FILE_SIZE, FilterConfig, FilterConfigBuilder};
pub use error::{ConfigError, FilterError, ScanError, ScanWarning, WarningKind};
pub use filter::{FilterEngine, PatternSet, path_matches_override};
pub use record::{
    FileEntry, FileRecord, FolderEntry, FolderRecord, Root, RootId, Timestamps, extension_of,
};
pub use stats::ScanStats;
