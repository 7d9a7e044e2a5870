//! Registry and storage errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by registry and record operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The path does not exist or is not a directory.
    #[error("The path '{path}' is not a valid directory.")]
    InvalidPath { path: PathBuf },

    /// Another root already uses this name.
    #[error("A root with the name '{name}' already exists.")]
    DuplicateName { name: String },

    /// Another root already uses this canonical path.
    #[error("A root for the path '{path}' already exists.")]
    DuplicatePath { path: PathBuf },

    /// No root matched the selector.
    #[error("Root with {selector} not found.")]
    NotFound { selector: String },

    /// The arguments do not select a single operation.
    #[error("{message}")]
    InvalidArgument { message: String },

    /// The database directory could not be created.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl RegistryError {
    pub(crate) fn not_found_id(id: i64) -> Self {
        Self::NotFound {
            selector: format!("ID {id}"),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
