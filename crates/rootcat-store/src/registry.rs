//! Root registry operations.
//!
//! Every function takes an explicit connection; a [`rusqlite::Transaction`]
//! derefs to one, so callers can group several operations atomically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

use rootcat_core::{Root, RootId};

use crate::error::{RegistryError, Result};

const ROOT_COLUMNS: &str = "id, name, path, created_at, updated_at";

/// Register `path` as a new root.
///
/// The path is canonicalized and must be an existing directory. The name
/// defaults to the final segment of the canonical path.
pub fn register(conn: &Connection, path: &Path, name: Option<&str>) -> Result<Root> {
    let resolved = resolve_directory(path)?;
    let name = match name {
        Some(name) => validate_name(name)?.to_string(),
        None => default_name(&resolved),
    };

    if find_by_name(conn, &name)?.is_some() {
        return Err(RegistryError::DuplicateName { name });
    }
    if find_by_path(conn, &resolved)?.is_some() {
        return Err(RegistryError::DuplicatePath { path: resolved });
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO roots (name, path, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, path_text(&resolved)?, now, now],
    )
    .map_err(|e| map_unique_violation(e, &name, &resolved))?;

    let id = RootId::new(conn.last_insert_rowid());
    debug!(%id, name = %name, path = %resolved.display(), "registered root");

    Ok(Root {
        id,
        name,
        path: resolved,
        created_at: now,
        updated_at: now,
    })
}

/// Look up a root by exactly one of `name` or `path`.
pub fn lookup(conn: &Connection, name: Option<&str>, path: Option<&Path>) -> Result<Root> {
    match (name, path) {
        (Some(name), None) => find_by_name(conn, name)?.ok_or_else(|| RegistryError::NotFound {
            selector: format!("name '{name}'"),
        }),
        (None, Some(path)) => {
            let resolved = comparable_path(path);
            find_by_path(conn, &resolved)?.ok_or_else(|| RegistryError::NotFound {
                selector: format!("path '{}'", path.display()),
            })
        }
        (Some(_), Some(_)) => Err(RegistryError::invalid_argument(
            "Only one of name or path may be provided.",
        )),
        (None, None) => Err(RegistryError::invalid_argument(
            "Either name or path must be provided.",
        )),
    }
}

/// All roots in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<Root>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {ROOT_COLUMNS} FROM roots ORDER BY id"))?;
    let roots = stmt
        .query_map([], root_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(roots)
}

/// Fetch a root by id.
pub fn get(conn: &Connection, id: RootId) -> Result<Root> {
    conn.query_row(
        &format!("SELECT {ROOT_COLUMNS} FROM roots WHERE id = ?1"),
        params![id.0],
        root_from_row,
    )
    .optional()?
    .ok_or_else(|| RegistryError::not_found_id(id.0))
}

/// Delete a root together with its file and folder records.
pub fn remove(conn: &Connection, id: RootId) -> Result<()> {
    let deleted = conn.execute("DELETE FROM roots WHERE id = ?1", params![id.0])?;
    if deleted == 0 {
        return Err(RegistryError::not_found_id(id.0));
    }
    debug!(%id, "removed root");
    Ok(())
}

/// Change the name and/or path of a root.
///
/// Uniqueness is checked against every other root; a new path must be an
/// existing directory.
pub fn rename_or_repath(
    conn: &Connection,
    id: RootId,
    name: Option<&str>,
    path: Option<&Path>,
) -> Result<Root> {
    if name.is_none() && path.is_none() {
        return Err(RegistryError::invalid_argument(
            "At least one of name or path must be provided.",
        ));
    }

    let mut root = get(conn, id)?;

    if let Some(name) = name {
        let name = validate_name(name)?;
        if find_by_name(conn, name)?.is_some_and(|other| other.id != id) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }
        root.name = name.to_string();
    }

    if let Some(path) = path {
        let resolved = resolve_directory(path)?;
        if find_by_path(conn, &resolved)?.is_some_and(|other| other.id != id) {
            return Err(RegistryError::DuplicatePath { path: resolved });
        }
        root.path = resolved;
    }

    root.updated_at = Utc::now();
    conn.execute(
        "UPDATE roots SET name = ?1, path = ?2, updated_at = ?3 WHERE id = ?4",
        params![root.name, path_text(&root.path)?, root.updated_at, id.0],
    )
    .map_err(|e| map_unique_violation(e, &root.name, &root.path))?;

    debug!(%id, name = %root.name, path = %root.path.display(), "updated root");
    Ok(root)
}

fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Root>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ROOT_COLUMNS} FROM roots WHERE name = ?1"),
            params![name],
            root_from_row,
        )
        .optional()?)
}

fn find_by_path(conn: &Connection, path: &Path) -> Result<Option<Root>> {
    // Stored paths are always UTF-8
    let Some(text) = path.to_str() else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            &format!("SELECT {ROOT_COLUMNS} FROM roots WHERE path = ?1"),
            params![text],
            root_from_row,
        )
        .optional()?)
}

fn root_from_row(row: &Row<'_>) -> rusqlite::Result<Root> {
    Ok(Root {
        id: RootId::new(row.get(0)?),
        name: row.get(1)?,
        path: PathBuf::from(row.get::<_, String>(2)?),
        created_at: row.get::<_, DateTime<Utc>>(3)?,
        updated_at: row.get::<_, DateTime<Utc>>(4)?,
    })
}

/// Canonicalize `path`, requiring an existing directory with a UTF-8 path.
fn resolve_directory(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(resolved) if resolved.is_dir() && resolved.to_str().is_some() => Ok(resolved),
        _ => Err(RegistryError::InvalidPath {
            path: path.to_path_buf(),
        }),
    }
}

/// Canonical form when resolvable, otherwise the absolute lexical form.
fn comparable_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn default_name(resolved: &Path) -> String {
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| resolved.to_string_lossy().into_owned())
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::invalid_argument("Root name must not be empty."));
    }
    Ok(trimmed)
}

/// Stored text of a path. Paths that are not valid UTF-8 are rejected.
fn path_text(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| RegistryError::InvalidPath {
        path: path.to_path_buf(),
    })
}

/// Translate a UNIQUE violation on `roots` into the matching registry error.
fn map_unique_violation(err: rusqlite::Error, name: &str, path: &Path) -> RegistryError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("roots.name") {
                return RegistryError::DuplicateName {
                    name: name.to_string(),
                };
            }
            if message.contains("roots.path") {
                return RegistryError::DuplicatePath {
                    path: path.to_path_buf(),
                };
            }
        }
    }
    RegistryError::Database(err)
}
