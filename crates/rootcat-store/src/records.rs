//! Persisted scan snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::{debug, warn};

use rootcat_core::{FileEntry, FileRecord, FolderEntry, FolderRecord, RootId};

use crate::error::Result;
use crate::registry;

/// Rows written by one [`record_scan`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub files: usize,
    pub folders: usize,
    /// Entries left out because their path is not valid UTF-8.
    pub skipped: usize,
}

/// Persist one completed walk of `root_id` atomically.
///
/// The rows are written under a savepoint, so this works both on a plain
/// connection and inside a caller's open transaction. Rows are appended;
/// earlier snapshots of the same root are kept. Entries whose path is not
/// valid UTF-8 are skipped and counted in the summary.
pub fn record_scan(
    conn: &Connection,
    root_id: RootId,
    files: &[FileEntry],
    folders: &[FolderEntry],
) -> Result<RecordSummary> {
    // Surface an unknown root as NotFound rather than a foreign key failure
    registry::get(conn, root_id)?;

    conn.execute_batch("SAVEPOINT record_scan")?;
    let summary = match insert_snapshot(conn, root_id, files, folders) {
        Ok(summary) => summary,
        Err(err) => {
            if let Err(rollback) =
                conn.execute_batch("ROLLBACK TO record_scan; RELEASE record_scan")
            {
                warn!(error = %rollback, "failed to roll back scan snapshot");
            }
            return Err(err);
        }
    };
    conn.execute_batch("RELEASE record_scan")?;

    debug!(
        root_id = %root_id,
        files = summary.files,
        folders = summary.folders,
        skipped = summary.skipped,
        "recorded scan snapshot"
    );

    Ok(summary)
}

fn insert_snapshot(
    conn: &Connection,
    root_id: RootId,
    files: &[FileEntry],
    folders: &[FolderEntry],
) -> Result<RecordSummary> {
    let now = Utc::now();
    let mut summary = RecordSummary::default();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO root_folders \
         (root_id, full_path, name, size, file_count, folder_last_modified, \
          folder_created_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    )?;
    for folder in folders {
        let Some(full_path) = stored_path(&folder.path) else {
            summary.skipped += 1;
            continue;
        };
        stmt.execute(params![
            root_id.0,
            full_path,
            folder.name.as_str(),
            folder.size as i64,
            folder.file_count as i64,
            folder.timestamps.modified,
            folder.timestamps.created,
            now,
        ])?;
        summary.folders += 1;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO root_files \
         (root_id, full_path, name, extension, size, file_last_modified, \
          file_created_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    )?;
    for file in files {
        let Some(full_path) = stored_path(&file.path) else {
            summary.skipped += 1;
            continue;
        };
        stmt.execute(params![
            root_id.0,
            full_path,
            file.name.as_str(),
            file.extension.as_str(),
            file.size as i64,
            file.timestamps.modified,
            file.timestamps.created,
            now,
        ])?;
        summary.files += 1;
    }
    Ok(summary)
}

fn stored_path(path: &Path) -> Option<&str> {
    let text = path.to_str();
    if text.is_none() {
        warn!(path = %path.display(), "skipping entry with a non-UTF-8 path");
    }
    text
}

/// All file rows of a root, in insertion order.
pub fn list_files(conn: &Connection, root_id: RootId) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, root_id, full_path, name, extension, size, file_last_modified, \
                file_created_at, created_at, updated_at \
         FROM root_files WHERE root_id = ?1 ORDER BY id",
    )?;
    let files = stmt
        .query_map(params![root_id.0], file_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(files)
}

/// All folder rows of a root, in insertion order.
pub fn list_folders(conn: &Connection, root_id: RootId) -> Result<Vec<FolderRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, root_id, full_path, name, size, file_count, folder_last_modified, \
                folder_created_at, created_at, updated_at \
         FROM root_folders WHERE root_id = ?1 ORDER BY id",
    )?;
    let folders = stmt
        .query_map(params![root_id.0], folder_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(folders)
}

pub fn count_files(conn: &Connection, root_id: RootId) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM root_files WHERE root_id = ?1",
        params![root_id.0],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        root_id: RootId::new(row.get(1)?),
        full_path: PathBuf::from(row.get::<_, String>(2)?),
        name: row.get(3)?,
        extension: row.get(4)?,
        size: row.get::<_, i64>(5)? as u64,
        file_last_modified: row.get::<_, DateTime<Utc>>(6)?,
        file_created_at: row.get::<_, Option<DateTime<Utc>>>(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<FolderRecord> {
    Ok(FolderRecord {
        id: row.get(0)?,
        root_id: RootId::new(row.get(1)?),
        full_path: PathBuf::from(row.get::<_, String>(2)?),
        name: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        file_count: row.get::<_, i64>(5)? as u64,
        folder_last_modified: row.get::<_, DateTime<Utc>>(6)?,
        folder_created_at: row.get::<_, Option<DateTime<Utc>>>(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
