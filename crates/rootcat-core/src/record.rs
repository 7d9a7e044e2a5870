//! Root, file and folder record types.

use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a registered root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RootId(pub i64);

impl RootId {
    /// Create a new RootId from a raw row id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered top-level directory eligible for scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Identifier assigned by storage.
    pub id: RootId,
    /// Unique display name.
    pub name: String,
    /// Unique canonical absolute path.
    pub path: PathBuf,
    /// When the root was registered.
    pub created_at: DateTime<Utc>,
    /// When the root was last renamed or repathed.
    pub updated_at: DateTime<Utc>,
}

/// Filesystem timestamps captured for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: DateTime<Utc>) -> Self {
        Self {
            modified,
            created: None,
        }
    }

    /// Timestamps for an entry whose metadata could not be read.
    pub fn unknown() -> Self {
        Self::with_modified(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Read timestamps from file metadata. A missing mtime falls back to the epoch.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let created = metadata.created().ok().map(DateTime::<Utc>::from);
        Self { modified, created }
    }
}

/// Lower-cased extension of a path including the leading dot, or empty.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extension_of(path: &Path) -> CompactString {
    match path.extension() {
        Some(ext) => {
            let mut out = CompactString::new(".");
            out.push_str(&ext.to_string_lossy().to_lowercase());
            out
        }
        None => CompactString::default(),
    }
}

/// A file produced by a walk, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// File name (not full path).
    pub name: CompactString,
    /// Lower-cased extension including the dot, or empty.
    pub extension: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// File timestamps.
    pub timestamps: Timestamps,
    /// Directory containing the file.
    pub parent: PathBuf,
}

impl FileEntry {
    /// Build an entry for `path` from already-read metadata.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            extension: extension_of(&path),
            name,
            size: metadata.len(),
            timestamps: Timestamps::from_metadata(metadata),
            parent,
            path,
        }
    }
}

/// A directory that survived pruning during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Full path of the directory.
    pub path: PathBuf,
    /// Directory name (not full path).
    pub name: CompactString,
    /// Total bytes of the direct file children cataloged by the walk.
    pub size: u64,
    /// Number of direct file children cataloged by the walk.
    pub file_count: u64,
    /// Directory timestamps.
    pub timestamps: Timestamps,
}

impl FolderEntry {
    /// Create an empty folder entry; sizes accumulate as files are cataloged.
    pub fn new(path: impl Into<PathBuf>, timestamps: Timestamps) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        Self {
            path,
            name,
            size: 0,
            file_count: 0,
            timestamps,
        }
    }

    /// Account for one cataloged direct child file.
    pub fn record_file(&mut self, size: u64) {
        self.size += size;
        self.file_count += 1;
    }
}

/// A persisted file row belonging to one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub root_id: RootId,
    pub full_path: PathBuf,
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub file_last_modified: DateTime<Utc>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted folder row belonging to one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: i64,
    pub root_id: RootId,
    pub full_path: PathBuf,
    pub name: String,
    pub size: u64,
    pub file_count: u64,
    pub folder_last_modified: DateTime<Utc>,
    pub folder_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
