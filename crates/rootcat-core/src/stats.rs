//! Walk statistics.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary statistics for one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files cataloged.
    pub total_files: u64,
    /// Bytes across cataloged files.
    pub total_size: u64,
    /// Directories visited.
    pub total_dirs: u64,
    /// Directories pruned before descent.
    pub pruned_dirs: u64,
    /// Files rejected by the filter or the size ceiling.
    pub filtered_files: u64,
    /// Entries dropped because of an I/O failure.
    pub skipped_entries: u64,
    /// Maximum depth reached below the root.
    pub max_depth: u32,
    /// Largest cataloged file (path, size).
    pub largest_file: Option<(PathBuf, u64)>,
    /// Most recently modified cataloged file (path, time).
    pub newest_file: Option<(PathBuf, DateTime<Utc>)>,
}

impl ScanStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a cataloged file.
    pub fn record_file(&mut self, path: PathBuf, size: u64, modified: DateTime<Utc>, depth: u32) {
        self.total_files += 1;
        self.total_size += size;
        self.max_depth = self.max_depth.max(depth);

        if self.largest_file.as_ref().is_none_or(|(_, s)| size > *s) {
            self.largest_file = Some((path.clone(), size));
        }

        if self.newest_file.as_ref().is_none_or(|(_, t)| modified > *t) {
            self.newest_file = Some((path, modified));
        }
    }

    /// Record a visited directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record pruned child directories.
    pub fn record_pruned(&mut self, count: u64) {
        self.pruned_dirs += count;
    }

    /// Record a file rejected by policy.
    pub fn record_filtered(&mut self) {
        self.filtered_files += 1;
    }

    /// Record an entry dropped after an I/O failure.
    pub fn record_skipped(&mut self) {
        self.skipped_entries += 1;
    }

    /// Fold another walk's stats into this one.
    pub fn merge(&mut self, other: &ScanStats) {
        self.total_files += other.total_files;
        self.total_size += other.total_size;
        self.total_dirs += other.total_dirs;
        self.pruned_dirs += other.pruned_dirs;
        self.filtered_files += other.filtered_files;
        self.skipped_entries += other.skipped_entries;
        self.max_depth = self.max_depth.max(other.max_depth);

        if let Some((path, size)) = &other.largest_file {
            if self.largest_file.as_ref().is_none_or(|(_, s)| size > s) {
                self.largest_file = Some((path.clone(), *size));
            }
        }
        if let Some((path, modified)) = &other.newest_file {
            if self.newest_file.as_ref().is_none_or(|(_, t)| modified > t) {
                self.newest_file = Some((path.clone(), *modified));
            }
        }
    }
}
