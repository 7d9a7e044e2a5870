//! Filtered, pruning directory walker built on jwalk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use jwalk::{DirEntryIter, Parallelism, WalkDir};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rootcat_core::{
    FileEntry, FilterConfig, FilterEngine, FolderEntry, ScanError, ScanStats, ScanWarning,
    Timestamps, WarningKind,
};

use crate::progress::{ProgressTracker, ScanProgress};

/// Walks one root at a time, consulting a [`FilterEngine`] for every
/// directory and file.
#[derive(Debug, Clone)]
pub struct Walker {
    engine: Arc<FilterEngine>,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Walker {
    /// Create a walker from filter configuration.
    pub fn new(config: &FilterConfig) -> Result<Self, ScanError> {
        Ok(Self::with_engine(Arc::new(FilterEngine::new(config)?)))
    }

    /// Create a walker around an already compiled engine.
    pub fn with_engine(engine: Arc<FilterEngine>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            engine,
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    /// Use `token` to stop walks cooperatively.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// The cancellation token checked at each directory.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The filter policy used by this walker.
    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    /// Start a walk of `root`.
    ///
    /// The root must exist and be a directory; anything else is reported
    /// here, before any entry is produced. The returned iterator yields
    /// cataloged files lazily in name-sorted, depth-first order.
    pub fn scan(&self, root: impl AsRef<Path>) -> Result<ScanIter, ScanError> {
        let root = root.as_ref();
        let root_path = root.canonicalize().map_err(|e| ScanError::io(root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        debug!(root = %root_path.display(), "starting walk");

        let pruned = Arc::new(AtomicU64::new(0));
        let engine = Arc::clone(&self.engine);
        let pruned_counter = Arc::clone(&pruned);

        let entries = WalkDir::new(&root_path)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .process_read_dir(move |depth, _path, _state, children| {
                // The root itself is delivered with no depth and is never pruned
                if depth.is_none() {
                    return;
                }
                let before = children.len();
                children.retain(|child| match child {
                    Ok(entry) if entry.file_type().is_dir() => {
                        let name = entry.file_name().to_string_lossy();
                        engine.should_descend(&name, &entry.path())
                    }
                    _ => true,
                });
                let removed = (before - children.len()) as u64;
                if removed > 0 {
                    pruned_counter.fetch_add(removed, Ordering::Relaxed);
                }
            })
            .into_iter();

        Ok(ScanIter {
            entries,
            engine: Arc::clone(&self.engine),
            cancel: self.cancel.clone(),
            progress: ProgressTracker::new(self.progress_tx.clone(), &root_path),
            root: root_path,
            folders: IndexMap::new(),
            warnings: Vec::new(),
            stats: ScanStats::new(),
            pruned,
            cancelled: false,
            finished: false,
        })
    }

    /// Walk `root` to the end and collect every cataloged file.
    pub fn scan_to_end(&self, root: impl AsRef<Path>) -> Result<ScanResult, ScanError> {
        let mut iter = self.scan(root)?;
        let files: Vec<FileEntry> = iter.by_ref().collect();
        Ok(ScanResult {
            files,
            outcome: iter.into_outcome(),
        })
    }

    /// Like [`Walker::scan_to_end`], but a cancelled walk is an error.
    pub fn scan_complete(&self, root: impl AsRef<Path>) -> Result<ScanResult, ScanError> {
        let result = self.scan_to_end(root)?;
        if result.outcome.cancelled {
            return Err(ScanError::Cancelled {
                path: result.outcome.root,
            });
        }
        Ok(result)
    }
}

/// Everything a walk produced besides the files themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Canonical path of the walked root.
    pub root: PathBuf,
    /// Directories that survived pruning, in visit order.
    pub folders: Vec<FolderEntry>,
    /// Non-fatal problems encountered.
    pub warnings: Vec<ScanWarning>,
    /// Walk statistics.
    pub stats: ScanStats,
    /// Wall-clock duration of the walk.
    pub duration: Duration,
    /// Whether the walk stopped early on cancellation.
    pub cancelled: bool,
}

/// A collected walk.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub files: Vec<FileEntry>,
    pub outcome: ScanOutcome,
}

/// Lazy iterator over the files cataloged by one walk.
pub struct ScanIter {
    entries: DirEntryIter<((), ())>,
    engine: Arc<FilterEngine>,
    cancel: CancellationToken,
    progress: ProgressTracker,
    root: PathBuf,
    folders: IndexMap<PathBuf, FolderEntry>,
    warnings: Vec<ScanWarning>,
    stats: ScanStats,
    pruned: Arc<AtomicU64>,
    cancelled: bool,
    finished: bool,
}

impl ScanIter {
    /// Canonical path of the root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Finish the walk and return its outcome.
    ///
    /// Entries not yet consumed are walked and discarded so folder totals
    /// are complete.
    pub fn into_outcome(mut self) -> ScanOutcome {
        for _ in self.by_ref() {}
        ScanOutcome {
            duration: self.progress.elapsed(),
            root: self.root,
            folders: self.folders.into_values().collect(),
            warnings: self.warnings,
            stats: self.stats,
            cancelled: self.cancelled,
        }
    }

    fn enter_directory(&mut self, path: PathBuf, depth: u32) {
        let timestamps = match std::fs::metadata(&path) {
            Ok(metadata) => Timestamps::from_metadata(&metadata),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to stat directory");
                self.warnings.push(ScanWarning::metadata(&path, &err));
                Timestamps::unknown()
            }
        };

        self.stats.record_dir(depth);
        self.progress.record_dir(&path);
        self.folders
            .insert(path.clone(), FolderEntry::new(path, timestamps));
    }

    fn visit_file(&mut self, path: PathBuf, is_symlink: bool, depth: u32) -> Option<FileEntry> {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if !self.engine.admits_directory(&parent)
            || !self.engine.admits_special(&parent, &path)
            || !self.engine.should_include_file(&path)
        {
            self.stats.record_filtered();
            return None;
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                let warning = if is_symlink {
                    ScanWarning::broken_symlink(&path)
                } else {
                    ScanWarning::metadata(&path, &err)
                };
                warn!(path = %path.display(), error = %err, "dropping entry");
                self.warnings.push(warning);
                self.stats.record_skipped();
                self.progress.record_skipped();
                return None;
            }
        };

        // Links to directories are not followed and special files are not cataloged
        if !metadata.is_file() {
            return None;
        }

        if !self.engine.passes_size_ceiling(metadata.len()) {
            self.stats.record_filtered();
            return None;
        }

        let file = FileEntry::from_metadata(path, &metadata);

        if let Some(folder) = self.folders.get_mut(&file.parent) {
            folder.record_file(file.size);
        }
        self.stats
            .record_file(file.path.clone(), file.size, file.timestamps.modified, depth);
        self.progress.record_file(&file.path, file.size);

        Some(file)
    }

    fn record_read_error(&mut self, err: jwalk::Error) {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        let kind = match err.io_error().map(std::io::Error::kind) {
            Some(std::io::ErrorKind::PermissionDenied) => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        warn!(path = %path.display(), error = %err, "failed to read entry");
        self.warnings.push(ScanWarning::new(path, err.to_string(), kind));
        self.stats.record_skipped();
        self.progress.record_skipped();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.stats.record_pruned(self.pruned.load(Ordering::Relaxed));
        self.progress.finish();

        info!(
            root = %self.root.display(),
            files = self.stats.total_files,
            dirs = self.stats.total_dirs,
            pruned = self.stats.pruned_dirs,
            skipped = self.stats.skipped_entries,
            cancelled = self.cancelled,
            "walk finished"
        );
    }
}

impl Iterator for ScanIter {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        if self.finished {
            return None;
        }

        loop {
            let Some(result) = self.entries.next() else {
                self.finish();
                return None;
            };

            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    self.record_read_error(err);
                    continue;
                }
            };

            let file_type = entry.file_type();
            let depth = entry.depth() as u32;
            let path = entry.path();

            if file_type.is_dir() {
                if self.cancel.is_cancelled() {
                    debug!(root = %self.root.display(), "walk cancelled");
                    self.cancelled = true;
                    self.finish();
                    return None;
                }
                self.enter_directory(path, depth);
                continue;
            }

            if let Some(file) = self.visit_file(path, file_type.is_symlink(), depth) {
                return Some(file);
            }
        }
    }
}
