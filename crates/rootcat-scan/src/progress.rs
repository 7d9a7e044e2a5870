//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Files cataloged between two progress snapshots.
pub(crate) const PROGRESS_INTERVAL: u64 = 1000;

/// Progress information during a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Root being walked.
    pub root: PathBuf,
    /// Number of files cataloged so far.
    pub files_scanned: u64,
    /// Number of directories visited so far.
    pub dirs_scanned: u64,
    /// Total bytes cataloged so far.
    pub bytes_scanned: u64,
    /// Entries dropped after an I/O failure.
    pub skipped: u64,
    /// Last path visited.
    pub current_path: PathBuf,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
    /// Set on the final snapshot of a walk.
    pub finished: bool,
}

impl ScanProgress {
    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items visited (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

/// Per-walk progress state that publishes snapshots on a broadcast channel.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    tx: broadcast::Sender<ScanProgress>,
    start_time: Instant,
    root: PathBuf,
    files_scanned: u64,
    dirs_scanned: u64,
    bytes_scanned: u64,
    skipped: u64,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<ScanProgress>, root: &Path) -> Self {
        Self {
            tx,
            start_time: Instant::now(),
            root: root.to_path_buf(),
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            skipped: 0,
            current_path: root.to_path_buf(),
        }
    }

    pub fn record_file(&mut self, path: &Path, size: u64) {
        self.files_scanned += 1;
        self.bytes_scanned += size;
        if self.files_scanned % PROGRESS_INTERVAL == 0 {
            self.current_path = path.to_path_buf();
            self.publish(false);
        }
    }

    pub fn record_dir(&mut self, path: &Path) {
        self.dirs_scanned += 1;
        self.current_path = path.to_path_buf();
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Publish the closing snapshot.
    pub fn finish(&self) {
        self.publish(true);
    }

    pub fn snapshot(&self, finished: bool) -> ScanProgress {
        ScanProgress {
            root: self.root.clone(),
            files_scanned: self.files_scanned,
            dirs_scanned: self.dirs_scanned,
            bytes_scanned: self.bytes_scanned,
            skipped: self.skipped,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
            finished,
        }
    }

    fn publish(&self, finished: bool) {
        // No receivers is fine
        let _ = self.tx.send(self.snapshot(finished));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_every_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut tracker = ProgressTracker::new(tx, Path::new("/root"));

        for i in 0..PROGRESS_INTERVAL - 1 {
            tracker.record_file(Path::new("/root/a.rs"), i);
        }
        assert!(rx.try_recv().is_err());

        tracker.record_file(Path::new("/root/b.rs"), 1);
        let progress = rx.try_recv().unwrap();
        assert_eq!(progress.files_scanned, PROGRESS_INTERVAL);
        assert_eq!(progress.current_path, PathBuf::from("/root/b.rs"));
        assert!(!progress.finished);

        tracker.finish();
        assert!(rx.try_recv().unwrap().finished);
    }

    #[test]
    fn test_send_without_receivers() {
        let (tx, _) = broadcast::channel(1);
        let mut tracker = ProgressTracker::new(tx, Path::new("/root"));
        tracker.record_dir(Path::new("/root/src"));
        tracker.record_skipped();
        tracker.finish();

        let snapshot = tracker.snapshot(true);
        assert_eq!(snapshot.dirs_scanned, 1);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.total_items(), 1);
    }
}
