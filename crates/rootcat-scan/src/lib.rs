//! Filtered directory walking for rootcat.
//!
//! # Overview
//!
//! `rootcat-scan` walks registered roots and produces the file and folder
//! entries that end up in the catalog. Key features:
//!
//! - **Pruning** of denied directories before descent
//! - **Lazy output** in name-sorted, depth-first order
//! - **Progress updates** via broadcast channels
//! - **Cooperative cancellation** via a `CancellationToken`
//! - **Multi-root scans** on a bounded rayon pool
//!
//! # Example
//!
//! ```rust,no_run
//! use rootcat_scan::{FilterConfig, Walker};
//!
//! let walker = Walker::new(&FilterConfig::default()).unwrap();
//! let mut files = walker.scan("/path/to/root").unwrap();
//!
//! for file in files.by_ref() {
//!     println!("{} ({} bytes)", file.path.display(), file.size);
//! }
//!
//! let outcome = files.into_outcome();
//! println!("Skipped: {}", outcome.stats.skipped_entries);
//! ```
//!
//! # Scanning every root
//!
//! ```rust,no_run
//! use rootcat_scan::{FilterConfig, ScanAllOptions, Walker, scan_all};
//!
//! let walker = Walker::new(&FilterConfig::default()).unwrap();
//! let roots: Vec<rootcat_scan::Root> = Vec::new();
//! let scan = scan_all(&roots, &walker, &ScanAllOptions::default()).unwrap();
//! assert!(scan.is_empty());
//! ```

mod aggregate;
mod progress;
mod walker;

pub use aggregate::{AggregateScan, RootScan, RootSource, ScanAllError, ScanAllOptions, scan_all};
pub use progress::ScanProgress;
pub use walker::{ScanIter, ScanOutcome, ScanResult, Walker};

// Re-export core types for convenience
pub use rootcat_core::{
    FileEntry, FilterConfig, FilterEngine, FolderEntry, Root, RootId, ScanError, ScanStats,
    ScanWarning, WarningKind,
};
