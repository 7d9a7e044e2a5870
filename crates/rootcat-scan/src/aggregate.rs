//! Scanning every registered root.

use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use rootcat_core::{FileEntry, FolderEntry, Root, ScanStats, ScanWarning};

use crate::walker::Walker;

/// Anything that can enumerate registered roots in registry order.
pub trait RootSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All registered roots, ascending by id.
    fn list_roots(&self) -> Result<Vec<Root>, Self::Error>;
}

impl RootSource for [Root] {
    type Error = std::convert::Infallible;

    fn list_roots(&self) -> Result<Vec<Root>, Self::Error> {
        Ok(self.to_vec())
    }
}

impl RootSource for Vec<Root> {
    type Error = std::convert::Infallible;

    fn list_roots(&self) -> Result<Vec<Root>, Self::Error> {
        Ok(self.clone())
    }
}

/// Options for [`scan_all`].
#[derive(Debug, Clone, Default)]
pub struct ScanAllOptions {
    /// Must be `None`: a multi-root scan takes its paths from the registry.
    pub path: Option<PathBuf>,
    /// Maximum number of roots walked at once (0 = number of CPUs).
    pub concurrency: usize,
}

/// Errors that abort a multi-root scan.
#[derive(Debug, Error)]
pub enum ScanAllError<E: std::error::Error + 'static> {
    /// The options were contradictory.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The roots could not be listed.
    #[error("Failed to list roots: {0}")]
    Source(#[source] E),

    /// The worker pool could not be created.
    #[error("Failed to build scan pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// The result of walking one registered root.
#[derive(Debug, Clone, Serialize)]
pub struct RootScan {
    pub root: Root,
    pub files: Vec<FileEntry>,
    pub folders: Vec<FolderEntry>,
    pub warnings: Vec<ScanWarning>,
    pub stats: ScanStats,
    pub cancelled: bool,
}

/// Per-root results of a multi-root scan, in registry order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateScan {
    pub roots: Vec<RootScan>,
}

impl AggregateScan {
    /// Check if nothing was scanned.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// All cataloged files, grouped per root in registry order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.roots.iter().flat_map(|r| r.files.iter())
    }

    /// All warnings across roots.
    pub fn warnings(&self) -> impl Iterator<Item = &ScanWarning> {
        self.roots.iter().flat_map(|r| r.warnings.iter())
    }

    /// Combined statistics.
    pub fn stats(&self) -> ScanStats {
        let mut stats = ScanStats::new();
        for root in &self.roots {
            stats.merge(&root.stats);
        }
        stats
    }

    /// Whether any walk was cancelled.
    pub fn cancelled(&self) -> bool {
        self.roots.iter().any(|r| r.cancelled)
    }
}

/// Walk every root listed by `source` and concatenate the results.
///
/// Roots are walked in parallel, bounded by `options.concurrency`. A root
/// that can no longer be walked yields a `RootUnavailable` warning.
pub fn scan_all<S>(
    source: &S,
    walker: &Walker,
    options: &ScanAllOptions,
) -> Result<AggregateScan, ScanAllError<S::Error>>
where
    S: RootSource + ?Sized,
{
    if let Some(path) = &options.path {
        return Err(ScanAllError::InvalidArgument {
            message: format!(
                "a path ({}) cannot be combined with scanning all roots",
                path.display()
            ),
        });
    }

    let roots = source.list_roots().map_err(ScanAllError::Source)?;
    if roots.is_empty() {
        debug!("no roots registered");
        return Ok(AggregateScan::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.concurrency)
        .thread_name(|i| format!("rootcat-scan-{i}"))
        .build()?;

    let roots = pool.install(|| {
        roots
            .into_par_iter()
            .map(|root| scan_root(walker, root))
            .collect::<Vec<_>>()
    });

    Ok(AggregateScan { roots })
}

fn scan_root(walker: &Walker, root: Root) -> RootScan {
    debug!(root = %root.name, path = %root.path.display(), "scanning root");

    match walker.scan_to_end(&root.path) {
        Ok(result) => RootScan {
            root,
            files: result.files,
            folders: result.outcome.folders,
            warnings: result.outcome.warnings,
            stats: result.outcome.stats,
            cancelled: result.outcome.cancelled,
        },
        Err(err) => {
            warn!(root = %root.name, error = %err, "root unavailable");
            let warning = ScanWarning::root_unavailable(&root.path, &err);
            RootScan {
                root,
                files: Vec::new(),
                folders: Vec::new(),
                warnings: vec![warning],
                stats: ScanStats::new(),
                cancelled: false,
            }
        }
    }
}
