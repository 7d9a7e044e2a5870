//! rootcat - catalog registered root directories.
//!
//! Usage:
//!   rootcat root create PATH [--name NAME]   Register a root
//!   rootcat root get --name NAME | --path P  Show one root
//!   rootcat root list                        List registered roots
//!   rootcat root update ID [--name] [--path] Rename or repath a root
//!   rootcat root delete ID                   Remove a root and its records
//!   rootcat scan [PATH] [--all] [--persist]  Walk one path or every root
//!   rootcat --help                           Show help

mod logging;

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use rootcat_core::{CatalogConfig, FileEntry, Root, RootId, ScanStats};
use rootcat_scan::{AggregateScan, ScanAllOptions, ScanProgress, ScanResult, Walker, scan_all};
use rootcat_store::{Database, records, registry};

#[derive(Parser)]
#[command(
    name = "rootcat",
    version,
    about = "Catalog the files worth keeping track of inside registered root directories",
    long_about = "rootcat keeps a registry of root directories and walks them, skipping \
                  dependency folders, build output and media, to record file and folder \
                  metadata in a SQLite database."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage which directories may be scanned
    #[command(subcommand)]
    Root(RootCommand),

    /// Walk a directory, or every registered root, and report cataloged files
    Scan(ScanArgs),
}

#[derive(Subcommand)]
enum RootCommand {
    /// Register a new root directory
    Create {
        /// Path to the root directory
        path: PathBuf,

        /// Name for the root (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show a root by name or path
    Get {
        /// Name of the root
        #[arg(short, long)]
        name: Option<String>,

        /// Path of the root
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// List all registered roots
    List,

    /// Rename or repath a root
    Update {
        /// ID of the root to update
        id: i64,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New path
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Delete a root and every record scanned from it
    Delete {
        /// ID of the root to delete
        id: i64,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to walk (defaults to the current directory)
    path: Option<PathBuf>,

    /// Walk every registered root instead of a single path
    #[arg(short, long)]
    all: bool,

    /// Write the results to the database
    #[arg(long)]
    persist: bool,

    /// Print the scanned entries as JSON
    #[arg(long)]
    json: bool,

    /// Only catalog files in directories matching these globs
    #[arg(short, long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Enable the special-include gate
    #[arg(long)]
    special_includes: bool,

    /// Skip files of this size or larger (e.g. "512KB", "10MB")
    #[arg(long, value_name = "SIZE")]
    max_size: Option<String>,

    /// Number of roots walked at once (0 = number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let mut config = CatalogConfig::load(cli.config.as_deref()).context("Invalid configuration")?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    match cli.command {
        Command::Root(command) => {
            let db = Database::init(&config).context("Failed to open database")?;
            run_root(&db, command)?;
            db.shutdown()?;
        }
        Command::Scan(args) => {
            apply_scan_overrides(&mut config, &args)?;
            run_scan(&config, &args)?;
        }
    }

    Ok(())
}

/// Run a registry subcommand.
fn run_root(db: &Database, command: RootCommand) -> Result<()> {
    let conn = db.connection();

    match command {
        RootCommand::Create { path, name } => {
            let root = registry::register(conn, &path, non_empty(name.as_deref()))
                .context("Error creating root")?;
            println!(
                "Successfully created root: {} at {} (ID: {})",
                root.name,
                root.path.display(),
                root.id
            );
        }
        RootCommand::Get { name, path } => {
            let root = registry::lookup(conn, non_empty(name.as_deref()), path.as_deref())
                .context("Error getting root")?;
            println!("Found root:");
            println!("  ID: {}", root.id);
            println!("  Name: {}", root.name);
            println!("  Path: {}", root.path.display());
            println!("  Created At: {}", root.created_at);
            println!("  Updated At: {}", root.updated_at);
        }
        RootCommand::List => {
            let roots = registry::list(conn).context("Error listing roots")?;
            if roots.is_empty() {
                println!("No roots found.");
                return Ok(());
            }
            println!("Registered Roots:");
            for root in roots {
                println!(
                    "  ID: {} | Name: '{}' | Path: '{}'",
                    root.id,
                    root.name,
                    root.path.display()
                );
            }
        }
        RootCommand::Update { id, name, path } => {
            let root = registry::rename_or_repath(
                conn,
                RootId::new(id),
                non_empty(name.as_deref()),
                path.as_deref(),
            )
            .context("Error updating root")?;
            println!(
                "Successfully updated root (ID: {}): {} at {}",
                root.id,
                root.name,
                root.path.display()
            );
        }
        RootCommand::Delete { id } => {
            registry::remove(conn, RootId::new(id)).context("Error deleting root")?;
            println!("Successfully deleted root with ID: {id}");
        }
    }

    Ok(())
}

/// Fold per-invocation flags into the loaded configuration.
fn apply_scan_overrides(config: &mut CatalogConfig, args: &ScanArgs) -> Result<()> {
    if !args.include.is_empty() {
        config.filter.include_patterns = args.include.clone();
    }
    if args.special_includes {
        config.filter.use_special_includes = true;
    }
    if let Some(size) = &args.max_size {
        let bytes = parse_size(size)?;
        if bytes == 0 {
            bail!("--max-size must be greater than zero");
        }
        config.filter.max_file_size = bytes;
    }
    if let Some(jobs) = args.jobs {
        config.concurrency = jobs;
    }
    Ok(())
}

/// Walk one path or every registered root.
fn run_scan(config: &CatalogConfig, args: &ScanArgs) -> Result<()> {
    let walker = Walker::new(&config.filter).context("Invalid filter configuration")?;
    cancel_on_interrupt(&walker)?;
    let reporter = spawn_progress_logger(&walker);

    let result = if args.all {
        scan_all_roots(config, args, &walker)
    } else {
        let path = args.path.clone().unwrap_or_else(|| PathBuf::from("."));
        scan_single(config, args, &walker, &path)
    };

    drop(walker);
    let _ = reporter.join();
    result
}

/// Cancel the walk on Ctrl-C; partial results are reported, not persisted.
fn cancel_on_interrupt(walker: &Walker) -> Result<()> {
    let token = walker.cancellation_token().clone();
    ctrlc::set_handler(move || {
        warn!("Received Ctrl+C, cancelling scan...");
        token.cancel();
    })
    .context("Failed to install Ctrl+C handler")
}

fn scan_single(config: &CatalogConfig, args: &ScanArgs, walker: &Walker, path: &Path) -> Result<()> {
    // Resolve the registered root before walking so an unknown path fails fast
    let target = if args.persist {
        let db = Database::init(config).context("Failed to open database")?;
        let root = registry::lookup(db.connection(), None, Some(path))
            .context("Only registered roots can be persisted")?;
        Some((db, root))
    } else {
        None
    };

    eprintln!("Scanning {}...", path.display());

    let scan = walker.scan_to_end(path).context("Scan failed")?;
    print_warnings(scan.outcome.warnings.len());

    if let Some((db, root)) = target {
        if scan.outcome.cancelled {
            warn!(root = %root.name, "walk cancelled, not persisted");
        } else {
            persist_single(&db, &root, &scan)?;
        }
        db.shutdown()?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scan.files)?);
    } else {
        print_files(&scan.files);
        print_summary(
            &scan.outcome.stats,
            scan.outcome.folders.len(),
            scan.outcome.duration.as_secs_f64(),
        );
    }

    if scan.outcome.cancelled {
        bail!("Scan of {} was cancelled", scan.outcome.root.display());
    }
    Ok(())
}

/// Record a single-path walk against its registered root.
fn persist_single(db: &Database, root: &Root, scan: &ScanResult) -> Result<()> {
    let summary = records::record_scan(
        db.connection(),
        root.id,
        &scan.files,
        &scan.outcome.folders,
    )
    .with_context(|| format!("Failed to persist root '{}'", root.name))?;
    info!(root = %root.name, files = summary.files, folders = summary.folders, "persisted scan");
    Ok(())
}

fn scan_all_roots(config: &CatalogConfig, args: &ScanArgs, walker: &Walker) -> Result<()> {
    let db = Database::init(config).context("Failed to open database")?;
    let options = ScanAllOptions {
        path: args.path.clone(),
        concurrency: config.concurrency,
    };

    let started = Instant::now();
    let scan = scan_all(&db, walker, &options).context("Error scanning roots")?;
    let elapsed = started.elapsed().as_secs_f64();
    if scan.is_empty() {
        eprintln!("No roots found.");
    }
    print_warnings(scan.warnings().count());

    if args.persist {
        persist_all(&db, &scan)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
    } else {
        for root in &scan.roots {
            println!("{} ({})", root.root.name, root.root.path.display());
            print_files(&root.files);
        }
        let stats = scan.stats();
        let folders = scan.roots.iter().map(|r| r.folders.len()).sum();
        print_summary(&stats, folders, elapsed);
    }

    db.shutdown()?;
    if scan.cancelled() {
        bail!("Scan was cancelled");
    }
    Ok(())
}

/// Write each completed walk in its own transaction.
fn persist_all(db: &Database, scan: &AggregateScan) -> Result<()> {
    for root in &scan.roots {
        if root.cancelled {
            warn!(root = %root.root.name, "walk cancelled, not persisted");
            continue;
        }
        let summary =
            records::record_scan(db.connection(), root.root.id, &root.files, &root.folders)
                .with_context(|| format!("Failed to persist root '{}'", root.root.name))?;
        info!(root = %root.root.name, files = summary.files, folders = summary.folders, "persisted scan");
    }
    Ok(())
}

/// Log progress snapshots until every sender is gone.
fn spawn_progress_logger(walker: &Walker) -> JoinHandle<()> {
    let mut rx = walker.subscribe();
    std::thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(progress) => log_progress(&progress),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_progress(progress: &ScanProgress) {
    if progress.finished {
        info!(
            root = %progress.root.display(),
            files = progress.files_scanned,
            dirs = progress.dirs_scanned,
            elapsed_secs = progress.elapsed.as_secs_f64(),
            "walk complete"
        );
    } else {
        info!(
            root = %progress.root.display(),
            files = progress.files_scanned,
            files_per_sec = progress.files_per_second().round(),
            "scanning {}",
            progress.current_path.display()
        );
    }
}

fn print_files(files: &[FileEntry]) {
    for file in files {
        println!("  {:>10}  {}", format_size(file.size), file.path.display());
    }
}

fn print_summary(stats: &ScanStats, folders: usize, seconds: f64) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} files, {} folders, {}",
        stats.total_files,
        folders,
        format_size(stats.total_size)
    );
    println!(
        " {} pruned directories, {} filtered files, {} skipped entries",
        stats.pruned_dirs, stats.filtered_files, stats.skipped_entries
    );
    if seconds > 0.0 {
        println!(" Scanned in {seconds:.2}s");
    }
    println!("{}", "─".repeat(60));
}

fn print_warnings(count: usize) {
    if count > 0 {
        eprintln!("{count} warning(s) during scan");
    }
}

/// Treat an empty flag value as absent.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "512", "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let unit = &s[digits.len()..];

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return Err(eyre!("Unknown size unit in '{s}'")),
    };
    let num: f64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid size '{s}'"))?;

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("10mb").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1.5K").unwrap(), 1536);
        assert!(parse_size("ten").is_err());
        assert!(parse_size("5XB").is_err());
    }

    #[test]
    fn test_cli_parses_scan_flags() {
        let cli = Cli::try_parse_from([
            "rootcat",
            "scan",
            "--all",
            "--persist",
            "-i",
            "**/docs",
            "--include",
            "**/src",
            "--max-size",
            "1MB",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(args.all);
        assert!(args.persist);
        assert_eq!(args.include, vec!["**/docs", "**/src"]);

        let mut config = CatalogConfig::default();
        apply_scan_overrides(&mut config, &args).unwrap();
        assert_eq!(config.filter.max_file_size, 1024 * 1024);
        assert_eq!(config.filter.include_patterns.len(), 2);
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let cli = Cli::try_parse_from(["rootcat", "scan", "--max-size", "0"]).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let mut config = CatalogConfig::default();
        assert!(apply_scan_overrides(&mut config, &args).is_err());
    }

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        args
    }

    fn temp_config(data: &Path) -> CatalogConfig {
        CatalogConfig {
            database: Some(data.join("catalog.db")),
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn test_persist_requires_registered_root_before_walking() {
        let data = tempfile::TempDir::new().unwrap();
        let tree = tempfile::TempDir::new().unwrap();
        std::fs::write(tree.path().join("main.rs"), "fn main() {}").unwrap();
        let config = temp_config(data.path());

        let walker = Walker::new(&config.filter).unwrap();
        let mut rx = walker.subscribe();
        let args = scan_args(&["rootcat", "scan", "--persist"]);

        let err = scan_single(&config, &args, &walker, tree.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Only registered roots can be persisted"));
        // No walk started, so no progress was published
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancelled_scan_fails_without_persisting() {
        let data = tempfile::TempDir::new().unwrap();
        let tree = tempfile::TempDir::new().unwrap();
        std::fs::write(tree.path().join("main.rs"), "fn main() {}").unwrap();
        let config = temp_config(data.path());

        let db = Database::init(&config).unwrap();
        let root = registry::register(db.connection(), tree.path(), Some("proj")).unwrap();
        db.shutdown().unwrap();

        let walker = Walker::new(&config.filter).unwrap();
        walker.cancellation_token().cancel();
        let args = scan_args(&["rootcat", "scan", "--persist"]);

        let err = scan_single(&config, &args, &walker, tree.path()).unwrap_err();
        assert!(err.to_string().contains("was cancelled"));

        let db = Database::init(&config).unwrap();
        assert_eq!(records::count_files(db.connection(), root.id).unwrap(), 0);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("docs")), Some("docs"));
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(None), None);
    }
}
