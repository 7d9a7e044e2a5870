//! Filter and catalog configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Files at or above this size are never cataloged by default (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Policy consumed by the filter engine.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct FilterConfig {
    /// Directory names (glob, case-insensitive) that are pruned before descent.
    #[builder(default = "default_ignore_dirs()")]
    pub ignore_dirs: Vec<String>,

    /// Extensions that are cataloged.
    #[builder(default = "default_target_extensions()")]
    pub target_extensions: Vec<String>,

    /// Extensions that are never cataloged, even when also targeted.
    #[builder(default = "default_ignore_extensions()")]
    pub ignore_extensions: Vec<String>,

    /// Extensionless file names that are cataloged (case-insensitive).
    #[builder(default = "default_extensionless_names()")]
    pub extensionless_names: Vec<String>,

    /// Subtrees (e.g. `.dev/versions`) whose extensionless files are cataloged.
    #[builder(default = "default_marker_subtrees()")]
    pub marker_subtrees: Vec<String>,

    /// Override-include globs. When non-empty, only files in matching
    /// directories are cataloged; matching directories are never pruned.
    #[builder(default)]
    pub include_patterns: Vec<String>,

    /// Special-include globs for conventionally ignored locations.
    #[builder(default = "default_special_includes()")]
    pub special_includes: Vec<String>,

    /// Whether the special-include gate is active.
    #[builder(default = "false")]
    pub use_special_includes: bool,

    /// Byte ceiling; files of this size or larger are skipped.
    #[builder(default = "DEFAULT_MAX_FILE_SIZE")]
    pub max_file_size: u64,
}

impl FilterConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_file_size == Some(0) {
            return Err("max_file_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl FilterConfig {
    /// Create a new filter config builder.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            target_extensions: default_target_extensions(),
            ignore_extensions: default_ignore_extensions(),
            extensionless_names: default_extensionless_names(),
            marker_subtrees: default_marker_subtrees(),
            include_patterns: Vec::new(),
            special_includes: default_special_includes(),
            use_special_includes: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_ignore_dirs() -> Vec<String> {
    strings(&[
        // Version control
        ".git",
        ".svn",
        ".hg",
        // Dependencies
        "node_modules",
        "bower_components",
        "vendor",
        "packages",
        // Python environments
        ".venv",
        "venv",
        ".virtualenv",
        "__pycache__",
        ".tox",
        ".pytest_cache",
        "site-packages",
        // Build outputs
        "dist",
        "build",
        "target",
        "out",
        "bin",
        "obj",
        // Editors
        ".vscode",
        ".idea",
        ".vs",
        // OS
        "AppData",
        "Application Data",
        "Local Settings",
        "Temp",
        "tmp",
        "$RECYCLE.BIN",
        "System Volume Information",
        // Caches and media
        ".cache",
        "cache",
        "Caches",
        "Downloads",
        "Music",
        "Videos",
        "Pictures",
    ])
}

fn default_target_extensions() -> Vec<String> {
    strings(&[
        // Code
        ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".cs", ".php", ".rb",
        ".go", ".rs", ".swift", ".kt", ".scala", ".sh", ".bash", ".ps1", ".cmd", ".bat",
        // Config and data
        ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".xml", ".csv", ".tsv",
        ".sql",
        // Databases
        ".db", ".sqlite", ".sqlite3", ".mdb",
        // Web
        ".html", ".htm", ".css", ".scss", ".sass", ".less",
        // Docs
        ".md", ".rst", ".txt", ".readme",
    ])
}

fn default_ignore_extensions() -> Vec<String> {
    strings(&[
        // Media and office documents
        ".mp4", ".avi", ".mkv", ".mov", ".mp3", ".wav", ".flac", ".m4a", ".jpg", ".jpeg", ".png",
        ".gif", ".bmp", ".tiff", ".webp", ".ico", ".pdf", ".doc", ".docx", ".ppt", ".pptx",
        ".xls", ".xlsx",
        // Archives
        ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
        // Binaries
        ".exe", ".msi", ".dll", ".so", ".dylib",
        // Logs and scratch
        ".log", ".bak", ".tmp", ".temp", ".cache",
    ])
}

fn default_extensionless_names() -> Vec<String> {
    strings(&[
        "dockerfile",
        "makefile",
        "rakefile",
        "gemfile",
        "procfile",
        ".env",
        ".gitignore",
        ".dockerignore",
        ".gitattributes",
    ])
}

fn default_marker_subtrees() -> Vec<String> {
    strings(&[".dev/versions"])
}

fn default_special_includes() -> Vec<String> {
    strings(&[
        "**/.dev/versions/*",
        "**/.github/workflows/*",
        "**/.vscode/settings.json",
        "**/.env*",
        "**/docker-compose*.yml",
        "**/Dockerfile*",
    ])
}

/// Top-level configuration for the catalog tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file. Defaults to the user data directory.
    pub database: Option<PathBuf>,

    /// Maximum number of roots walked at once (0 = number of CPUs).
    pub concurrency: usize,

    /// Inclusion/exclusion policy.
    pub filter: FilterConfig,
}

impl CatalogConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rootcat").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        Self::from_toml(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolved database path.
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rootcat")
                .join("rootcat.db")
        })
    }
}
