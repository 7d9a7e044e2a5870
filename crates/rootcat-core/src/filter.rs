//! Inclusion and exclusion policy.
//!
//! Every decision here is pure: the engine never touches the filesystem.
//! The walker asks it which directories to prune, which directories have
//! their files admitted, and which files are worth cataloging.

use std::collections::HashSet;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::FilterConfig;
use crate::error::FilterError;
use crate::record::extension_of;

/// A compiled list of glob patterns matched against whole paths.
///
/// `*` crosses path separators, so `**/.github/*` also matches files in
/// nested folders below `.github`.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compile a list of patterns. Matching is case-sensitive.
    pub fn new(patterns: &[String]) -> Result<Self, FilterError> {
        Ok(Self {
            patterns: patterns.to_vec(),
            set: build_set(patterns, false)?,
        })
    }

    /// Check if no patterns were supplied.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if `path` matches any pattern.
    pub fn is_match(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

/// Glob-match `path` against a caller-supplied set of override patterns.
pub fn path_matches_override(path: &Path, patterns: &PatternSet) -> bool {
    patterns.is_match(path)
}

fn build_set(patterns: &[String], case_insensitive: bool) -> Result<GlobSet, FilterError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| FilterError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Directory prefixes of each pattern that a match could lie beneath.
///
/// `**/vendor/keep` yields `**/vendor`. Prefixes made only of wildcards
/// would match every directory and are dropped.
fn ancestor_patterns(patterns: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for pattern in patterns {
        let parts: Vec<&str> = pattern.split('/').collect();
        for end in 1..parts.len() {
            let prefix = &parts[..end];
            if prefix.iter().all(|p| matches!(*p, "" | "*" | "**")) {
                continue;
            }
            let joined = prefix.join("/");
            if !out.contains(&joined) {
                out.push(joined);
            }
        }
    }
    out
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Decision logic built once from a [`FilterConfig`].
#[derive(Debug, Clone)]
pub struct FilterEngine {
    prune: GlobSet,
    target_extensions: HashSet<String>,
    ignore_extensions: HashSet<String>,
    extensionless_names: HashSet<String>,
    marker_subtrees: Vec<Vec<String>>,
    include: PatternSet,
    special: Option<PatternSet>,
    readmit_ancestors: GlobSet,
    max_file_size: u64,
}

impl FilterEngine {
    /// Compile the engine from configuration.
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        if config.max_file_size == 0 {
            return Err(FilterError::InvalidConfig {
                message: "max_file_size must be greater than zero".to_string(),
            });
        }

        let special = if config.use_special_includes {
            Some(PatternSet::new(&config.special_includes)?)
        } else {
            None
        };

        let mut readmit = ancestor_patterns(&config.include_patterns);
        if let Some(special) = &special {
            for pattern in ancestor_patterns(special.patterns()) {
                if !readmit.contains(&pattern) {
                    readmit.push(pattern);
                }
            }
        }

        Ok(Self {
            prune: build_set(&config.ignore_dirs, true)?,
            target_extensions: config
                .target_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            ignore_extensions: config
                .ignore_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            extensionless_names: config
                .extensionless_names
                .iter()
                .map(|n| n.to_lowercase())
                .collect(),
            marker_subtrees: config
                .marker_subtrees
                .iter()
                .map(|m| {
                    m.split('/')
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|components| !components.is_empty())
                .collect(),
            include: PatternSet::new(&config.include_patterns)?,
            special,
            readmit_ancestors: build_set(&readmit, false)?,
            max_file_size: config.max_file_size,
        })
    }

    /// Case-insensitive glob match of a bare directory name against the denylist.
    pub fn should_prune_directory(&self, name: &str) -> bool {
        self.prune.is_match(name)
    }

    /// Decide whether a child directory is descended into.
    ///
    /// Denied names are pruned unless an override-include or active
    /// special-include pattern matches the full path, or could match
    /// something beneath it.
    pub fn should_descend(&self, name: &str, path: &Path) -> bool {
        if !self.should_prune_directory(name) {
            return true;
        }
        if path_matches_override(path, &self.include) || self.readmit_ancestors.is_match(path) {
            return true;
        }
        self.special
            .as_ref()
            .is_some_and(|special| path_matches_override(path, special))
    }

    /// Override-include gate for the files directly inside `dir`.
    ///
    /// With no override patterns every directory passes.
    pub fn admits_directory(&self, dir: &Path) -> bool {
        self.include.is_empty() || path_matches_override(dir, &self.include)
    }

    /// Special-include gate, applied after the override gate.
    ///
    /// Passes when the gate is inactive, or when the containing directory or
    /// the file itself matches a special pattern.
    pub fn admits_special(&self, dir: &Path, file: &Path) -> bool {
        match &self.special {
            None => true,
            Some(special) => special.is_match(dir) || special.is_match(file),
        }
    }

    /// Classify a file by name and extension.
    ///
    /// The extension denylist takes precedence over the allowlist.
    pub fn should_include_file(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        if ext.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            return self.extensionless_names.contains(&name) || self.under_marker(path);
        }

        if self.ignore_extensions.contains(ext.as_str()) {
            return false;
        }
        self.target_extensions.contains(ext.as_str())
    }

    /// Check the size ceiling: sizes strictly below the ceiling pass.
    pub fn passes_size_ceiling(&self, size: u64) -> bool {
        size < self.max_file_size
    }

    /// The configured size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Check if the file lies beneath one of the marker subtrees.
    fn under_marker(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        let components: Vec<String> = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        self.marker_subtrees.iter().any(|marker| {
            components
                .windows(marker.len())
                .any(|window| window == marker.as_slice())
        })
    }
}
