//! Integration tests for walking and multi-root aggregation.

use std::fs;
use std::path::Path;

use chrono::Utc;
use rootcat_scan::*;
use tempfile::TempDir;

fn root(id: i64, name: &str, path: &Path) -> Root {
    let now = Utc::now();
    Root {
        id: RootId::new(id),
        name: name.to_string(),
        path: path.to_path_buf(),
        created_at: now,
        updated_at: now,
    }
}

fn project(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("node_modules/left-pad")).unwrap();
    fs::write(dir.join("Cargo.toml"), "[package]\n").unwrap();
    fs::write(dir.join("src/lib.rs"), "pub fn f() {}\n").unwrap();
    fs::write(dir.join("node_modules/left-pad/index.js"), "module.exports = 0").unwrap();
}

#[test]
fn test_scan_is_idempotent() {
    let temp = TempDir::new().unwrap();
    project(temp.path());
    let walker = Walker::new(&FilterConfig::default()).unwrap();

    let first = walker.scan_to_end(temp.path()).unwrap();
    let second = walker.scan_to_end(temp.path()).unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(first.outcome.folders, second.outcome.folders);
}

#[test]
fn test_size_ceiling_boundary() {
    let temp = TempDir::new().unwrap();
    let ceiling = 10 * 1024 * 1024;

    fs::File::create(temp.path().join("at_limit.txt"))
        .unwrap()
        .set_len(ceiling)
        .unwrap();
    fs::File::create(temp.path().join("below_limit.txt"))
        .unwrap()
        .set_len(ceiling - 1)
        .unwrap();
    fs::File::create(temp.path().join("photo.JPG"))
        .unwrap()
        .set_len(ceiling)
        .unwrap();

    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["below_limit.txt"]);
    assert_eq!(result.files[0].size, ceiling - 1);
    assert_eq!(result.outcome.stats.filtered_files, 2);
}

#[test]
fn test_denylisted_extension_wins() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("archive.zip"), "PK").unwrap();
    fs::write(temp.path().join("notes.txt"), "x").unwrap();

    let config = FilterConfig::builder()
        .target_extensions(vec![".zip".to_string(), ".txt".to_string()])
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["notes.txt"]);
}

#[test]
fn test_override_gate_limits_files_but_not_descent() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    fs::create_dir_all(base.join("docs/api")).unwrap();
    fs::create_dir_all(base.join("src")).unwrap();
    fs::write(base.join("top.md"), "top").unwrap();
    fs::write(base.join("docs/guide.md"), "guide").unwrap();
    fs::write(base.join("docs/api/ref.md"), "ref").unwrap();
    fs::write(base.join("src/main.rs"), "fn main() {}").unwrap();

    let config = FilterConfig::builder()
        .include_patterns(vec!["**/docs".to_string()])
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(&base).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["guide.md"]);

    // Directories outside the gate are still visited
    assert!(result.outcome.folders.iter().any(|f| f.name.as_str() == "api"));
    assert!(result.outcome.folders.iter().any(|f| f.name.as_str() == "src"));
}

#[test]
fn test_override_readmits_pruned_directory() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("vendor")).unwrap();
    fs::write(temp.path().join("vendor/lib.rs"), "// vendored").unwrap();

    let default_walker = Walker::new(&FilterConfig::default()).unwrap();
    assert!(default_walker.scan_to_end(temp.path()).unwrap().files.is_empty());

    let config = FilterConfig::builder()
        .include_patterns(vec!["**/vendor".to_string()])
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].name.as_str(), "lib.rs");
}

#[test]
fn test_special_includes_gate() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".github/workflows")).unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join(".github/workflows/ci.yml"), "on: push").unwrap();
    fs::write(temp.path().join("docker-compose.yml"), "services: {}").unwrap();
    fs::write(temp.path().join("src/main.rs"), "fn main() {}").unwrap();

    let config = FilterConfig::builder()
        .use_special_includes(true)
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["ci.yml", "docker-compose.yml"]);
}

#[test]
fn test_special_include_reaches_into_pruned_directory() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".vscode")).unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join(".vscode/settings.json"), "{}").unwrap();
    fs::write(temp.path().join(".vscode/launch.json"), "{}").unwrap();
    fs::write(temp.path().join("src/main.rs"), "fn main() {}").unwrap();

    let config = FilterConfig::builder()
        .use_special_includes(true)
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["settings.json"]);
    assert_eq!(result.outcome.stats.pruned_dirs, 0);

    // Without the gate the directory stays pruned
    let default_walker = Walker::new(&FilterConfig::default()).unwrap();
    let result = default_walker.scan_to_end(temp.path()).unwrap();
    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main.rs"]);
    assert_eq!(result.outcome.stats.pruned_dirs, 1);
}

#[test]
fn test_override_reaches_below_pruned_directory() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("vendor/keep")).unwrap();
    fs::create_dir_all(temp.path().join("vendor/other")).unwrap();
    fs::write(temp.path().join("vendor/keep/lib.rs"), "// kept").unwrap();
    fs::write(temp.path().join("vendor/other/lib.rs"), "// dropped").unwrap();
    fs::write(temp.path().join("vendor/top.rs"), "// dropped").unwrap();

    let config = FilterConfig::builder()
        .include_patterns(vec!["**/vendor/keep".to_string()])
        .build()
        .unwrap();
    let walker = Walker::new(&config).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    assert_eq!(result.files.len(), 1);
    assert!(result.files[0].path.ends_with("vendor/keep/lib.rs"));
}

#[test]
fn test_marker_subtree_extensionless_files() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".dev/versions/tool")).unwrap();
    fs::write(temp.path().join(".dev/versions/tool/node"), "#!/bin/sh").unwrap();
    fs::write(temp.path().join("LICENSE"), "MIT").unwrap();

    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let result = walker.scan_to_end(temp.path()).unwrap();

    let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["node"]);
    assert_eq!(result.files[0].extension.as_str(), "");
}

#[test]
fn test_scan_all_with_zero_roots() {
    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let roots: Vec<Root> = Vec::new();

    let scan = scan_all(&roots, &walker, &ScanAllOptions::default()).unwrap();
    assert!(scan.is_empty());
    assert_eq!(scan.files().count(), 0);
}

#[test]
fn test_scan_all_rejects_path() {
    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let roots: Vec<Root> = Vec::new();
    let options = ScanAllOptions {
        path: Some("/somewhere".into()),
        concurrency: 1,
    };

    let err = scan_all(&roots, &walker, &options).unwrap_err();
    assert!(matches!(err, ScanAllError::InvalidArgument { .. }));
}

#[test]
fn test_scan_all_preserves_registry_order() {
    let temp = TempDir::new().unwrap();
    let alpha = temp.path().join("alpha");
    let beta = temp.path().join("beta");
    project(&alpha);
    project(&beta);
    fs::write(beta.join("extra.md"), "more").unwrap();

    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let roots = vec![root(1, "beta", &beta), root(2, "alpha", &alpha)];
    let options = ScanAllOptions {
        path: None,
        concurrency: 2,
    };

    let scan = scan_all(&roots, &walker, &options).unwrap();

    assert_eq!(scan.roots.len(), 2);
    assert_eq!(scan.roots[0].root.name, "beta");
    assert_eq!(scan.roots[1].root.name, "alpha");
    assert_eq!(scan.roots[0].files.len(), 3);
    assert_eq!(scan.roots[1].files.len(), 2);

    let names: Vec<&str> = scan.files().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Cargo.toml", "extra.md", "lib.rs", "Cargo.toml", "lib.rs"]
    );
    assert_eq!(scan.stats().total_files, 5);
    assert!(!scan.cancelled());
}

#[test]
fn test_scan_all_missing_root_is_a_warning() {
    let temp = TempDir::new().unwrap();
    let present = temp.path().join("present");
    project(&present);

    let walker = Walker::new(&FilterConfig::default()).unwrap();
    let roots = vec![
        root(1, "gone", &temp.path().join("gone")),
        root(2, "present", &present),
    ];

    let scan = scan_all(&roots, &walker, &ScanAllOptions::default()).unwrap();

    assert_eq!(scan.roots.len(), 2);
    assert!(scan.roots[0].files.is_empty());
    assert_eq!(scan.roots[0].warnings.len(), 1);
    assert_eq!(scan.roots[0].warnings[0].kind, WarningKind::RootUnavailable);
    assert_eq!(scan.roots[1].files.len(), 2);
}
