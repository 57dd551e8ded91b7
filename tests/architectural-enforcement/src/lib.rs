//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in the board core; timing belongs to the scheduler
//! - No blocking file, network or process I/O in the board core
//! - No `unwrap()`/`expect()` in production code
//!
//! Sources are scanned as text. Everything from the first `#[cfg(test)]` on
//! is treated as test code and skipped, as are comment lines.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Calls that block a thread or touch the outside world
pub const BLOCKING_PATTERNS: &[&str] = &[
    "thread::sleep",
    "std::fs",
    "std::net",
    "std::process",
    "tokio::fs",
];

/// Calls that panic on `None`/`Err`
pub const PANICKING_PATTERNS: &[&str] = &[".unwrap()", ".expect("];

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the match
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The pattern that matched
    pub pattern: &'static str,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: `{}` in `{}`",
            self.path.display(),
            self.line,
            self.pattern,
            self.text
        )
    }
}

/// Root of the workspace this crate lives in
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir`, sorted
#[must_use]
pub fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .collect();
    files.sort();
    files
}

/// The part of `source` before its test module
#[must_use]
pub fn production_code(source: &str) -> &str {
    source
        .find("#[cfg(test)]")
        .map_or(source, |end| &source[..end])
}

/// Find `patterns` in the production code of `source`
#[must_use]
pub fn find_violations(path: &Path, source: &str, patterns: &[&'static str]) -> Vec<Violation> {
    production_code(source)
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .flat_map(|(index, line)| {
            patterns
                .iter()
                .filter(move |pattern| line.contains(**pattern))
                .map(move |pattern| Violation {
                    path: path.to_path_buf(),
                    line: index + 1,
                    pattern: *pattern,
                    text: line.trim().to_string(),
                })
        })
        .collect()
}

/// Scan every source file under `dir`
///
/// # Errors
///
/// Returns the I/O error of the first file that cannot be read.
pub fn scan_dir(dir: &Path, patterns: &[&'static str]) -> std::io::Result<Vec<Violation>> {
    let mut violations = Vec::new();
    for path in rust_sources(dir) {
        let source = std::fs::read_to_string(&path)?;
        violations.extend(find_violations(&path, &source, patterns));
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_code_stops_at_tests() {
        let source = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n";
        assert_eq!(production_code(source), "fn a() {}\n");
        assert!(find_violations(Path::new("a.rs"), source, PANICKING_PATTERNS).is_empty());
    }

    #[test]
    fn test_find_violations_reports_lines() {
        let source = "fn a() {\n    // std::thread::sleep is banned\n    std::thread::sleep(d);\n}\n";
        let found = find_violations(Path::new("a.rs"), source, BLOCKING_PATTERNS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 3);
        assert_eq!(found[0].pattern, "thread::sleep");
        assert_eq!(found[0].to_string(), "a.rs:3: `thread::sleep` in `std::thread::sleep(d);`");
    }
}
