//! Workspace policy checks for the board crates

use architectural_enforcement::{
    scan_dir, workspace_root, Violation, BLOCKING_PATTERNS, PANICKING_PATTERNS,
};

fn report(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Board core
// ============================================================================

#[test]
fn test_core_has_no_blocking_io() {
    let dir = workspace_root().join("board").join("core").join("src");
    assert!(dir.is_dir(), "missing {}", dir.display());

    let violations = scan_dir(&dir, BLOCKING_PATTERNS).unwrap();
    assert!(
        violations.is_empty(),
        "blocking calls in board core:\n{}",
        report(&violations)
    );
}

#[test]
fn test_core_does_not_panic_on_errors() {
    let dir = workspace_root().join("board").join("core").join("src");
    let violations = scan_dir(&dir, PANICKING_PATTERNS).unwrap();
    assert!(
        violations.is_empty(),
        "unwrap/expect in board core:\n{}",
        report(&violations)
    );
}

// ============================================================================
// Board console
// ============================================================================

#[test]
fn test_console_does_not_panic_on_errors() {
    let dir = workspace_root().join("board").join("console").join("src");
    assert!(dir.is_dir(), "missing {}", dir.display());

    let violations = scan_dir(&dir, PANICKING_PATTERNS).unwrap();
    assert!(
        violations.is_empty(),
        "unwrap/expect in board console:\n{}",
        report(&violations)
    );
}
