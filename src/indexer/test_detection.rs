//! Test file detection
//!
//! Used to split the dependents of a file into regular importers and the test
//! files that exercise it.

/// Detects whether a root-relative path looks like a test file.
///
/// ## Detection rules
/// - Lives under a `test/`, `tests/`, `__tests__/`, `spec/` or `e2e/` directory
/// - File name contains `.test.` or `.spec.` (`routes.test.ts`, `db.spec.tsx`)
/// - File name ends with `_test` / `-test` before the extension
pub fn is_test_file(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    let in_test_dir = path_lower
        .split('/')
        .rev()
        .skip(1)
        .any(|dir| matches!(dir, "test" | "tests" | "__tests__" | "spec" | "e2e"));
    if in_test_dir {
        return true;
    }
    let file_name = path_lower.rsplit('/').next().unwrap_or(&path_lower);
    if file_name.contains(".test.") || file_name.contains(".spec.") {
        return true;
    }
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.ends_with("_test") || stem.ends_with("-test")
}
