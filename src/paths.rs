//! Hierarchical task path handling.
//!
//! Task paths are pure strings of `/`-separated segments. This module:
//! - Collapses redundant separators and converts `\` to `/`
//! - Resolves `.` and `..` segments
//! - Sandboxes paths so `..` never climbs above the root
//! - Derives parents, ancestors and final segments
//!
//! No filesystem I/O is performed.

/// Canonicalize a task path.
///
/// The result has no leading or trailing separator and is idempotent:
/// `normalize(&normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                // Can't go above root, drop the segment
                segments.pop();
            }
            _ => segments.push(segment.trim()),
        }
    }

    segments.join("/")
}

/// Join `path` onto `base` and normalize the result.
///
/// An empty base leaves the (normalized) path unchanged.
pub fn join(base: &str, path: &str) -> String {
    if base.trim().is_empty() {
        normalize(path)
    } else {
        normalize(&format!("{}/{}", base, path))
    }
}

/// Resolve a path relative to an optional parent path.
pub fn resolve(parent: Option<&str>, path: &str) -> String {
    join(parent.unwrap_or(""), path)
}

/// Parent of a normalized path, or `None` for a single-segment path.
pub fn parent_path(path: &str) -> Option<String> {
    path.rfind('/').map(|idx| path[..idx].to_string())
}

/// Final segment of a normalized path.
pub fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Every proper ancestor of a normalized path, root first.
///
/// `"x/y/z"` yields `["x", "x/y"]`.
pub fn ancestors(path: &str) -> Vec<String> {
    path.match_indices('/')
        .map(|(idx, _)| path[..idx].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("a//b///c"), "a/b/c");
        assert_eq!(normalize("/a/b/"), "a/b");
        assert_eq!(normalize("a\\b\\c"), "a/b/c");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_resolves_relative_segments() {
        assert_eq!(normalize("a/./b"), "a/b");
        assert_eq!(normalize("a/b/../c"), "a/c");
        assert_eq!(normalize("./a"), "a");
    }

    #[test]
    fn test_normalize_does_not_escape_root() {
        assert_eq!(normalize("../a"), "a");
        assert_eq!(normalize("a/../../b"), "b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for p in ["a/b/c", "//a/./b/../c//", "x", "../y/z", "a\\b"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", p);
        }
    }

    #[test]
    fn test_join_with_empty_base() {
        assert_eq!(join("", "a/b"), "a/b");
        assert_eq!(resolve(None, "a/b"), "a/b");
        assert_eq!(resolve(Some(""), "a/b"), "a/b");
    }

    #[test]
    fn test_join_with_base() {
        assert_eq!(join("proj", "a/b"), "proj/a/b");
        assert_eq!(join("proj/", "/a"), "proj/a");
        assert_eq!(join("proj/sub", "../sibling"), "proj/sibling");
    }

    #[test]
    fn test_parent_and_last_segment() {
        assert_eq!(parent_path("a/b/c"), Some("a/b".to_string()));
        assert_eq!(parent_path("a"), None);
        assert_eq!(last_segment("a/b/c"), "c");
        assert_eq!(last_segment("a"), "a");
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("x/y/z"), vec!["x".to_string(), "x/y".to_string()]);
        assert!(ancestors("x").is_empty());
    }
}
