//! Excluded-path matching for the request gate.

/// Trailing marker that turns an excluded entry into a prefix match.
pub const WILDCARD: char = '*';

/// Decide whether `path` needs authentication.
///
/// A missing or empty path, or an empty exclusion list, always requires auth.
/// Comparison ignores trailing slashes on both sides. Entries ending in `*`
/// match by prefix; `"/api/v1/status/*"` covers `/api/v1/status` itself and
/// everything below it, while `"/api/v1/stat*"` is a plain string prefix.
#[must_use]
pub fn require_auth(path: Option<&str>, excluded_paths: &[String]) -> bool {
    let Some(path) = path.filter(|path| !path.is_empty()) else {
        return true;
    };
    if excluded_paths.is_empty() {
        return true;
    }

    let path = path.trim_end_matches('/');
    !excluded_paths
        .iter()
        .any(|excluded| is_excluded(path, excluded))
}

fn is_excluded(path: &str, excluded: &str) -> bool {
    if let Some(prefix) = excluded.strip_suffix(WILDCARD) {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.len() == prefix.len() {
            return path.starts_with(prefix);
        }
        return path == trimmed || path.starts_with(&format!("{trimmed}/"));
    }
    path == excluded.trim_end_matches('/')
}
