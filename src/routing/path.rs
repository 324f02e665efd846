//! Path and query helpers shared by the proxy, the route table and the jail.

/// Join two path pieces with exactly one slash between them.
pub fn single_joining_slash(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');
    match (a_slash, b_slash) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Merge an origin's base query with the request query.
pub fn merge_query(base: &str, request: &str) -> String {
    if base.is_empty() || request.is_empty() {
        format!("{}{}", base, request)
    } else {
        format!("{}&{}", base, request)
    }
}

/// Whether `path` falls under `mount`.
///
/// Matching stops at segment boundaries: `/mnt/a` and `/mnt/a/` both cover
/// `/mnt/a` and `/mnt/a/x` but not `/mnt/ab`. The root mount covers everything.
pub fn mount_matches(mount: &str, path: &str) -> bool {
    if mount == "/" {
        return true;
    }
    let base = mount.trim_end_matches('/');
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Collapse trailing slashes to one; a mount of only slashes is the root.
pub fn normalize_mount(mount: &str) -> String {
    let base = mount.trim_end_matches('/');
    if base.is_empty() {
        "/".to_string()
    } else if base.len() < mount.len() {
        format!("{}/", base)
    } else {
        mount.to_string()
    }
}

/// What is left of `path` once the mount prefix is removed.
pub fn strip_mount<'a>(path: &'a str, mount: &str) -> &'a str {
    path.strip_prefix(mount)
        .or_else(|| path.strip_prefix(mount.trim_end_matches('/')))
        .unwrap_or("")
}
