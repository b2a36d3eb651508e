//! Path prefix matching.
//!
//! A path `p` matches prefix `q` if `p == q` or `p` starts with `q + "/"`.
//! `/clientes/areas` therefore matches `/clientes/areas/12` but not
//! `/clientes/areasx`.

/// Checks if `path` matches `prefix`.
///
/// # Arguments
///
/// * `path` - The pathname being navigated to
/// * `prefix` - A policy prefix such as `/clientes/visitas`
///
/// # Returns
///
/// `true` on exact equality or when `path` continues with a `/` segment.
#[must_use]
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Checks if `path` matches any of `prefixes`.
#[must_use]
pub fn matches_any<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes
        .iter()
        .any(|prefix| matches_prefix(path, prefix.as_ref()))
}

/// Returns the first of `prefixes` matching `path`.
#[must_use]
pub fn first_match<'a, S: AsRef<str>>(path: &str, prefixes: &'a [S]) -> Option<&'a str> {
    prefixes
        .iter()
        .map(AsRef::as_ref)
        .find(|prefix| matches_prefix(path, prefix))
}
