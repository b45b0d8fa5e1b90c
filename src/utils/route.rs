//! Route pattern utilities.
//!
//! Route patterns are URL paths whose segments may start with `:` to capture
//! a parameter, e.g. `/product/:id/:revision`.

use percent_encoding::percent_decode_str;
use rustc_hash::FxHashMap;
use url::Url;

/// Split a path into its non-empty segments.
///
/// # Examples
/// - `"/blog//post/"` -> `["blog", "post"]`
/// - `"/"` -> `[]`
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Check whether a concrete path matches a route pattern.
pub fn matches_route(pattern: &str, path: &str) -> bool {
    let pattern = path_segments(pattern);
    let path = path_segments(path);

    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| p.starts_with(':') || p == s)
}

/// Extract the path component from an absolute or root-relative URL.
///
/// Returns `None` for strings that are not URLs at all.
pub fn url_path(url: &str) -> Option<String> {
    let base = Url::parse("http://localhost").ok()?;
    let parsed = base.join(url).ok()?;
    Some(parsed.path().to_string())
}

/// Extract route parameters from a URL according to a pattern.
///
/// Matching stops at the first literal segment that differs; parameters
/// captured before that point are kept.
///
/// # Examples
/// - pattern `/product/:id/:revision`, url `/product/123/1`
///   -> `{id: "123", revision: "1"}`
pub fn parse_route_params(pattern: &str, url: &str) -> FxHashMap<String, String> {
    let mut params = FxHashMap::default();
    let Some(path) = url_path(url) else {
        return params;
    };

    for (segment, value) in path_segments(pattern).into_iter().zip(path_segments(&path)) {
        if let Some(name) = segment.strip_prefix(':') {
            let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
            params.insert(name.to_string(), value);
        } else if segment != value {
            break;
        }
    }

    params
}

/// Ensure a route starts with `/`.
#[inline]
pub fn with_leading_slash(route: &str) -> String {
    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{route}")
    }
}
