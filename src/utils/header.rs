//! Request header helpers.

/// Island ids to refresh, `;`-delimited.
pub const ISLANDS_UPDATE: &str = "Hardwire-Islands-Update";
/// List item keys to patch, `;`-delimited. Absent means whole-island replace.
pub const DYNAMIC_LIST_PATCH: &str = "Hardwire-Dynamic-List-Patch";
/// `"true"` switches out-of-band swaps to the morph extension.
pub const HTMX_MORPH: &str = "Hardwire-Htmx-Morph";
/// Route pattern of the fragment being requested (e.g. `/product/:id`).
pub const DYNAMIC_FRAGMENT_REQUEST: &str = "Hardwire-Dynamic-Fragment-Request";
/// URL of the page the browser is currently showing.
pub const HX_CURRENT_URL: &str = "HX-Current-URL";
pub const HX_REQUEST: &str = "HX-Request";
pub const HX_BOOSTED: &str = "HX-Boosted";
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// Look up a header value by case-insensitive name.
pub fn get<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Split a `;`-delimited header value, dropping empty entries.
///
/// # Examples
///
/// - `"a;b;;c"` -> `["a", "b", "c"]`
/// - `""` -> `[]`
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check an `If-None-Match` value against a strong ETag.
///
/// Accepts `*`, comma-separated lists, weak validators and unquoted tags.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let bare = etag.trim_matches('"');
    if_none_match.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate == etag || candidate.trim_matches('"') == bare
    })
}

/// Check if a status code counts as a successful action (2xx or 3xx).
#[inline]
pub fn is_status_positive(status: u16) -> bool {
    (200..400).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_case_insensitive() {
        let headers = vec![("hx-current-url".to_string(), "/a".to_string())];
        assert_eq!(get(&headers, HX_CURRENT_URL), Some("/a"));
        assert_eq!(get(&headers, HX_REQUEST), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a;b;;c"), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
        assert_eq!(parse_list(" x ; y"), vec!["x", "y"]);
    }

    #[test]
    fn test_etag_matches() {
        let tag = "\"abc123\"";
        assert!(etag_matches("\"abc123\"", tag));
        assert!(etag_matches("abc123", tag));
        assert!(etag_matches("W/\"abc123\"", tag));
        assert!(etag_matches("\"zzz\", \"abc123\"", tag));
        assert!(etag_matches("*", tag));
        assert!(!etag_matches("\"other\"", tag));
    }

    #[test]
    fn test_status_positive() {
        assert!(is_status_positive(200));
        assert!(is_status_positive(303));
        assert!(!is_status_positive(404));
        assert!(!is_status_positive(500));
        assert!(!is_status_positive(101));
    }
}
