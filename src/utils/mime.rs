//! MIME type constants for the responses this server produces.

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const FORM: &str = "application/x-www-form-urlencoded";
}

/// Check whether a `Content-Type` header value names a JSON body.
#[inline]
pub fn is_json(content_type: &str) -> bool {
    essence(content_type).eq_ignore_ascii_case(types::JSON)
        || essence(content_type).ends_with("+json")
}

/// Check whether a `Content-Type` header value names an url-encoded form.
#[inline]
pub fn is_form(content_type: &str) -> bool {
    essence(content_type).eq_ignore_ascii_case(types::FORM)
}

/// Media type without parameters (`text/html; charset=utf-8` -> `text/html`).
#[inline]
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}
