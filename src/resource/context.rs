//! Request-scoped context handed to resolvers.

use rustc_hash::FxHashMap;

use crate::utils::{header, route};

/// What a resolver may know about the request that needs it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    params: FxHashMap<String, String>,
    route: String,
    headers: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(route: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            params: FxHashMap::default(),
            route: route.into(),
            headers,
        }
    }

    /// Attach parameters extracted from `pattern` (e.g. `/product/:id`)
    /// matched against this context's route.
    pub fn with_route_params(mut self, pattern: &str) -> Self {
        self.params = route::parse_route_params(pattern, &self.route);
        self
    }

    /// Context derived from htmx request headers.
    ///
    /// The route is the path of the page the browser shows (`HX-Current-URL`).
    /// When the request names a fragment route pattern
    /// (`Hardwire-Dynamic-Fragment-Request`), its parameters are extracted
    /// from that page URL.
    pub fn from_headers(headers: Vec<(String, String)>) -> Self {
        let current = header::get(&headers, header::HX_CURRENT_URL).filter(|v| !v.is_empty());
        let route = current.and_then(route::url_path).unwrap_or_default();
        let params = match (header::get(&headers, header::DYNAMIC_FRAGMENT_REQUEST), current) {
            (Some(pattern), Some(current)) => route::parse_route_params(pattern, current),
            _ => FxHashMap::default(),
        };
        Self {
            params,
            route,
            headers,
        }
    }

    /// Route parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &FxHashMap<String, String> {
        &self.params
    }

    /// Path of the route the resource is resolved for.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Request header value (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        header::get(&self.headers, name)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}
