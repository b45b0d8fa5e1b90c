//! `[caching]` section configuration.
//!
//! Three independent policies, one per kind of response:
//!
//! ```toml
//! [caching.fragments]
//! private = true
//! max_age = 60
//!
//! [caching.static_routes]
//! max_age = 3600
//!
//! [caching.dynamic_routes]
//! no_store = true
//! ```

use serde::{Deserialize, Serialize};

/// Cache policies for every response kind the server produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    /// Dynamic fragment endpoint responses.
    pub fragments: CachingPolicy,
    /// Pre-rendered pages.
    pub static_routes: CachingPolicy,
    /// Action responses.
    pub dynamic_routes: CachingPolicy,
}

/// A single `Cache-Control` policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingPolicy {
    pub no_store: bool,
    pub private: bool,
    /// Seconds; `0` disables `max-age`.
    pub max_age: u64,
    pub no_cache: bool,
}

impl CachingPolicy {
    /// Render the `Cache-Control` header value.
    ///
    /// `no_store` wins over everything; `max_age` wins over `no_cache`.
    pub fn cache_control(&self) -> String {
        if self.no_store {
            return "no-store".to_string();
        }

        let mut header = String::from(if self.private { "private" } else { "public" });
        if self.max_age != 0 {
            header.push_str(&format!(", max-age={}, must-revalidate", self.max_age));
        } else if self.no_cache {
            header.push_str(", no-cache");
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_cache_control_rules() {
        let policy = |no_store, private, max_age, no_cache| CachingPolicy {
            no_store,
            private,
            max_age,
            no_cache,
        };

        assert_eq!(policy(true, true, 60, true).cache_control(), "no-store");
        assert_eq!(policy(false, false, 0, false).cache_control(), "public");
        assert_eq!(
            policy(false, true, 60, true).cache_control(),
            "private, max-age=60, must-revalidate"
        );
        assert_eq!(policy(false, false, 0, true).cache_control(), "public, no-cache");
    }

    #[test]
    fn test_caching_sections_parse() {
        let config = test_parse_config(
            "[caching.fragments]\nprivate = true\nmax_age = 30\n[caching.dynamic_routes]\nno_store = true",
        );
        assert!(config.caching.fragments.private);
        assert_eq!(config.caching.fragments.max_age, 30);
        assert!(config.caching.dynamic_routes.no_store);
        assert_eq!(config.caching.static_routes, CachingPolicy::default());
    }
}
