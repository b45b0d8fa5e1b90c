//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hardwire.toml`:
//!
//! | Module      | TOML Section         | Purpose                          |
//! |-------------|----------------------|----------------------------------|
//! | `caching`   | `[caching.*]`        | Cache-Control policies           |
//! | `resources` | `[resources.<key>]`  | File-backed resources (binary)   |
//! | `serve`     | `[serve]`            | HTTP server                      |

mod caching;
mod resources;
mod serve;

pub use caching::{CachingConfig, CachingPolicy};
pub use resources::{ResourceFileConfig, ResourcesConfig};
pub use serve::ServeConfig;
