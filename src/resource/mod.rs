//! Data resources: named asynchronous value producers.
//!
//! A [`Resource`] is registered under a [`ResourceKey`] once at startup and
//! resolved per request. Values are JSON so that fragments can render any of
//! them without knowing their Rust types.
//!
//! | Module     | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `context`  | Request-scoped data handed to resolvers         |
//! | `error`    | `ResourceError`                                 |
//! | `file`     | JSON-file backed resource (used by the binary)  |
//! | `ready`    | Per-request write-once resolved value map       |
//! | `registry` | Key -> resolver map                             |

mod context;
mod error;
mod file;
mod ready;
mod registry;

pub use context::RequestContext;
pub use error::ResourceError;
pub use file::JsonFileResource;
pub use ready::ReadyResources;
pub use registry::ResourceRegistry;

use async_trait::async_trait;
use std::sync::Arc;

/// Name of a data source.
pub type ResourceKey = String;

/// A resolved resource value, shared between every island that needs it.
pub type ResourceValue = Arc<serde_json::Value>;

/// Asynchronous producer of a resource value.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    async fn resolve(&self, ctx: &RequestContext) -> Result<serde_json::Value, ResourceError>;
}

/// Resource backed by a synchronous closure.
///
/// ```ignore
/// registry.register("user", from_fn(|ctx| {
///     let id = ctx.param("id").unwrap_or_default();
///     Ok(json!({ "id": id }))
/// }));
/// ```
pub struct FnResource<F>(F);

pub fn from_fn<F>(f: F) -> FnResource<F>
where
    F: Fn(&RequestContext) -> Result<serde_json::Value, ResourceError> + Send + Sync + 'static,
{
    FnResource(f)
}

#[async_trait]
impl<F> Resource for FnResource<F>
where
    F: Fn(&RequestContext) -> Result<serde_json::Value, ResourceError> + Send + Sync + 'static,
{
    async fn resolve(&self, ctx: &RequestContext) -> Result<serde_json::Value, ResourceError> {
        (self.0)(ctx)
    }
}
