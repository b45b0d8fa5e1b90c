//! Resource registry.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::{RequestContext, Resource, ResourceError, ResourceKey};

/// Exactly one resolver per key, fixed after startup.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    resources: FxHashMap<ResourceKey, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver, replacing any previous one under `key`.
    pub fn register(&mut self, key: impl Into<ResourceKey>, resource: impl Resource) {
        self.resources.insert(key.into(), Arc::new(resource));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.resources.keys()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up the resolver for `key`.
    pub fn get(&self, key: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(key).cloned()
    }

    /// Resolve `key` for one request.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        key: &str,
    ) -> Result<serde_json::Value, ResourceError> {
        let resource = self
            .get(key)
            .ok_or_else(|| ResourceError::NotFound(key.to_string()))?;
        resource.resolve(ctx).await
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.resources.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::from_fn;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_registered() {
        let mut registry = ResourceRegistry::new();
        registry.register(
            "user",
            from_fn(|ctx| Ok(json!({ "id": ctx.param("id") }))),
        );

        let ctx = RequestContext::new("/user/7", Vec::new()).with_route_params("/user/:id");
        let value = registry.resolve(&ctx, "user").await.unwrap();
        assert_eq!(value, json!({ "id": "7" }));
    }

    #[tokio::test]
    async fn test_resolve_missing_is_not_found() {
        let registry = ResourceRegistry::new();
        let err = registry
            .resolve(&RequestContext::default(), "nope")
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::NotFound("nope".into()));
    }
}
