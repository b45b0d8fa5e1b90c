//! JSON-file backed resource.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{RequestContext, Resource, ResourceError};

/// Re-reads a JSON document on every resolution, so edits to the file are
/// picked up by the next request.
#[derive(Debug, Clone)]
pub struct JsonFileResource {
    path: PathBuf,
}

impl JsonFileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Resource for JsonFileResource {
    async fn resolve(&self, _ctx: &RequestContext) -> Result<serde_json::Value, ResourceError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ResourceError::failed(format!("{}: {e}", path.display())))?;
            serde_json::from_str(&content)
                .map_err(|e| ResourceError::failed(format!("{}: {e}", path.display())))
        })
        .await
        .map_err(ResourceError::failed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_json_each_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todos.json");
        std::fs::write(&path, r#"[{"title":"a"}]"#).unwrap();

        let resource = JsonFileResource::new(&path);
        let ctx = RequestContext::default();
        assert_eq!(resource.resolve(&ctx).await.unwrap(), json!([{ "title": "a" }]));

        std::fs::write(&path, r#"[]"#).unwrap();
        assert_eq!(resource.resolve(&ctx).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_invalid_json_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{").unwrap();

        let err = JsonFileResource::new(&path)
            .resolve(&RequestContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Failed(_)));
    }
}
