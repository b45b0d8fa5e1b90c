//! Renderable fragments.

use std::fmt;

use super::template::{Bindings, RenderError, Template};
use crate::resource::ResourceKey;

/// A renderable unit keyed by its id, served at its route.
pub trait Fragment: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Route pattern the fragment endpoint answers (may contain `:param`).
    fn route(&self) -> &str;

    /// Resources needed to render, in declaration order. Never empty.
    fn resource_keys(&self) -> &[ResourceKey];

    /// Render with the declared resources.
    fn build(&self, resources: &Bindings) -> Result<String, RenderError>;
}

/// Fragment compiled from a `*.template.html` file.
pub struct TemplateFragment {
    id: String,
    route: String,
    keys: Vec<ResourceKey>,
    template: Template,
}

impl TemplateFragment {
    pub fn new(
        id: impl Into<String>,
        route: impl Into<String>,
        keys: Vec<ResourceKey>,
        template: Template,
    ) -> Self {
        Self {
            id: id.into(),
            route: route.into(),
            keys,
            template,
        }
    }
}

impl Fragment for TemplateFragment {
    fn id(&self) -> &str {
        &self.id
    }

    fn route(&self) -> &str {
        &self.route
    }

    fn resource_keys(&self) -> &[ResourceKey] {
        &self.keys
    }

    fn build(&self, resources: &Bindings) -> Result<String, RenderError> {
        self.template.render(resources)
    }
}

impl fmt::Debug for TemplateFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateFragment")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("keys", &self.keys)
            .finish()
    }
}

/// Fragment rendered by a closure.
pub struct FnFragment<F> {
    id: String,
    route: String,
    keys: Vec<ResourceKey>,
    build: F,
}

impl<F> FnFragment<F>
where
    F: Fn(&Bindings) -> Result<String, RenderError> + Send + Sync + 'static,
{
    pub fn new(
        id: impl Into<String>,
        route: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<ResourceKey>>,
        build: F,
    ) -> Self {
        Self {
            id: id.into(),
            route: route.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            build,
        }
    }
}

impl<F> Fragment for FnFragment<F>
where
    F: Fn(&Bindings) -> Result<String, RenderError> + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn route(&self) -> &str {
        &self.route
    }

    fn resource_keys(&self) -> &[ResourceKey] {
        &self.keys
    }

    fn build(&self, resources: &Bindings) -> Result<String, RenderError> {
        (self.build)(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_template_fragment_builds() {
        let fragment = TemplateFragment::new(
            "f1",
            "/todos",
            vec!["todos".into()],
            Template::parse(r#"<div data-frag-url="/todos">{{ todos.count }}</div>"#).unwrap(),
        );
        let mut bindings = Bindings::default();
        bindings.insert("todos".into(), Arc::new(json!({ "count": 3 })));

        assert_eq!(fragment.resource_keys(), ["todos".to_string()]);
        assert_eq!(
            fragment.build(&bindings).unwrap(),
            r#"<div data-frag-url="/todos">3</div>"#
        );
    }

    #[test]
    fn test_fn_fragment() {
        let fragment = FnFragment::new("f2", "/x", ["a", "b"], |b: &Bindings| Ok(b.len().to_string()));
        assert_eq!(fragment.resource_keys().len(), 2);
        assert_eq!(fragment.build(&Bindings::default()).unwrap(), "0");
    }
}
