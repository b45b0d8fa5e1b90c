//! The assembled application: resources, views, actions and caching policy.
//!
//! Built once at startup by [`AppBuilder`], then shared read-only across
//! request threads behind an `Arc`.

use std::sync::Arc;
use thiserror::Error;

use crate::action::{ActionError, ActionHandler, ActionMethod, ActionRegistry};
use crate::config::{CachingConfig, ConfigDiagnostics, ConfigError, FieldPath, HardwireConfig};
use crate::resource::{RequestContext, Resource, ResourceError, ResourceKey, ResourceRegistry};
use crate::view::{Bindings, DeclaredAction, PageView, RenderError, RenderedPage, ViewLoader, ViewRegistry};

/// Failure producing a page or fragment body.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<ViewError> for ActionError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::Resource(err) => Self::Resource(err),
            ViewError::Render(err) => Self::Render(err),
        }
    }
}

#[derive(Debug)]
pub struct App {
    caching: CachingConfig,
    resources: ResourceRegistry,
    views: ViewRegistry,
    actions: ActionRegistry,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn caching(&self) -> &CachingConfig {
        &self.caching
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Resolve a dynamic page's resource (if any) and render it.
    ///
    /// Dynamic pages get no ETag when their policy is `no_store`.
    pub async fn render_page(
        &self,
        page: &PageView,
        ctx: &RequestContext,
        target: Option<&str>,
    ) -> Result<RenderedPage, ViewError> {
        let mut bindings = Bindings::default();
        if let Some(key) = page.resource_key() {
            let value = self.resources.resolve(ctx, key).await?;
            bindings.insert(key.to_string(), Arc::new(value));
        }
        let with_etag = !(page.is_dynamic() && self.caching.dynamic_routes.no_store);
        Ok(page.render(&bindings, target, with_etag)?)
    }
}

/// Collects registrations and validates them against each other.
#[derive(Default)]
pub struct AppBuilder {
    caching: CachingConfig,
    resources: ResourceRegistry,
    views: ViewRegistry,
    actions: ActionRegistry,
    declared_actions: Vec<DeclaredAction>,
    diagnostics: ConfigDiagnostics,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caching policy and views loaded from the configured directory.
    pub fn from_config(config: &HardwireConfig) -> Self {
        let loaded = ViewLoader::new(&config.views_dir, config.keep_extension).load();
        let mut builder = Self::new().caching(config.caching.clone()).views(loaded.registry);
        builder.declared_actions = loaded.declared_actions;
        builder.diagnostics.extend(loaded.diagnostics);
        builder
    }

    pub fn caching(mut self, caching: CachingConfig) -> Self {
        self.caching = caching;
        self
    }

    pub fn views(mut self, views: ViewRegistry) -> Self {
        self.views = views;
        self
    }

    /// Require an action to be registered before [`build`](Self::build).
    pub fn declare_action(mut self, declared: DeclaredAction) -> Self {
        self.declared_actions.push(declared);
        self
    }

    pub fn resource(mut self, key: impl Into<ResourceKey>, resource: impl Resource) -> Self {
        let key = key.into();
        if self.resources.contains(&key) {
            self.diagnostics.error(
                FieldPath::owned(format!("resources.{key}")),
                "resource registered twice",
            );
            return self;
        }
        self.resources.register(key, resource);
        self
    }

    pub fn action(
        mut self,
        resource: &str,
        name: &str,
        method: ActionMethod,
        handler: impl ActionHandler,
    ) -> Self {
        if !self.actions.register(resource, name, method, handler) {
            self.diagnostics.error(
                FieldPath::owned(format!("actions.{resource}.{name}")),
                format!("{method} handler registered twice"),
            );
        }
        self
    }

    /// Cross-check registrations and freeze the application.
    pub fn build(mut self) -> Result<Arc<App>, ConfigError> {
        self.validate();
        self.diagnostics.print_warnings();
        let Self {
            caching,
            resources,
            views,
            actions,
            diagnostics,
            ..
        } = self;
        diagnostics.into_result()?;

        Ok(Arc::new(App {
            caching,
            resources,
            views,
            actions,
        }))
    }

    fn validate(&mut self) {
        let diag = &mut self.diagnostics;

        for fragment in self.views.fragments() {
            for key in fragment.resource_keys() {
                if !self.resources.contains(key) {
                    diag.error_with_hint(
                        FieldPath::owned(format!("fragments.{}", fragment.id())),
                        format!("needs unregistered resource `{key}`"),
                        "register it with AppBuilder::resource or under [resources]",
                    );
                }
            }
        }

        for island in self.views.islands() {
            if self.views.fragment(&island.fragment_id).is_none() {
                diag.warn(
                    FieldPath::owned(format!("islands.{}", island.id)),
                    format!("fragment `{}` not found; updates will be skipped", island.fragment_id),
                );
            }
        }

        for action in self.actions.iter() {
            if !self.resources.contains(&action.resource) {
                diag.error(
                    FieldPath::owned(format!("actions.{}.{}", action.resource, action.name)),
                    format!("unknown resource `{}`", action.resource),
                );
            }
        }

        for declared in &self.declared_actions {
            let field = FieldPath::owned(format!("actions.{}.{}", declared.resource, declared.action));
            match ActionMethod::parse(&declared.method) {
                None => diag.error(field, format!("unsupported method `{}`", declared.method)),
                Some(method) if !self.actions.contains(&declared.resource, &declared.action, method) => {
                    diag.error_with_hint(
                        field,
                        format!("{method} action is used by the views but not registered"),
                        "register it with AppBuilder::action",
                    );
                }
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{NoPayload, from_fn};
    use crate::resource;
    use crate::view::{FnFragment, Island, IslandKind, PageKind, Template};
    use serde_json::json;

    fn views() -> ViewRegistry {
        let mut views = ViewRegistry::new();
        views.add_fragment(FnFragment::new("todos-list", "/todos/list", ["todos"], |_| {
            Ok(String::new())
        }));
        views.add_island(Island::new("todos", "todos-list", IslandKind::List));
        views
    }

    fn noop() -> impl ActionHandler {
        from_fn(|_: NoPayload, _ctx| async { Ok(()) })
    }

    #[test]
    fn test_build_valid_app() {
        let app = App::builder()
            .views(views())
            .resource("todos", resource::from_fn(|_| Ok(json!([]))))
            .action("todos", "add", ActionMethod::Post, noop())
            .build()
            .unwrap();
        assert_eq!(app.actions().len(), 1);
        assert!(app.resources().contains("todos"));
    }

    #[test]
    fn test_build_collects_all_problems() {
        let err = App::builder()
            .views(views())
            .action("users", "add", ActionMethod::Post, noop())
            .declare_action(DeclaredAction {
                resource: "todos".into(),
                action: "remove".into(),
                method: "DELETE".into(),
            })
            .build()
            .unwrap_err();
        match err {
            ConfigError::Diagnostics(diag) => assert_eq!(diag.errors().len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_dynamic_page() {
        let template = Template::parse("<h1>{{ user.name }}</h1>").unwrap();
        let page = PageView::new(
            "/users/:id",
            String::new(),
            PageKind::Dynamic {
                resource: "user".into(),
                template,
            },
        );
        let app = App::builder()
            .resource(
                "user",
                resource::from_fn(|ctx| Ok(json!({ "name": ctx.param("id").unwrap_or_default() }))),
            )
            .build()
            .unwrap();

        let ctx = RequestContext::new("/users/ada", Vec::new()).with_route_params(page.route());
        let rendered = app.render_page(&page, &ctx, None).await.unwrap();
        assert_eq!(rendered.html, "<h1>ada</h1>");
        assert!(rendered.etag.is_some());
    }
}
