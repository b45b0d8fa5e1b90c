use rustc_hash::FxHashSet;
use std::sync::Arc;

use super::{
    ActionError, PipelineReport,
    dispatch::{RequestScope, run_pipeline},
};
use crate::resource::RequestContext;
use crate::utils::{mime, route};

/// Handle a handler uses to inspect the request and shape the response.
///
/// Cheap to clone; clones share the same response.
#[derive(Clone)]
pub struct ActionContext {
    scope: Arc<RequestScope>,
}

impl ActionContext {
    pub(crate) fn new(scope: Arc<RequestScope>) -> Self {
        Self { scope }
    }

    /// Route, params and headers of the page that issued the action.
    pub fn request(&self) -> &RequestContext {
        &self.scope.request
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.scope.request.header(name)
    }

    /// Set the response status. A 4xx/5xx status skips island updates.
    pub fn set_status(&self, status: u16) {
        self.scope.writer.set_status(status);
    }

    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        self.scope.writer.set_header(name, value);
    }

    /// Replace the response with a complete body.
    pub fn respond(
        &self,
        status: u16,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) -> Result<(), ActionError> {
        self.replace(status, Some(content_type), body.into())
    }

    /// Re-render the page the browser is showing.
    ///
    /// Answers `205 Reset Content` when that page is unknown.
    pub async fn reload(&self) -> Result<(), ActionError> {
        let current = self.scope.request.route().to_string();
        let page = (!current.is_empty())
            .then(|| self.scope.app.views().page_for_route(&current))
            .flatten();
        let Some(page) = page.cloned() else {
            return self.replace(205, None, Vec::new());
        };

        let ctx = RequestContext::new(current, self.scope.request.headers().to_vec())
            .with_route_params(page.route());
        let rendered = self.scope.app.render_page(&page, &ctx, None).await?;
        self.set_header("HX-Retarget", "body");
        self.replace(200, Some(mime::types::HTML), rendered.html.into_bytes())
    }

    /// Navigate the browser to `to`.
    ///
    /// Known pages are rendered in place and pushed to history; anything
    /// else is a `303 See Other`.
    pub async fn redirect(&self, to: &str) -> Result<(), ActionError> {
        let to = route::with_leading_slash(to);
        let Some(page) = self.scope.app.views().page_for_route(&to).cloned() else {
            self.set_header("Location", to);
            return self.replace(303, None, Vec::new());
        };

        let ctx = RequestContext::new(to.clone(), self.scope.request.headers().to_vec())
            .with_route_params(page.route());
        let rendered = self.scope.app.render_page(&page, &ctx, None).await?;
        self.set_header("HX-Push-Url", to);
        self.set_header("HX-Retarget", "body");
        self.replace(200, Some(mime::types::HTML), rendered.html.into_bytes())
    }

    /// Render and stream the given islands now.
    ///
    /// Islands already written in this request are skipped, and resources
    /// resolved here are reused by the update that follows the handler.
    pub async fn update_islands(&self, ids: &[&str]) -> Result<PipelineReport, ActionError> {
        let views = self.scope.app.views();
        let mut seen = FxHashSet::default();
        let mut islands = Vec::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) || self.scope.writer.is_updated(id) {
                continue;
            }
            let island = views
                .island(id)
                .ok_or_else(|| ActionError::NotFound(format!("island `{id}`")))?;
            if views.fragment(&island.fragment_id).is_none() {
                return Err(ActionError::NotFound(format!("fragment `{}`", island.fragment_id)));
            }
            islands.push(Arc::clone(island));
        }

        let report = run_pipeline(Arc::clone(&self.scope), islands).await;
        if report.resources_failed > 0 {
            return Err(anyhow::anyhow!("{} of {} resources failed", report.resources_failed, report.resources).into());
        }
        if report.render_failed > 0 {
            return Err(anyhow::anyhow!("{} islands failed to render", report.render_failed).into());
        }
        Ok(report)
    }

    /// Islands written so far.
    pub fn updated_islands(&self) -> Vec<String> {
        self.scope.writer.updated_islands()
    }

    fn replace(&self, status: u16, content_type: Option<&str>, body: Vec<u8>) -> Result<(), ActionError> {
        if self.scope.writer.respond(status, content_type, body) {
            Ok(())
        } else {
            Err(anyhow::anyhow!("islands were already streamed").into())
        }
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("route", &self.scope.request.route())
            .field("updated", &self.scope.writer.updated_islands())
            .finish()
    }
}
