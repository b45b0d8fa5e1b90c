//! Page views: whole HTML documents served at a route.

use serde::Deserialize;

use super::template::{Bindings, RenderError, Template};
use crate::resource::ResourceKey;
use crate::utils::{
    hash,
    xml::{self, Rewrite},
};

/// Optional `<base>.meta.json` next to a page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageMeta {
    pub is_dynamic: bool,
    pub resource_name: Option<String>,
    pub should_redirect: bool,
    #[serde(rename = "redirectURL", alias = "redirectUrl")]
    pub redirect_url: Option<String>,
}

#[derive(Debug)]
pub enum PageKind {
    /// Served as stored.
    Static { etag: String },
    /// Rendered per request over one resource.
    Dynamic { resource: ResourceKey, template: Template },
    /// Permanent redirect.
    Redirect { to: String },
}

#[derive(Debug)]
pub struct PageView {
    route: String,
    title: Option<String>,
    html: String,
    kind: PageKind,
}

/// A page ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub etag: Option<String>,
    pub title: Option<String>,
}

impl PageView {
    pub fn new(route: impl Into<String>, html: String, kind: PageKind) -> Self {
        let title = extract_title(&html);
        Self {
            route: route.into(),
            title,
            html,
            kind,
        }
    }

    /// Static page whose ETag is computed from its content.
    pub fn from_static(route: impl Into<String>, html: String) -> Self {
        let etag = hash::etag(&html);
        Self::new(route, html, PageKind::Static { etag })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn kind(&self) -> &PageKind {
        &self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, PageKind::Dynamic { .. })
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match &self.kind {
            PageKind::Redirect { to } => Some(to),
            _ => None,
        }
    }

    /// Resource the page renders over, if dynamic.
    pub fn resource_key(&self) -> Option<&str> {
        match &self.kind {
            PageKind::Dynamic { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Produce the page, or the element with id `target` when it exists.
    ///
    /// `with_etag` controls whether dynamic output gets a content hash.
    pub fn render(
        &self,
        bindings: &Bindings,
        target: Option<&str>,
        with_etag: bool,
    ) -> Result<RenderedPage, RenderError> {
        let (html, etag) = match &self.kind {
            PageKind::Static { etag } => (self.html.clone(), Some(etag.clone())),
            PageKind::Dynamic { template, .. } => {
                let html = template.render(bindings)?;
                let etag = with_etag.then(|| hash::etag(&html));
                (html, etag)
            }
            PageKind::Redirect { .. } => (String::new(), None),
        };

        if let Some(id) = target
            && let Some(element) = element_by_id(&html, id)
        {
            let etag = etag.map(|_| hash::etag(&element));
            return Ok(RenderedPage {
                html: element,
                etag,
                title: self.title.clone(),
            });
        }

        Ok(RenderedPage {
            html,
            etag,
            title: self.title.clone(),
        })
    }
}

/// Text of the first `<title>` element.
fn extract_title(html: &str) -> Option<String> {
    let element = xml::extract_first(html, |s| xml::tag_name(s).eq_ignore_ascii_case("title"), &Rewrite::default())
        .ok()
        .flatten()?;
    let inner = element.split_once('>')?.1;
    let text = inner.rsplit_once("</").map_or(inner, |(text, _)| text).trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn element_by_id(html: &str, id: &str) -> Option<String> {
    xml::extract_first(
        html,
        |s| xml::attr_value(s, "id").as_deref() == Some(id),
        &Rewrite::default(),
    )
    .ok()
    .flatten()
}
