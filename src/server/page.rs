//! Page endpoint: `GET <page route>`.

use std::{io, sync::Arc};

use super::{ServerRequest, response};
use crate::action::{ResponseHead, ResponseSink};
use crate::app::{App, ViewError};
use crate::log;
use crate::resource::RequestContext;
use crate::utils::{header, mime::types};
use crate::view::{PageKind, PageView};

const HX_TARGET: &str = "HX-Target";
const DOCTYPE: &str = "<!DOCTYPE html>\n";

pub async fn respond(
    app: &Arc<App>,
    page: &Arc<PageView>,
    request: &ServerRequest,
    sink: &mut dyn ResponseSink,
) -> io::Result<u16> {
    if let PageKind::Redirect { to } = page.kind() {
        sink.send(&ResponseHead::new(301).with_header("Location", to.as_str()), &[])?;
        return Ok(301);
    }

    let target = request.header(HX_TARGET).filter(|t| !t.is_empty());
    let ctx = RequestContext::new(request.path(), request.headers.clone()).with_route_params(page.route());
    let rendered = match app.render_page(page, &ctx, target).await {
        Ok(rendered) => rendered,
        Err(ViewError::Resource(err)) => {
            log!("serve"; "page {}: {}", page.route(), err);
            return response::resource_error(sink, &request.headers, &err);
        }
        Err(ViewError::Render(err)) => {
            log!("serve"; "page {} failed to render: {}", page.route(), err);
            return response::send_text(sink, 500, "500 Internal Server Error");
        }
    };

    let caching = app.caching();
    let policy = if page.is_dynamic() {
        &caching.dynamic_routes
    } else {
        &caching.static_routes
    };
    let mut head = ResponseHead::new(200)
        .with_header("Content-Type", types::HTML)
        .with_header("Cache-Control", policy.cache_control())
        .with_header("Vary", HX_TARGET);

    if let Some(etag) = &rendered.etag {
        head.set_header("ETag", etag.as_str());
        if request
            .header(header::IF_NONE_MATCH)
            .is_some_and(|candidate| header::etag_matches(candidate, etag))
        {
            return response::not_modified(sink, head);
        }
    }

    let mut body = String::with_capacity(rendered.html.len() + DOCTYPE.len());
    if request.header(header::HX_BOOSTED).is_some() {
        if let Some(title) = &rendered.title {
            // already markup text, taken verbatim from the page
            body.push_str(&format!("<title>{title}</title>\n\n"));
        }
    } else if request.header(header::HX_REQUEST).is_none() {
        body.push_str(DOCTYPE);
    }
    body.push_str(&rendered.html);

    sink.send(&head, body.as_bytes())?;
    Ok(200)
}
