//! Dynamic fragment endpoint: `GET <fragment route>`.

use std::{io, sync::Arc};
use tokio::task::JoinSet;

use super::{ServerRequest, response};
use crate::action::{ResponseHead, ResponseSink};
use crate::app::App;
use crate::log;
use crate::resource::{RequestContext, ResourceError};
use crate::utils::{hash, header, mime::types};
use crate::view::{Bindings, Fragment};

const VARY: &str = "Hx-Current-Url, Hardwire-Dynamic-Fragment-Request, Accept-Language";

pub async fn respond(
    app: &Arc<App>,
    fragment: &Arc<dyn Fragment>,
    request: &ServerRequest,
    sink: &mut dyn ResponseSink,
) -> io::Result<u16> {
    if request.header(header::DYNAMIC_FRAGMENT_REQUEST).is_none() {
        return response::send_text(
            sink,
            400,
            "missing Hardwire-Dynamic-Fragment-Request header",
        );
    }

    let ctx = Arc::new(RequestContext::from_headers(request.headers.clone()));
    let bindings = match resolve_all(app, fragment, &ctx).await {
        Ok(bindings) => bindings,
        Err(err) => {
            log!("serve"; "fragment `{}`: {}", fragment.id(), err);
            return response::resource_error(sink, &request.headers, &err);
        }
    };

    let html = match fragment.build(&bindings) {
        Ok(html) => html,
        Err(err) => {
            log!("serve"; "fragment `{}` failed to render: {}", fragment.id(), err);
            return response::send_text(sink, 500, "500 Internal Server Error");
        }
    };

    let policy = &app.caching().fragments;
    let mut head = ResponseHead::new(200)
        .with_header("Content-Type", types::HTML)
        .with_header("Vary", VARY)
        .with_header("Cache-Control", policy.cache_control());

    if !policy.no_store {
        let etag = hash::etag(&html);
        head.set_header("ETag", etag.as_str());
        if request
            .header(header::IF_NONE_MATCH)
            .is_some_and(|candidate| header::etag_matches(candidate, &etag))
        {
            return response::not_modified(sink, head);
        }
    }

    sink.send(&head, html.as_bytes())?;
    Ok(200)
}

/// Resolve every key of the fragment concurrently; the first failure in
/// declaration order wins.
async fn resolve_all(
    app: &Arc<App>,
    fragment: &Arc<dyn Fragment>,
    ctx: &Arc<RequestContext>,
) -> Result<Bindings, ResourceError> {
    let mut tasks = JoinSet::new();
    for (index, key) in fragment.resource_keys().iter().enumerate() {
        let (app, ctx, key) = (Arc::clone(app), Arc::clone(ctx), key.clone());
        tasks.spawn(async move {
            let value = app.resources().resolve(&ctx, &key).await;
            (index, key, value)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.map_err(ResourceError::failed)?);
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut bindings = Bindings::default();
    for (_, key, value) in results {
        bindings.insert(key, Arc::new(value?));
    }
    Ok(bindings)
}
