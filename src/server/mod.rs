//! HTTP server.
//!
//! `tiny_http` accepts connections; each request runs on a `rayon` worker
//! which drives the async engine on a shared `tokio` runtime.
//!
//! | Route                                 | Handler              |
//! |---------------------------------------|----------------------|
//! | `/__resources/<key>/actions/<name>`   | action dispatcher    |
//! | fragment routes                       | [`fragment`]         |
//! | page routes                           | [`page`]             |

mod fragment;
mod lifecycle;
mod page;
mod response;
mod transport;

pub use transport::TinyHttpSink;

use anyhow::{Context, Result};
use crossbeam::channel;
use std::{io::Read, sync::Arc, time::Instant};
use tiny_http::Request;

use crate::action::{ActionRequest, ActionRoute, ResponseSink, perform};
use crate::app::App;
use crate::config::ServeConfig;
use crate::core::{is_shutdown, register_server};
use crate::utils::{header, route::path_segments};
use crate::{log, logger};

/// Request data the router needs, detached from the transport.
#[derive(Debug, Clone, Default)]
pub struct ServerRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ServerRequest {
    pub fn new(method: &str, url: &str, headers: Vec<(String, String)>) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers,
            body: Vec::new(),
        }
    }

    /// URL without query or fragment.
    pub fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header::get(&self.headers, name)
    }

    fn is_read(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") || self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// Bind and serve until Ctrl+C.
pub fn serve(app: Arc<App>, config: &ServeConfig) -> Result<()> {
    let (server, addr) = lifecycle::bind_with_retry(config.interface, config.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("hardwire-engine")
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    // Requests block on the runtime, so they need their own threads.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("hardwire-http-{i}"))
        .build()
        .context("Failed to create thread pool")?;

    log!("serve"; "http://{}", addr);

    for request in server.incoming_requests() {
        let app = Arc::clone(&app);
        let engine = runtime.handle().clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &app, &engine) {
                log!("serve"; "request error: {e:#}");
            }
        });
    }

    drop(pool);
    lifecycle::shutdown(runtime, &shutdown_rx);
    Ok(())
}

fn handle_request(mut request: Request, app: &Arc<App>, engine: &tokio::runtime::Handle) -> Result<()> {
    let started = Instant::now();
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    if is_shutdown() {
        response::unavailable(&mut TinyHttpSink::new(request))?;
        return Ok(());
    }

    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect();
    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .context("Failed to read request body")?;

    let incoming = ServerRequest {
        method: method.clone(),
        url: url.clone(),
        headers,
        body,
    };
    let sink: Box<dyn ResponseSink> = Box::new(TinyHttpSink::new(request));
    let status = engine.block_on(route(app, incoming, sink));
    logger::access(&method, &url, status, started.elapsed());
    Ok(())
}

/// Dispatch one request. Returns the status that was sent.
pub async fn route(app: &Arc<App>, request: ServerRequest, mut sink: Box<dyn ResponseSink>) -> u16 {
    if let Some((resource, name)) = action_target(request.path()) {
        let result = match app.actions().route(resource, name, &request.method) {
            ActionRoute::Found(action) => {
                let action = action.clone();
                let ServerRequest { headers, body, .. } = request;
                return perform(app, &action, ActionRequest { headers, body }, sink).await.status;
            }
            ActionRoute::MethodNotAllowed(allowed) => {
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                response::method_not_allowed(sink.as_mut(), &allow)
            }
            ActionRoute::NotFound => response::not_found(sink.as_mut()),
        };
        return settle(result, &request);
    }

    let views = app.views();
    let result = if let Some(fragment) = views.fragment_for_route(request.path()) {
        if request.is_read() {
            fragment::respond(app, fragment, &request, sink.as_mut()).await
        } else {
            response::method_not_allowed(sink.as_mut(), "GET, HEAD")
        }
    } else if let Some(page) = views.page_for_route(request.path()) {
        if request.is_read() {
            page::respond(app, page, &request, sink.as_mut()).await
        } else {
            response::method_not_allowed(sink.as_mut(), "GET, HEAD")
        }
    } else {
        response::not_found(sink.as_mut())
    };
    settle(result, &request)
}

fn settle(result: std::io::Result<u16>, request: &ServerRequest) -> u16 {
    result.unwrap_or_else(|e| {
        log!("serve"; "{} {}: failed to send response: {}", request.method, request.url, e);
        500
    })
}

/// `/__resources/<key>/actions/<name>` -> `(key, name)`
fn action_target(path: &str) -> Option<(&str, &str)> {
    match path_segments(path).as_slice() {
        ["__resources", resource, "actions", name] => Some((resource, name)),
        _ => None,
    }
}
