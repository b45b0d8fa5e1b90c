//! One action request, end to end.
//!
//! 1. decode the payload and run the handler
//! 2. stop on a handler error or a non-positive status
//! 3. queue the islands named by `Hardwire-Islands-Update` that the handler
//!    has not already written
//! 4. resolve every missing resource key once (one task per key), releasing
//!    islands as soon as their keys are ready
//! 5. render, patch and write each released island on the blocking pool
//! 6. finish the response: stream end, `204`, or `500` when every resource
//!    task failed before anything was written

use rustc_hash::FxHashSet;
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::task::JoinSet;

use super::{
    ActionContext, AtomicWriter, IslandQueue, PatchError, PatchSerializer, QueuedIsland,
    RegisteredAction, ResponseHead, ResponseSink,
};
use crate::app::App;
use crate::resource::{ReadyResources, RequestContext, ResourceError, ResourceKey};
use crate::utils::{header, mime, plural::plural_count};
use crate::view::{Island, RenderError};
use crate::{debug, log};

const RENDER_FAILED: &str = "error occurred when rendering islands";

/// Raw action request as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Counters of one island pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Resource tasks started.
    pub resources: usize,
    pub resources_failed: usize,
    pub rendered: usize,
    pub render_failed: usize,
    /// Islands skipped because their fragment does not exist.
    pub dropped: usize,
}

impl PipelineReport {
    /// Every resource task failed. An empty task set never counts.
    pub fn all_resources_failed(&self) -> bool {
        self.resources > 0 && self.resources_failed == self.resources
    }

    fn merge(&mut self, other: RenderStats) {
        self.rendered += other.rendered;
        self.render_failed += other.failed;
    }
}

/// What [`perform`] sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: u16,
    pub report: PipelineReport,
    pub updated_islands: Vec<String>,
}

/// State shared by the handler context and the pipeline of one request.
pub(crate) struct RequestScope {
    pub app: Arc<App>,
    pub request: RequestContext,
    pub ready: ReadyResources,
    pub writer: AtomicWriter,
    pub morph: bool,
    pub item_keys: Vec<String>,
}

/// Run `action` for one request and write the response to `sink`.
pub async fn perform(
    app: &Arc<App>,
    action: &RegisteredAction,
    request: ActionRequest,
    sink: Box<dyn ResponseSink>,
) -> DispatchOutcome {
    let ActionRequest { headers, body } = request;
    let content_type = header::get(&headers, "Content-Type").map(str::to_string);
    let island_ids = header::parse_list(header::get(&headers, header::ISLANDS_UPDATE).unwrap_or_default());
    let item_keys = header::parse_list(header::get(&headers, header::DYNAMIC_LIST_PATCH).unwrap_or_default());
    let morph = header::get(&headers, header::HTMX_MORPH) == Some("true");

    let head = ResponseHead::new(200)
        .with_header("Content-Type", mime::types::HTML)
        .with_header("Cache-Control", app.caching().dynamic_routes.cache_control());
    let scope = Arc::new(RequestScope {
        app: Arc::clone(app),
        request: RequestContext::from_headers(headers),
        ready: ReadyResources::new(),
        writer: AtomicWriter::new(sink, head),
        morph,
        item_keys,
    });
    let ctx = ActionContext::new(Arc::clone(&scope));

    if let Err(err) = action.handler.call(content_type.as_deref(), &body, &ctx).await {
        log!("action"; "{:?} failed: {}", action, err);
        let status = if scope.writer.is_committed() {
            scope.writer.status()
        } else {
            err.status_code()
        };
        scope.writer.fail(err.status_code(), &err.public_message());
        return outcome(&scope, status, PipelineReport::default());
    }

    let status = scope.writer.status();
    if !header::is_status_positive(status) || scope.writer.has_body() {
        let status = scope.writer.finish();
        return outcome(&scope, status, PipelineReport::default());
    }

    let islands = requested_islands(&scope, &island_ids);
    let report = run_pipeline(Arc::clone(&scope), islands).await;

    if report.all_resources_failed() {
        log!("action"; "{:?}: all {} failed", action, plural_count(report.resources, "resource"));
        let committed = scope.writer.is_committed();
        scope.writer.fail(500, RENDER_FAILED);
        let status = if committed { status } else { 500 };
        return outcome(&scope, status, report);
    }
    if report.resources_failed > 0 || report.render_failed > 0 {
        log!(
            "action";
            "{:?}: {} of {} failed, {} not updated",
            action,
            report.resources_failed,
            plural_count(report.resources, "resource"),
            plural_count(report.render_failed, "island")
        );
    }
    let status = scope.writer.finish();
    outcome(&scope, status, report)
}

fn outcome(scope: &RequestScope, status: u16, report: PipelineReport) -> DispatchOutcome {
    DispatchOutcome {
        status,
        report,
        updated_islands: scope.writer.updated_islands(),
    }
}

/// Header island ids -> registered islands, deduplicated, skipping unknown
/// ids and islands the handler already wrote.
fn requested_islands(scope: &RequestScope, ids: &[String]) -> Vec<Arc<Island>> {
    let mut seen = FxHashSet::default();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .filter(|id| !scope.writer.is_updated(id))
        .filter_map(|id| {
            let island = scope.app.views().island(id);
            if island.is_none() {
                log!("island"; "unknown island `{}` requested, ignoring", id);
            }
            island.cloned()
        })
        .collect()
}

/// Resolve, render and write `islands`.
///
/// Keys already in the request's ready set are not resolved again.
pub(crate) async fn run_pipeline(scope: Arc<RequestScope>, islands: Vec<Arc<Island>>) -> PipelineReport {
    let mut report = PipelineReport::default();

    let mut queued = Vec::with_capacity(islands.len());
    for island in islands {
        match scope.app.views().fragment(&island.fragment_id) {
            Some(fragment) => queued.push(QueuedIsland::new(island, Arc::clone(fragment))),
            None => {
                log!("island"; "fragment `{}` of island `{}` not found, skipping", island.fragment_id, island.id);
                report.dropped += 1;
            }
        }
    }
    if queued.is_empty() {
        return report;
    }

    let queue = Arc::new(IslandQueue::new(queued));
    let missing: Vec<ResourceKey> = queue
        .required_keys()
        .into_iter()
        .filter(|key| !scope.ready.contains(key))
        .collect();
    report.resources = missing.len();

    report.merge(render_batch(&scope, queue.drain_renderable(&scope.ready)).await);

    match missing.as_slice() {
        [] => {}
        [key] => match resolve_and_render(Arc::clone(&scope), Arc::clone(&queue), key.clone()).await {
            Ok(stats) => report.merge(stats),
            Err(_) => report.resources_failed += 1,
        },
        _ => {
            let mut tasks = JoinSet::new();
            for key in missing.iter().cloned() {
                tasks.spawn(resolve_and_render(Arc::clone(&scope), Arc::clone(&queue), key));
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(stats)) => report.merge(stats),
                    Ok(Err(_)) => report.resources_failed += 1,
                    Err(err) => {
                        log!("error"; "resource task aborted: {}", err);
                        report.resources_failed += 1;
                    }
                }
            }
        }
    }

    if !queue.is_empty() {
        debug!("island"; "{} left unrendered", plural_count(queue.len(), "island"));
    }
    report
}

async fn resolve_and_render(
    scope: Arc<RequestScope>,
    queue: Arc<IslandQueue>,
    key: ResourceKey,
) -> Result<RenderStats, ResourceError> {
    let value = match scope.app.resources().resolve(&scope.request, &key).await {
        Ok(value) => value,
        Err(err) => {
            log!("action"; "resource `{}` failed: {}", key, err);
            return Err(err);
        }
    };
    scope.ready.insert(&key, value);
    let released = queue.drain_renderable(&scope.ready);
    Ok(render_batch(&scope, released).await)
}

#[derive(Debug, Default, Clone, Copy)]
struct RenderStats {
    rendered: usize,
    failed: usize,
}

/// Render each island on the blocking pool and wait for all of them.
async fn render_batch(scope: &Arc<RequestScope>, batch: Vec<QueuedIsland>) -> RenderStats {
    let mut stats = RenderStats::default();
    if batch.is_empty() {
        return stats;
    }

    let handles: Vec<_> = batch
        .into_iter()
        .map(|queued| {
            let scope = Arc::clone(scope);
            tokio::task::spawn_blocking(move || {
                let result = render_island(&scope, &queued);
                result.map_err(|err| (queued.island.id.clone(), err))
            })
        })
        .collect();

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => stats.rendered += 1,
            Ok(Err((id, err))) => {
                log!("island"; "`{}` not updated: {}", id, err);
                stats.failed += 1;
            }
            Err(err) => {
                log!("error"; "render task aborted: {}", err);
                stats.failed += 1;
            }
        }
    }
    stats
}

#[derive(Debug, Error)]
enum IslandError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

fn render_island(scope: &RequestScope, queued: &QueuedIsland) -> Result<(), IslandError> {
    let bindings = scope.ready.snapshot(queued.fragment.resource_keys());
    let html = queued.fragment.build(&bindings)?;
    let patch = PatchSerializer::new(scope.morph, &scope.item_keys).serialize(&queued.island, &html)?;
    if scope.writer.write_island(queued.id(), patch.as_bytes())? {
        debug!("island"; "flushed `{}` ({} bytes)", queued.id(), patch.len());
    }
    Ok(())
}
