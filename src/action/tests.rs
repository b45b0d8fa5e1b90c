//! End-to-end dispatcher tests over an in-memory sink.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use super::*;
use crate::app::App;
use crate::resource::{self, RequestContext, Resource, ResourceError};
use crate::view::{FnFragment, Island, IslandKind, PageView, RenderError, ViewRegistry};

/// Resource that counts its calls and optionally sleeps.
struct Counted {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    value: Result<Value, ResourceError>,
}

impl Counted {
    fn new(value: Value) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource = Self {
            calls: Arc::clone(&calls),
            delay: Duration::ZERO,
            value: Ok(value),
        };
        (resource, calls)
    }

    fn failing() -> Self {
        Self {
            calls: Arc::default(),
            delay: Duration::ZERO,
            value: Err(ResourceError::failed("backend down")),
        }
    }

    fn delayed(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

#[async_trait]
impl Resource for Counted {
    async fn resolve(&self, _ctx: &RequestContext) -> Result<Value, ResourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.value.clone()
    }
}

fn fragment_over(id: &str, keys: &[&str]) -> impl crate::view::Fragment {
    let owned: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    let id_owned = id.to_string();
    FnFragment::new(id, format!("/{id}"), keys.iter().copied(), move |bindings| {
        let values = owned
            .iter()
            .map(|k| {
                bindings
                    .get(k)
                    .map(|v| v.to_string())
                    .ok_or_else(|| RenderError::Missing(k.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!(
            r#"<div data-frag-url="/{id_owned}">{}</div>"#,
            values.join("|")
        ))
    })
}

fn views() -> ViewRegistry {
    let mut views = ViewRegistry::new();
    views.add_fragment(fragment_over("todos-list", &["todos"]));
    views.add_fragment(fragment_over("todo-count", &["todos", "user"]));
    views.add_fragment(fragment_over("profile", &["user"]));
    views.add_fragment(FnFragment::new(
        "todo-rows",
        "/todo-rows",
        ["todos"],
        |_| {
            Ok(r#"<ul><li data-item-key="a">A</li><li data-item-key="c">C</li></ul>"#.to_string())
        },
    ));
    views.add_fragment(FnFragment::new("broken", "/broken", ["todos"], |_| {
        Err(RenderError::Failed("template exploded".into()))
    }));
    views.add_island(Island::new("todos", "todos-list", IslandKind::Basic));
    views.add_island(Island::new("count", "todo-count", IslandKind::Basic));
    views.add_island(Island::new("profile", "profile", IslandKind::Basic));
    views.add_island(Island::new("rows", "todo-rows", IslandKind::List));
    views.add_island(Island::new("broken", "broken", IslandKind::Basic));
    views.add_island(Island::new("orphan", "missing-fragment", IslandKind::Basic));
    views.add_page(PageView::from_static("/home", "<html><body>home</body></html>".into()));
    views
}

fn request(pairs: &[(&str, &str)]) -> ActionRequest {
    ActionRequest {
        headers: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        body: Vec::new(),
    }
}

fn noop() -> impl ActionHandler {
    from_fn(|_: NoPayload, _ctx| async { Ok(()) })
}

async fn run(app: &Arc<App>, name: &str, request: ActionRequest) -> (DispatchOutcome, RecordedResponse) {
    let action = match app.actions().route("todos", name, "POST") {
        ActionRoute::Found(action) => action.clone(),
        other => panic!("action `{name}` not routable: {other:?}"),
    };
    let sink = MemorySink::default();
    let outcome = perform(app, &action, request, Box::new(sink.clone())).await;
    (outcome, sink.recorded())
}

fn app_with(
    todos: impl Resource,
    user: impl Resource,
    actions: impl FnOnce(crate::app::AppBuilder) -> crate::app::AppBuilder,
) -> Arc<App> {
    let builder = App::builder()
        .views(views())
        .resource("todos", todos)
        .resource("user", user);
    actions(builder).build().unwrap()
}

#[tokio::test]
async fn test_shared_key_is_resolved_once() {
    let (todos, todo_calls) = Counted::new(json!(["milk"]));
    let (user, user_calls) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| b.action("todos", "add", ActionMethod::Post, noop()));

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "todos;count;profile")]),
    )
    .await;

    assert_eq!(todo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(user_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.report.resources, 2);
    assert_eq!(outcome.report.rendered, 3);
    assert!(recorded.streamed && recorded.finished);
    assert_eq!(recorded.chunks.len(), 3);
    assert_eq!(recorded.header("Content-Type"), Some("text/html; charset=utf-8"));

    let mut updated = outcome.updated_islands.clone();
    updated.sort();
    assert_eq!(updated, vec!["count", "profile", "todos"]);
}

#[tokio::test]
async fn test_islands_stream_as_their_keys_arrive() {
    let (todos, _) = Counted::new(json!(["milk"]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user.delayed(150), |b| {
        b.action("todos", "add", ActionMethod::Post, noop())
    });

    let (_, recorded) = run(&app, "add", request(&[("Hardwire-Islands-Update", "profile;todos")])).await;
    assert_eq!(recorded.chunks.len(), 2);
    assert!(String::from_utf8_lossy(&recorded.chunks[0]).contains("innerHTML:#todos"));
    assert!(String::from_utf8_lossy(&recorded.chunks[1]).contains("innerHTML:#profile"));
}

#[tokio::test]
async fn test_island_waits_for_every_key() {
    let (todos, _) = Counted::new(json!(["milk"]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos.delayed(20), user.delayed(120), |b| {
        b.action("todos", "add", ActionMethod::Post, noop())
    });

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "count;todos;profile")]),
    )
    .await;
    assert_eq!(outcome.report.render_failed, 0);
    assert_eq!(outcome.report.rendered, 3);
    assert_eq!(recorded.chunks.len(), 3);
    assert!(String::from_utf8_lossy(&recorded.chunks[0]).contains("innerHTML:#todos"));
    assert!(recorded.body().contains(r#"["milk"]|"ada""#));
}

#[tokio::test]
async fn test_nothing_to_update_is_no_content() {
    let (todos, calls) = Counted::new(json!([]));
    let app = app_with(todos, Counted::failing(), |b| {
        b.action("todos", "add", ActionMethod::Post, noop())
    });

    let (outcome, recorded) = run(&app, "add", request(&[])).await;
    assert_eq!(outcome.status, 204);
    assert_eq!(recorded.status(), Some(204));
    assert!(recorded.chunks.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_resources_failing_is_server_error() {
    let app = app_with(Counted::failing(), Counted::failing(), |b| {
        b.action("todos", "add", ActionMethod::Post, noop())
    });

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "todos;profile")]),
    )
    .await;
    assert_eq!(outcome.status, 500);
    assert!(outcome.report.all_resources_failed());
    assert_eq!(recorded.body(), "error occurred when rendering islands");
}

#[tokio::test]
async fn test_partial_failure_streams_the_rest() {
    let (todos, _) = Counted::new(json!(["milk"]));
    let app = app_with(todos, Counted::failing(), |b| {
        b.action("todos", "add", ActionMethod::Post, noop())
    });

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "todos;count;profile")]),
    )
    .await;
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.report.resources_failed, 1);
    assert_eq!(outcome.updated_islands, vec!["todos"]);
    assert_eq!(recorded.chunks.len(), 1);
}

#[tokio::test]
async fn test_handler_update_is_not_repeated() {
    let (todos, calls) = Counted::new(json!(["milk"]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move {
                ctx.update_islands(&["todos"]).await?;
                Ok(())
            }),
        )
    });

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "todos;count")]),
    )
    .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.updated_islands, vec!["todos", "count"]);
    let todos_patches = recorded
        .chunks
        .iter()
        .filter(|c| String::from_utf8_lossy(c).contains("innerHTML:#todos"))
        .count();
    assert_eq!(todos_patches, 1);
}

#[tokio::test]
async fn test_error_after_streaming_reports_committed_status() {
    let (todos, _) = Counted::new(json!(["milk"]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move {
                ctx.update_islands(&["todos"]).await?;
                Err(ActionError::status(409, "conflict"))
            }),
        )
    });

    let (outcome, recorded) = run(&app, "add", request(&[])).await;
    assert_eq!(outcome.status, 200);
    assert_eq!(recorded.status(), Some(200));
    assert!(recorded.streamed);
    assert!(recorded.finished);
    assert_eq!(recorded.chunks.len(), 1);
}

#[tokio::test]
async fn test_update_unknown_island_is_not_found() {
    let (todos, _) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move {
                ctx.update_islands(&["nope"]).await?;
                Ok(())
            }),
        )
    });

    let (outcome, recorded) = run(&app, "add", request(&[])).await;
    assert_eq!(outcome.status, 404);
    assert_eq!(recorded.body(), "island `nope` not found");
}

#[tokio::test]
async fn test_list_island_patches_rows() {
    let (todos, _) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| b.action("todos", "add", ActionMethod::Post, noop()));

    let (_, recorded) = run(
        &app,
        "add",
        request(&[
            ("Hardwire-Islands-Update", "rows"),
            ("Hardwire-Dynamic-List-Patch", "a;b;c"),
        ]),
    )
    .await;
    assert_eq!(recorded.chunks.len(), 1);
    assert_eq!(
        recorded.body(),
        [
            r#"<li data-item-key="a" hx-swap-oob="outerHTML:.island_rows [data-item-key='a']">A</li>"#,
            r#"<div hx-swap-oob="delete:.island_rows [data-item-key='b']"></div>"#,
            r#"<li data-item-key="c" hx-swap-oob="outerHTML:.island_rows [data-item-key='c']">C</li>"#,
        ]
        .join("\n")
    );
}

#[tokio::test]
async fn test_morph_header_switches_swap_style() {
    let (todos, _) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| b.action("todos", "add", ActionMethod::Post, noop()));

    let (_, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "todos"), ("Hardwire-Htmx-Morph", "true")]),
    )
    .await;
    assert!(recorded.body().contains(r##"<div id="todos" hx-swap-oob="morph:#todos">"##));
}

#[derive(Debug, Deserialize)]
struct NewTodo {
    title: String,
}

#[tokio::test]
async fn test_bad_payload_is_bad_request() {
    let (todos, calls) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|todo: NewTodo, _ctx| async move {
                assert!(!todo.title.is_empty());
                Ok(())
            }),
        )
    });

    let mut req = request(&[
        ("Content-Type", "application/x-www-form-urlencoded"),
        ("Hardwire-Islands-Update", "todos"),
    ]);
    req.body = b"name=milk".to_vec();
    let (outcome, recorded) = run(&app, "add", req).await;
    assert_eq!(outcome.status, 400);
    assert_eq!(recorded.status(), Some(400));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_error_status_skips_islands() {
    let (todos, calls) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move {
                ctx.set_status(422);
                Ok(())
            }),
        )
    });

    let (outcome, recorded) = run(&app, "add", request(&[("Hardwire-Islands-Update", "todos")])).await;
    assert_eq!(outcome.status, 422);
    assert_eq!(recorded.status(), Some(422));
    assert!(recorded.chunks.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_status_error() {
    let (todos, _) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| {
        b.action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, _ctx| async { Err(ActionError::status(409, "duplicate todo")) }),
        )
    });

    let (outcome, recorded) = run(&app, "add", request(&[])).await;
    assert_eq!(outcome.status, 409);
    assert_eq!(recorded.body(), "duplicate todo");
}

#[tokio::test]
async fn test_render_failure_is_not_server_error() {
    let (todos, _) = Counted::new(json!([]));
    let (user, _) = Counted::new(json!("ada"));
    let app = app_with(todos, user, |b| b.action("todos", "add", ActionMethod::Post, noop()));

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[("Hardwire-Islands-Update", "broken;profile;orphan;unknown")]),
    )
    .await;
    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.report.render_failed, 1);
    assert_eq!(outcome.report.dropped, 1);
    assert_eq!(outcome.updated_islands, vec!["profile"]);
    assert_eq!(recorded.chunks.len(), 1);
}

#[tokio::test]
async fn test_reload_unknown_page_resets_content() {
    let app = App::builder()
        .views(views())
        .resource("todos", resource::from_fn(|_| Ok(json!([]))))
        .resource("user", resource::from_fn(|_| Ok(json!("ada"))))
        .action(
            "todos",
            "add",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move { ctx.reload().await }),
        )
        .build()
        .unwrap();

    let (outcome, _) = run(&app, "add", request(&[("HX-Current-URL", "http://localhost/nowhere")])).await;
    assert_eq!(outcome.status, 205);

    let (outcome, recorded) = run(
        &app,
        "add",
        request(&[
            ("HX-Current-URL", "http://localhost/home"),
            ("Hardwire-Islands-Update", "todos"),
        ]),
    )
    .await;
    assert_eq!(outcome.status, 200);
    assert!(outcome.updated_islands.is_empty());
    assert_eq!(recorded.header("HX-Retarget"), Some("body"));
    assert!(recorded.body().contains("home"));
}

#[tokio::test]
async fn test_redirect() {
    let app = App::builder()
        .views(views())
        .resource("todos", resource::from_fn(|_| Ok(json!([]))))
        .resource("user", resource::from_fn(|_| Ok(json!("ada"))))
        .action(
            "todos",
            "home",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move { ctx.redirect("home").await }),
        )
        .action(
            "todos",
            "away",
            ActionMethod::Post,
            from_fn(|_: NoPayload, ctx: ActionContext| async move { ctx.redirect("/elsewhere").await }),
        )
        .build()
        .unwrap();

    let (outcome, recorded) = run(&app, "home", request(&[])).await;
    assert_eq!(outcome.status, 200);
    assert_eq!(recorded.header("HX-Push-Url"), Some("/home"));
    assert_eq!(recorded.header("HX-Retarget"), Some("body"));

    let (outcome, recorded) = run(&app, "away", request(&[])).await;
    assert_eq!(outcome.status, 303);
    assert_eq!(recorded.header("Location"), Some("/elsewhere"));
}
