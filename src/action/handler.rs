//! Action handlers.

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use std::{future::Future, marker::PhantomData};

use super::{ActionContext, ActionError, decode_payload};

/// A server action: decoded payload in, side effects and response edits out.
///
/// ```ignore
/// struct AddTodo(Store);
///
/// #[async_trait]
/// impl ActionHandler for AddTodo {
///     type Payload = NewTodo;
///
///     async fn handle(&self, todo: NewTodo, ctx: &ActionContext) -> Result<(), ActionError> {
///         self.0.push(todo)?;
///         ctx.update_islands(&["todos"]).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    type Payload: DeserializeOwned + Send + 'static;

    async fn handle(&self, payload: Self::Payload, ctx: &ActionContext) -> Result<(), ActionError>;
}

/// Payload of actions that take no input.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoPayload {}

/// Handler backed by an async closure.
pub struct FnAction<P, F> {
    f: F,
    _payload: PhantomData<fn() -> P>,
}

pub fn from_fn<P, F, Fut>(f: F) -> FnAction<P, F>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(P, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    FnAction {
        f,
        _payload: PhantomData,
    }
}

#[async_trait]
impl<P, F, Fut> ActionHandler for FnAction<P, F>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(P, ActionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    type Payload = P;

    async fn handle(&self, payload: P, ctx: &ActionContext) -> Result<(), ActionError> {
        (self.f)(payload, ctx.clone()).await
    }
}

/// Payload decoding plus the typed handler, behind one object-safe call.
#[async_trait]
pub(crate) trait ErasedAction: Send + Sync + 'static {
    async fn call(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        ctx: &ActionContext,
    ) -> Result<(), ActionError>;
}

pub(crate) struct Erased<H>(pub H);

#[async_trait]
impl<H: ActionHandler> ErasedAction for Erased<H> {
    async fn call(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        ctx: &ActionContext,
    ) -> Result<(), ActionError> {
        let payload = decode_payload::<H::Payload>(content_type, body)?;
        self.0.handle(payload, ctx).await
    }
}
