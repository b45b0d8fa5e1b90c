//! Registered actions, keyed by resource and name.

use rustc_hash::FxHashMap;
use std::{fmt, sync::Arc};

use super::{
    ActionHandler,
    handler::{Erased, ErasedAction},
};

/// HTTP method an action answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ActionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Case-insensitive parse; `None` for methods actions cannot use.
    pub fn parse(method: &str) -> Option<Self> {
        [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(method))
    }
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct RegisteredAction {
    pub resource: String,
    pub name: String,
    pub method: ActionMethod,
    pub(crate) handler: Arc<dyn ErasedAction>,
}

impl RegisteredAction {
    /// Mount path: `/__resources/<resource>/actions/<name>`.
    pub fn path(&self) -> String {
        format!("/__resources/{}/actions/{}", self.resource, self.name)
    }
}

impl fmt::Debug for RegisteredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

/// Outcome of looking up an action for a request.
#[derive(Debug)]
pub enum ActionRoute<'a> {
    Found(&'a RegisteredAction),
    /// The action exists under other methods.
    MethodNotAllowed(Vec<ActionMethod>),
    NotFound,
}

#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: FxHashMap<(String, String), Vec<RegisteredAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Returns `false` if the same resource, name and
    /// method is already taken (the first registration stays).
    pub fn register(
        &mut self,
        resource: impl Into<String>,
        name: impl Into<String>,
        method: ActionMethod,
        handler: impl ActionHandler,
    ) -> bool {
        let (resource, name) = (resource.into(), name.into());
        let entries = self
            .actions
            .entry((resource.clone(), name.clone()))
            .or_default();
        if entries.iter().any(|a| a.method == method) {
            return false;
        }
        entries.push(RegisteredAction {
            resource,
            name,
            method,
            handler: Arc::new(Erased(handler)),
        });
        true
    }

    pub fn route(&self, resource: &str, name: &str, method: &str) -> ActionRoute<'_> {
        let Some(entries) = self.actions.get(&(resource.to_string(), name.to_string())) else {
            return ActionRoute::NotFound;
        };
        let method = ActionMethod::parse(method);
        match entries.iter().find(|a| Some(a.method) == method) {
            Some(action) => ActionRoute::Found(action),
            None => ActionRoute::MethodNotAllowed(entries.iter().map(|a| a.method).collect()),
        }
    }

    pub fn contains(&self, resource: &str, name: &str, method: ActionMethod) -> bool {
        matches!(
            self.route(resource, name, method.as_str()),
            ActionRoute::Found(_)
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAction> {
        self.actions.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
