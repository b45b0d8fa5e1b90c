//! Server actions and the partial-update pipeline.
//!
//! An action is a handler mounted at `/__resources/<key>/actions/<name>`.
//! After it runs, the islands named by `Hardwire-Islands-Update` are
//! re-rendered and streamed back as out-of-band swaps:
//!
//! ```text
//! decode payload ─► handler ─► queue islands ─► resolve keys (one task each)
//!                                   ▲                    │
//!                                   └── drain on arrival ◄┘
//!                                          │
//!                               render ─► patch ─► atomic write
//! ```
//!
//! | Module     | Purpose                                          |
//! |------------|--------------------------------------------------|
//! | `context`  | `ActionContext` handed to handlers               |
//! | `dispatch` | Drives one action request end to end             |
//! | `error`    | `ActionError`, `BindingError`                    |
//! | `handler`  | `ActionHandler` trait, closure adapters          |
//! | `patch`    | Rendered HTML -> `hx-swap-oob` directives        |
//! | `payload`  | Form / JSON body decoding                        |
//! | `queue`    | Islands waiting for resources                    |
//! | `registry` | Actions by resource, name and method             |
//! | `writer`   | Serialized writes to the response stream         |

mod context;
mod dispatch;
mod error;
mod handler;
mod patch;
mod payload;
mod queue;
mod registry;
mod writer;

#[cfg(test)]
mod tests;

pub use context::ActionContext;
pub use dispatch::{ActionRequest, DispatchOutcome, PipelineReport, perform};
pub use error::{ActionError, BindingError};
pub use handler::{ActionHandler, FnAction, NoPayload, from_fn};
pub use patch::{PatchError, PatchSerializer};
pub use payload::decode_payload;
pub use queue::{IslandQueue, QueuedIsland};
pub use registry::{ActionMethod, ActionRegistry, ActionRoute, RegisteredAction};
pub use writer::{AtomicWriter, MemorySink, RecordedResponse, ResponseHead, ResponseSink};
