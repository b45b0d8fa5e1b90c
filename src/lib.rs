//! hardwire: server-rendered islands with streamed out-of-band updates.
//!
//! A request to an action runs its handler, then re-renders the islands the
//! page asked for and streams them back as `hx-swap-oob` patches, one
//! island at a time, as soon as each island's resources are resolved.
//!
//! ```ignore
//! let app = App::builder()
//!     .views(ViewLoader::new("views", false).load().registry)
//!     .resource("todos", resource::from_fn(|_| Ok(json!(["milk"]))))
//!     .action("todos", "add", ActionMethod::Post, from_fn(add_todo))
//!     .build()?;
//! server::serve(app, &ServeConfig::default())?;
//! ```

pub mod logger;

pub mod action;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod resource;
pub mod server;
pub mod utils;
pub mod view;

pub use app::{App, AppBuilder};
