//! Views: islands, fragments and pages.
//!
//! | Module     | Purpose                                          |
//! |------------|--------------------------------------------------|
//! | `island`   | Island metadata                                  |
//! | `fragment` | `Fragment` trait and its template/closure impls  |
//! | `template` | Fragment template language                       |
//! | `page`     | Page views                                       |
//! | `registry` | Lookup by id and by route                        |
//! | `loader`   | Reads compiled views from disk                   |

mod fragment;
mod island;
mod loader;
mod page;
mod registry;
pub mod template;

pub use fragment::{FnFragment, Fragment, TemplateFragment};
pub use island::{Island, IslandKind};
pub use loader::{DeclaredAction, LoadedViews, ViewLoader};
pub use page::{PageKind, PageMeta, PageView, RenderedPage};
pub use registry::ViewRegistry;
pub use template::{Bindings, RenderError, Template, TemplateError};
