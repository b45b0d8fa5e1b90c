//! Command-line interface module.

mod args;
pub mod check;
mod common;
pub mod serve;

pub use args::{Cli, Commands};
pub use common::{REFRESH_ACTION, build_app};
