//! `[resources]` section: file-backed resources served by the binary.
//!
//! ```toml
//! [resources.todos]
//! file = "data/todos.json"
//! ```

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Resource key -> backing file.
pub type ResourcesConfig = FxHashMap<String, ResourceFileConfig>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFileConfig {
    /// JSON document holding the resource value, relative to the config file.
    pub file: PathBuf,
}
