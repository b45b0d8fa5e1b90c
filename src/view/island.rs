//! Islands: independently updatable page regions.

use serde::{Deserialize, Serialize};

/// How an island is patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IslandKind {
    /// Replaced (or morphed) as a whole.
    #[default]
    Basic,
    /// Rows may be patched individually by item key.
    List,
}

/// Static island metadata, read from `__islands/**/*.meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Island {
    #[serde(alias = "ID")]
    pub id: String,

    #[serde(rename = "fragmentId", alias = "FragmentID", alias = "fragment_id")]
    pub fragment_id: String,

    #[serde(rename = "type", alias = "Type", default)]
    pub kind: IslandKind,
}

impl Island {
    pub fn new(id: impl Into<String>, fragment_id: impl Into<String>, kind: IslandKind) -> Self {
        Self {
            id: id.into(),
            fragment_id: fragment_id.into(),
            kind,
        }
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        self.kind == IslandKind::List
    }
}
