//! View registry: islands, fragments and pages, immutable after load.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::{Fragment, Island, PageView};
use crate::utils::route::{matches_route, path_segments};

#[derive(Default)]
pub struct ViewRegistry {
    islands: Vec<Arc<Island>>,
    island_index: FxHashMap<String, usize>,
    fragments: FxHashMap<String, Arc<dyn Fragment>>,
    /// (route pattern, fragment id), in registration order.
    fragment_routes: Vec<(String, String)>,
    pages: FxHashMap<String, Arc<PageView>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an island. Returns `false` (and keeps the first) on duplicate ids.
    pub fn add_island(&mut self, island: Island) -> bool {
        if self.island_index.contains_key(&island.id) {
            return false;
        }
        self.island_index.insert(island.id.clone(), self.islands.len());
        self.islands.push(Arc::new(island));
        true
    }

    /// Add a fragment. Returns `false` (and keeps the first) on duplicate ids.
    pub fn add_fragment(&mut self, fragment: impl Fragment) -> bool {
        self.add_shared_fragment(Arc::new(fragment))
    }

    pub fn add_shared_fragment(&mut self, fragment: Arc<dyn Fragment>) -> bool {
        let id = fragment.id().to_string();
        if self.fragments.contains_key(&id) {
            return false;
        }
        self.fragment_routes.push((fragment.route().to_string(), id.clone()));
        self.fragments.insert(id, fragment);
        true
    }

    /// Register a page under its route, and under its parent for `index` pages.
    pub fn add_page(&mut self, page: PageView) {
        let page = Arc::new(page);
        if let Some(parent) = index_parent(page.route()) {
            self.pages.entry(parent).or_insert_with(|| Arc::clone(&page));
        }
        self.pages.insert(page.route().to_string(), page);
    }

    // ========================================================================
    // lookups
    // ========================================================================

    pub fn island(&self, id: &str) -> Option<&Arc<Island>> {
        self.island_index.get(id).map(|&i| &self.islands[i])
    }

    /// All islands in load order.
    pub fn islands(&self) -> &[Arc<Island>] {
        &self.islands
    }

    pub fn fragment(&self, id: &str) -> Option<&Arc<dyn Fragment>> {
        self.fragments.get(id)
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Arc<dyn Fragment>> {
        self.fragments.values()
    }

    /// Fragment answering a concrete path; exact routes win over patterns.
    pub fn fragment_for_route(&self, path: &str) -> Option<&Arc<dyn Fragment>> {
        let normalized = normalize(path);
        let id = self
            .fragment_routes
            .iter()
            .find(|(route, _)| normalize(route) == normalized)
            .or_else(|| {
                self.fragment_routes
                    .iter()
                    .find(|(route, _)| matches_route(route, path))
            })
            .map(|(_, id)| id)?;
        self.fragments.get(id)
    }

    /// Page answering a concrete path; exact routes win over patterns.
    pub fn page_for_route(&self, path: &str) -> Option<&Arc<PageView>> {
        let normalized = normalize(path);
        self.pages.get(&normalized).or_else(|| {
            self.pages
                .iter()
                .filter(|(route, _)| route.contains(':'))
                .find(|(route, _)| matches_route(route, path))
                .map(|(_, page)| page)
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

/// `/blog/index` -> `/blog`, `/index` -> `/`.
fn index_parent(route: &str) -> Option<String> {
    let trimmed = route
        .strip_suffix("/index")
        .or_else(|| route.strip_suffix("/index.html"))?;
    Some(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
}

/// Canonical form used for exact lookups: `/a/b`, root as `/`.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    format!("/{}", path_segments(path).join("/"))
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("islands", &self.islands.len())
            .field("fragments", &self.fragments.len())
            .field("pages", &self.pages.len())
            .finish()
    }
}
