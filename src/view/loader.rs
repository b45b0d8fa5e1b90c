//! Loads compiled views from disk.
//!
//! ```text
//! views/
//! ├── __islands/**/*.meta.json      # islands
//! ├── __actions.meta.json           # actions referenced by the views (optional)
//! ├── todos/list.template.html      # fragment served at /todos/list
//! ├── todos/list.meta.json          # its id and resources
//! ├── index.html                    # page served at / and /index
//! └── about.meta.json               # optional page metadata
//! ```
//!
//! Every problem is collected into [`ConfigDiagnostics`] instead of stopping
//! at the first one.

use jwalk::WalkDir;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    Island, PageKind, PageMeta, PageView, TemplateFragment, ViewRegistry, template::Template,
};
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::resource::ResourceKey;
use crate::utils::xml::{self, Rewrite};
use crate::{debug, utils::plural::plural_count};

const ISLANDS_DIR: &str = "__islands";
const ACTIONS_META: &str = "__actions.meta.json";
const META_SUFFIX: &str = ".meta.json";
const TEMPLATE_SUFFIX: &str = ".template.html";
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// `<base>.meta.json` next to a fragment template.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FragmentMeta {
    hash: String,
    #[serde(default)]
    resource_name: Option<String>,
    #[serde(default)]
    resource_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionsMeta {
    #[serde(default)]
    registered_actions: Vec<DeclaredAction>,
}

/// An action some view posts to; it must be registered before serving.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeclaredAction {
    pub resource: String,
    pub action: String,
    pub method: String,
}

/// Result of scanning a views directory.
pub struct LoadedViews {
    pub registry: ViewRegistry,
    pub declared_actions: Vec<DeclaredAction>,
    pub diagnostics: ConfigDiagnostics,
}

pub struct ViewLoader {
    root: PathBuf,
    keep_extension: bool,
}

impl ViewLoader {
    pub fn new(root: impl Into<PathBuf>, keep_extension: bool) -> Self {
        Self {
            root: root.into(),
            keep_extension,
        }
    }

    pub fn load(&self) -> LoadedViews {
        let mut loaded = LoadedViews {
            registry: ViewRegistry::new(),
            declared_actions: Vec::new(),
            diagnostics: ConfigDiagnostics::new(),
        };

        for rel in collect_relative_files(&self.root) {
            if rel == ACTIONS_META {
                self.load_actions(&rel, &mut loaded);
            } else if rel.starts_with(&format!("{ISLANDS_DIR}/")) {
                if rel.ends_with(META_SUFFIX) {
                    self.load_island(&rel, &mut loaded);
                }
            } else if rel.ends_with(TEMPLATE_SUFFIX) {
                self.load_fragment(&rel, &mut loaded);
            } else if rel.ends_with(".html") {
                self.load_page(&rel, &mut loaded);
            }
        }

        debug!(
            "views";
            "loaded {}, {}, {}",
            plural_count(loaded.registry.islands().len(), "island"),
            plural_count(loaded.registry.fragment_count(), "fragment"),
            plural_count(loaded.registry.page_count(), "route")
        );
        loaded
    }

    fn load_island(&self, rel: &str, loaded: &mut LoadedViews) {
        let Some(island) = self.read_json::<Island>(rel, &mut loaded.diagnostics) else {
            return;
        };
        let id = island.id.clone();
        if !loaded.registry.add_island(island) {
            loaded
                .diagnostics
                .error(FieldPath::owned(rel), format!("duplicate island id `{id}`"));
        }
    }

    fn load_fragment(&self, rel: &str, loaded: &mut LoadedViews) {
        let diag = &mut loaded.diagnostics;
        let base = &rel[..rel.len() - TEMPLATE_SUFFIX.len()];
        let meta_rel = format!("{base}{META_SUFFIX}");
        let route = format!("/{base}");

        let Some(meta) = self.read_json::<FragmentMeta>(&meta_rel, diag) else {
            return;
        };
        let keys: Vec<ResourceKey> = if meta.resource_keys.is_empty() {
            meta.resource_name.into_iter().collect()
        } else {
            meta.resource_keys
        };
        if keys.is_empty() {
            diag.error_with_hint(
                FieldPath::owned(meta_rel),
                "fragment declares no resources",
                "set `resourceName` or `resourceKeys`",
            );
            return;
        }

        let Some(source) = self.read(rel, diag) else {
            return;
        };
        let rewrite = Rewrite::default()
            .rename("div")
            .set("data-frag-url", route.clone())
            .add_class("__dynamic_fragment");
        let root = match xml::extract_first(&source, |s| xml::tag_name(s) == "dynamic-fragment", &rewrite) {
            Ok(Some(root)) => root,
            Ok(None) => {
                diag.error(FieldPath::owned(rel), "no <dynamic-fragment> element found");
                return;
            }
            Err(e) => {
                diag.error(FieldPath::owned(rel), e.to_string());
                return;
            }
        };
        let template = match Template::parse(&root) {
            Ok(template) => template,
            Err(e) => {
                diag.error(FieldPath::owned(rel), e.to_string());
                return;
            }
        };

        let id = meta.hash;
        if !loaded
            .registry
            .add_fragment(TemplateFragment::new(id.clone(), route, keys, template))
        {
            diag.error(FieldPath::owned(rel), format!("duplicate fragment id `{id}`"));
        }
    }

    fn load_page(&self, rel: &str, loaded: &mut LoadedViews) {
        let diag = &mut loaded.diagnostics;
        let base = rel.strip_suffix(".html").unwrap_or(rel);
        let meta_rel = format!("{base}{META_SUFFIX}");
        let route = if self.keep_extension {
            format!("/{rel}")
        } else {
            format!("/{base}")
        };

        let meta = if self.root.join(&meta_rel).is_file() {
            match self.read_json::<PageMeta>(&meta_rel, diag) {
                Some(meta) => meta,
                None => return,
            }
        } else {
            PageMeta::default()
        };
        let Some(html) = self.read(rel, diag) else {
            return;
        };

        let page = if meta.should_redirect {
            let Some(to) = meta.redirect_url else {
                diag.error(FieldPath::owned(meta_rel), "`shouldRedirect` requires `redirectURL`");
                return;
            };
            PageView::new(route, html, PageKind::Redirect { to })
        } else if meta.is_dynamic {
            let Some(resource) = meta.resource_name else {
                diag.error(FieldPath::owned(meta_rel), "dynamic page requires `resourceName`");
                return;
            };
            match Template::parse(&html) {
                Ok(template) => PageView::new(route, html, PageKind::Dynamic { resource, template }),
                Err(e) => {
                    diag.error(FieldPath::owned(rel), e.to_string());
                    return;
                }
            }
        } else {
            PageView::from_static(route, html)
        };

        loaded.registry.add_page(page);
    }

    fn load_actions(&self, rel: &str, loaded: &mut LoadedViews) {
        if let Some(meta) = self.read_json::<ActionsMeta>(rel, &mut loaded.diagnostics) {
            loaded.declared_actions.extend(meta.registered_actions);
        }
    }

    // ========================================================================
    // file helpers
    // ========================================================================

    fn read(&self, rel: &str, diag: &mut ConfigDiagnostics) -> Option<String> {
        fs::read_to_string(self.root.join(rel))
            .map_err(|e| diag.error(FieldPath::owned(rel), format!("cannot read file: {e}")))
            .ok()
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        rel: &str,
        diag: &mut ConfigDiagnostics,
    ) -> Option<T> {
        let content = self.read(rel, diag)?;
        serde_json::from_str(&content)
            .map_err(|e| diag.error(FieldPath::owned(rel), format!("malformed metadata: {e}")))
            .ok()
    }
}

/// All files under `root` as sorted `/`-separated relative paths.
fn collect_relative_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .filter_map(|e| {
            let path = e.path();
            let rel = path.strip_prefix(root).ok()?;
            let parts: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            Some(parts.join("/"))
        })
        .collect();
    files.sort();
    files
}
