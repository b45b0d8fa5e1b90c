//! Rendered fragment HTML -> out-of-band swap markup.
//!
//! Whole islands replace the inner HTML of the island container:
//!
//! ```text
//! <div data-frag-url="/todos" hx-swap-oob="innerHTML:#todos">...</div>
//! ```
//!
//! Morph swaps replace the target element itself, so in morph mode the
//! fragment is re-wrapped in a fresh island container that keeps its id:
//!
//! ```text
//! <div id="todos" hx-swap-oob="morph:#todos"><div data-frag-url="/todos">...</div></div>
//! ```
//!
//! List islands patch individual rows selected by `data-item-key`; a
//! requested key with no row in the output becomes a delete directive.

use thiserror::Error;

use crate::utils::{
    html::escape_quoted,
    xml::{self, Rewrite, XmlError},
};
use crate::view::Island;

const FRAGMENT_ROOT_ATTR: &str = "data-frag-url";
const ITEM_KEY_ATTR: &str = "data-item-key";
const SWAP_ATTR: &str = "hx-swap-oob";

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("island `{island}`: {source}")]
    Markup {
        island: String,
        #[source]
        source: XmlError,
    },
}

/// Turns rendered islands into `hx-swap-oob` payloads.
#[derive(Debug, Clone, Copy)]
pub struct PatchSerializer<'a> {
    morph: bool,
    item_keys: &'a [String],
}

impl<'a> PatchSerializer<'a> {
    pub fn new(morph: bool, item_keys: &'a [String]) -> Self {
        Self { morph, item_keys }
    }

    /// Serialize `html` rendered for `island` into one write.
    pub fn serialize(&self, island: &Island, html: &str) -> Result<String, PatchError> {
        let markup = |source| PatchError::Markup {
            island: island.id.clone(),
            source,
        };
        if island.is_list() && !self.item_keys.is_empty() {
            self.rows(island, html).map_err(markup)
        } else {
            self.whole(island, html).map_err(markup)
        }
    }

    fn whole(&self, island: &Island, html: &str) -> Result<String, XmlError> {
        if self.morph {
            return self.morph_container(island, html);
        }
        let directive = self.directive("innerHTML", &format!("#{}", island.id));
        let root = xml::extract_first(
            html,
            |start| xml::attr_value(start, FRAGMENT_ROOT_ATTR).is_some(),
            &Rewrite::default().set(SWAP_ATTR, directive.clone()),
        )?;
        Ok(root.unwrap_or_else(|| {
            format!(r#"<div {SWAP_ATTR}="{}">{html}</div>"#, escape_quoted(&directive))
        }))
    }

    fn morph_container(&self, island: &Island, html: &str) -> Result<String, XmlError> {
        let root = xml::extract_first(
            html,
            |start| xml::attr_value(start, FRAGMENT_ROOT_ATTR).is_some(),
            &Rewrite::default(),
        )?;
        let id = escape_quoted(&island.id);
        Ok(format!(
            r#"<div id="{id}" {SWAP_ATTR}="morph:#{id}">{}</div>"#,
            root.as_deref().unwrap_or(html)
        ))
    }

    fn rows(&self, island: &Island, html: &str) -> Result<String, XmlError> {
        let mut rows = xml::extract_by_attr(html, ITEM_KEY_ATTR, |key| {
            Rewrite::default().set(SWAP_ATTR, self.directive("outerHTML", &row_selector(island, key)))
        })?;

        let patches: Vec<String> = self
            .item_keys
            .iter()
            .map(|key| {
                rows.remove(key).unwrap_or_else(|| {
                    let directive = format!("delete:{}", row_selector(island, key));
                    format!(r#"<div {SWAP_ATTR}="{}"></div>"#, escape_quoted(&directive))
                })
            })
            .collect();
        Ok(patches.join("\n"))
    }

    fn directive(&self, style: &str, selector: &str) -> String {
        let style = if self.morph { "morph" } else { style };
        format!("{style}:{selector}")
    }
}

/// `.island_<id> [data-item-key='<key>']`
fn row_selector(island: &Island, key: &str) -> String {
    format!(
        ".island_{} [{ITEM_KEY_ATTR}='{}']",
        island.id,
        key.replace('\\', "\\\\").replace('\'', "\\'")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::IslandKind;

    const LIST_HTML: &str = r#"<div data-frag-url="/todos"><ul><li data-item-key="a">A</li><li data-item-key="c">C</li></ul></div>"#;

    #[test]
    fn test_whole_island_sets_swap_on_root() {
        let island = Island::new("todos", "todos-list", IslandKind::Basic);
        let out = PatchSerializer::new(false, &[])
            .serialize(&island, r#"<div data-frag-url="/todos" class="__dynamic_fragment"><p>1</p></div>"#)
            .unwrap();
        assert_eq!(
            out,
            r#"<div data-frag-url="/todos" class="__dynamic_fragment" hx-swap-oob="innerHTML:#todos"><p>1</p></div>"#
        );
    }

    #[test]
    fn test_whole_island_without_root_is_wrapped() {
        let island = Island::new("count", "count", IslandKind::Basic);
        let out = PatchSerializer::new(false, &[]).serialize(&island, "<span>3</span>").unwrap();
        assert_eq!(out, r#"<div hx-swap-oob="innerHTML:#count"><span>3</span></div>"#);
    }

    #[test]
    fn test_morph_keeps_island_container_id() {
        let island = Island::new("todos", "todos-list", IslandKind::Basic);
        let out = PatchSerializer::new(true, &[])
            .serialize(&island, r#"<div data-frag-url="/todos" class="__dynamic_fragment"><p>1</p></div>"#)
            .unwrap();
        assert_eq!(
            out,
            r#"<div id="todos" hx-swap-oob="morph:#todos"><div data-frag-url="/todos" class="__dynamic_fragment"><p>1</p></div></div>"#
        );
    }

    #[test]
    fn test_morph_without_root_wraps_in_container() {
        let island = Island::new("count", "count", IslandKind::Basic);
        let out = PatchSerializer::new(true, &[]).serialize(&island, "<span>3</span>").unwrap();
        assert_eq!(out, r#"<div id="count" hx-swap-oob="morph:#count"><span>3</span></div>"#);
    }

    #[test]
    fn test_bare_ampersand_in_text_is_kept() {
        let island = Island::new("t", "t", IslandKind::Basic);
        let out = PatchSerializer::new(false, &[])
            .serialize(&island, r#"<div data-frag-url="/t"><p>Tom & Jerry</p><input disabled><br></div>"#)
            .unwrap();
        assert!(out.starts_with(r##"<div data-frag-url="/t" hx-swap-oob="innerHTML:#t">"##));
        assert!(out.contains("<p>Tom & Jerry</p>"));
    }

    #[test]
    fn test_list_rows_and_delete() {
        let island = Island::new("todos", "todos-list", IslandKind::List);
        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let out = PatchSerializer::new(false, &keys).serialize(&island, LIST_HTML).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"<li data-item-key="a" hx-swap-oob="outerHTML:.island_todos [data-item-key='a']">A</li>"#,
                r#"<div hx-swap-oob="delete:.island_todos [data-item-key='b']"></div>"#,
                r#"<li data-item-key="c" hx-swap-oob="outerHTML:.island_todos [data-item-key='c']">C</li>"#,
            ]
        );
    }

    #[test]
    fn test_list_island_without_keys_is_replaced_whole() {
        let island = Island::new("todos", "todos-list", IslandKind::List);
        let out = PatchSerializer::new(false, &[]).serialize(&island, LIST_HTML).unwrap();
        assert!(out.contains(r##"hx-swap-oob="innerHTML:#todos""##));
        assert!(out.contains("<li data-item-key=\"c\">C</li>"));
    }

    #[test]
    fn test_quote_in_item_key_is_escaped() {
        let island = Island::new("todos", "todos-list", IslandKind::List);
        let keys = vec!["it's".to_string()];
        let out = PatchSerializer::new(false, &keys).serialize(&island, "<ul></ul>").unwrap();
        assert_eq!(
            out,
            r#"<div hx-swap-oob="delete:.island_todos [data-item-key='it\'s']"></div>"#
        );
    }
}
