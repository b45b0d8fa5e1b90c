//! Element extraction over rendered markup.
//!
//! Rendered fragments are scanned as an event stream (`quick-xml`) instead of
//! being parsed into a tree: every selected element is re-serialized on the
//! fly with its attributes rewritten, all other markup passes through
//! untouched. HTML void elements (`<br>`, `<input>`) are treated as closed.
//!
//! ```ignore
//! let rows = extract_by_attr(html, "data-item-key", |key| {
//!     Rewrite::default().set("hx-swap-oob", format!("outerHTML:[data-item-key='{key}']"))
//! })?;
//! ```

use std::borrow::Cow;

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, Event, attributes::Attribute},
    name::QName,
};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::html::{escape_quoted, is_void_element};

/// Errors raised while scanning markup.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed markup at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("failed to serialize element: {0}")]
    Write(String),
}

/// Attribute edits applied to a selected element's start tag.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    rename: Option<String>,
    set: Vec<(String, String)>,
    add_class: Option<String>,
}

impl Rewrite {
    /// Rename the element (start and end tag).
    pub fn rename(mut self, tag: impl Into<String>) -> Self {
        self.rename = Some(tag.into());
        self
    }

    /// Set an attribute, replacing any existing value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.push((name.into(), value.into()));
        self
    }

    /// Append a class to the element's `class` attribute.
    pub fn add_class(mut self, class: impl Into<String>) -> Self {
        self.add_class = Some(class.into());
        self
    }

    fn apply(&self, start: &BytesStart<'_>) -> BytesStart<'static> {
        let name = tag_name(start);
        let mut tag = BytesStart::new(self.rename.clone().unwrap_or(name));
        let mut class_merged = false;

        for attr in start.html_attributes().flatten() {
            let key = attr.key.as_ref();
            if self.set.iter().any(|(k, _)| k.as_bytes() == key) {
                continue;
            }
            if key == b"class"
                && let Some(extra) = &self.add_class
            {
                let existing = String::from_utf8_lossy(&attr.value);
                let merged = format!("{} {}", existing.trim(), extra);
                push_attr(&mut tag, "class", merged.trim());
                class_merged = true;
                continue;
            }
            tag.push_attribute(Attribute {
                key: QName(key),
                value: Cow::Borrowed(attr.value.as_ref()),
            });
        }

        if !class_merged && let Some(extra) = &self.add_class {
            push_attr(&mut tag, "class", extra);
        }
        for (k, v) in &self.set {
            push_attr(&mut tag, k, v);
        }
        tag
    }
}

/// Read an attribute value from a start tag, entity-decoded.
pub fn attr_value(start: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = start
        .html_attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())?;
    let raw = String::from_utf8_lossy(&attr.value).into_owned();
    match quick_xml::escape::unescape(&raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(raw),
    }
}

/// Element name of a start tag.
pub fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Extract the first element accepted by `select`, rewritten by `rewrite`.
pub fn extract_first<F>(html: &str, select: F, rewrite: &Rewrite) -> Result<Option<String>, XmlError>
where
    F: Fn(&BytesStart<'_>) -> bool,
{
    let found = scan(
        html,
        |start| select(start).then(|| (String::new(), rewrite.clone())),
        Some(1),
    )?;
    Ok(found.into_iter().next().map(|(_, html)| html))
}

/// Extract every element carrying `attr`, keyed by that attribute's value.
///
/// The first element wins when several share a value.
pub fn extract_by_attr<F>(html: &str, attr: &str, rewrite: F) -> Result<FxHashMap<String, String>, XmlError>
where
    F: Fn(&str) -> Rewrite,
{
    let mut seen = rustc_hash::FxHashSet::default();
    let found = scan(
        html,
        |start| {
            let value = attr_value(start, attr)?;
            if !seen.insert(value.clone()) {
                return None;
            }
            let rewrite = rewrite(&value);
            Some((value, rewrite))
        },
        None,
    )?;
    Ok(found.into_iter().collect())
}

struct Capture {
    id: String,
    depth: usize,
    rename: Option<String>,
    writer: Writer<Vec<u8>>,
}

impl Capture {
    fn finish(self) -> (String, String) {
        let bytes = self.writer.into_inner();
        (self.id, String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Core scanner: copies every selected element (including nested selections)
/// into its own buffer.
fn scan<F>(html: &str, mut select: F, limit: Option<usize>) -> Result<Vec<(String, String)>, XmlError>
where
    F: FnMut(&BytesStart<'_>) -> Option<(String, Rewrite)>,
{
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut active: Vec<Capture> = Vec::new();
    let mut done: Vec<(String, String)> = Vec::new();
    let mut selected = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Parse {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match &event {
            Event::Eof => break,
            Event::Start(start) => {
                let void = is_void_element(&tag_name(start));
                for capture in &mut active {
                    write(&mut capture.writer, event.clone())?;
                    if !void {
                        capture.depth += 1;
                    }
                }
                if limit.is_none_or(|n| selected < n)
                    && let Some((id, rewrite)) = select(start)
                {
                    selected += 1;
                    let mut writer = Writer::new(Vec::new());
                    write(&mut writer, Event::Start(rewrite.apply(start)))?;
                    let capture = Capture {
                        id,
                        depth: 1,
                        rename: rewrite.rename.clone(),
                        writer,
                    };
                    if void {
                        done.push(capture.finish());
                    } else {
                        active.push(capture);
                    }
                }
            }
            Event::Empty(start) => {
                for capture in &mut active {
                    write(&mut capture.writer, event.clone())?;
                }
                if limit.is_none_or(|n| selected < n)
                    && let Some((id, rewrite)) = select(start)
                {
                    selected += 1;
                    let mut writer = Writer::new(Vec::new());
                    write(&mut writer, Event::Empty(rewrite.apply(start)))?;
                    done.push(Capture { id, depth: 0, rename: None, writer }.finish());
                }
            }
            Event::End(_) => {
                let mut index = 0;
                while index < active.len() {
                    let capture = &mut active[index];
                    capture.depth -= 1;
                    if capture.depth == 0 {
                        match capture.rename.clone() {
                            Some(name) => write(&mut capture.writer, Event::End(BytesEnd::new(name)))?,
                            None => write(&mut capture.writer, event.clone())?,
                        }
                        done.push(active.remove(index).finish());
                    } else {
                        write(&mut capture.writer, event.clone())?;
                        index += 1;
                    }
                }
            }
            _ => {
                for capture in &mut active {
                    write(&mut capture.writer, event.clone())?;
                }
            }
        }

        if active.is_empty() && limit.is_some_and(|n| selected >= n) {
            break;
        }
    }

    // Unterminated elements keep whatever markup was seen.
    done.extend(active.into_iter().map(Capture::finish));
    Ok(done)
}

#[inline]
fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

#[inline]
fn push_attr(tag: &mut BytesStart<'_>, key: &str, value: &str) {
    let value = escape_quoted(value);
    tag.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Borrowed(value.as_bytes()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_sets_attribute() {
        let html = r#"<section><div data-frag-url="/todos" class="a"><p>hi</p></div></section>"#;
        let out = extract_first(
            html,
            |s| attr_value(s, "data-frag-url").is_some(),
            &Rewrite::default().set("hx-swap-oob", "innerHTML:#list"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out,
            r#"<div data-frag-url="/todos" class="a" hx-swap-oob="innerHTML:#list"><p>hi</p></div>"#
        );
    }

    #[test]
    fn test_extract_first_replaces_existing_attribute() {
        let html = r#"<div id="x" hx-swap-oob="old"></div>"#;
        let out = extract_first(html, |_| true, &Rewrite::default().set("hx-swap-oob", "new"))
            .unwrap()
            .unwrap();
        assert_eq!(out, r#"<div id="x" hx-swap-oob="new"></div>"#);
    }

    #[test]
    fn test_extract_first_missing() {
        let out = extract_first("<p>x</p>", |s| tag_name(s) == "div", &Rewrite::default()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_rename_and_add_class() {
        let html = r#"<html><body><dynamic-fragment class="x">{{ todos.title }}</dynamic-fragment></body></html>"#;
        let out = extract_first(
            html,
            |s| tag_name(s) == "dynamic-fragment",
            &Rewrite::default()
                .rename("div")
                .set("data-frag-url", "/todos")
                .add_class("__dynamic_fragment"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out,
            r#"<div class="x __dynamic_fragment" data-frag-url="/todos">{{ todos.title }}</div>"#
        );
    }

    #[test]
    fn test_void_elements_do_not_unbalance() {
        let html = r#"<ul><li data-item-key="a"><input type="checkbox" checked><br>A</li><li data-item-key="b">B</li></ul>"#;
        let rows = extract_by_attr(html, "data-item-key", |_| Rewrite::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows["a"].ends_with("A</li>"));
        assert_eq!(rows["b"], r#"<li data-item-key="b">B</li>"#);
    }

    #[test]
    fn test_bare_ampersand_passes_through() {
        let html = r#"<div data-k="a">Q & A &amp; more</div>"#;
        let rows = extract_by_attr(html, "data-k", |_| Rewrite::default()).unwrap();
        assert_eq!(rows["a"], r#"<div data-k="a">Q & A &amp; more</div>"#);
    }

    #[test]
    fn test_extract_by_attr_first_wins() {
        let html = r#"<div data-k="a">1</div><div data-k="a">2</div>"#;
        let rows = extract_by_attr(html, "data-k", |_| Rewrite::default()).unwrap();
        assert_eq!(rows["a"], r#"<div data-k="a">1</div>"#);
    }

    #[test]
    fn test_nested_selections_are_independent() {
        let html = r#"<div data-k="outer"><span data-k="inner">x</span></div>"#;
        let rows = extract_by_attr(html, "data-k", |k| Rewrite::default().set("data-seen", k)).unwrap();
        assert_eq!(
            rows["outer"],
            r#"<div data-k="outer" data-seen="outer"><span data-k="inner">x</span></div>"#
        );
        assert_eq!(rows["inner"], r#"<span data-k="inner" data-seen="inner">x</span>"#);
    }
}
