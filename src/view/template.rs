//! Logic-less fragment templates over JSON resource values.
//!
//! | Tag                              | Output                              |
//! |----------------------------------|-------------------------------------|
//! | `{{ path }}`                     | value, HTML-escaped                 |
//! | `{{{ path }}}`                   | value, raw                          |
//! | `{{#each path}}..{{/each}}`      | body once per array item            |
//! | `{{#if path}}..{{else}}..{{/if}}`| branch on truthiness                |
//! | `{{@index}}`                     | position inside the current `each`  |
//! | `{{.}}`                          | current `each` item                 |
//!
//! Paths are dotted (`todo.owner.name`, `items.0`). The first segment is
//! looked up in the innermost `each` item first, then outwards, and finally
//! among the resource keys.

use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::resource::ResourceValue;
use crate::utils::html;

/// Resource values available to a render, by key.
pub type Bindings = FxHashMap<String, ResourceValue>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    Unclosed(usize),

    #[error("unexpected `{{{{{tag}}}}}` at byte {offset}")]
    Unexpected { tag: String, offset: usize },

    #[error("`{{{{#{0}}}}}` is never closed")]
    UnclosedBlock(String),

    #[error("empty tag at byte {0}")]
    Empty(usize),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("`{0}` is not defined")]
    Missing(String),

    #[error("`{0}` is not a list")]
    NotIterable(String),

    #[error("`@index` used outside of `#each`")]
    IndexOutsideEach,

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Path {
    This,
    Index,
    Segments(Vec<String>),
}

impl Path {
    fn parse(raw: &str) -> Self {
        match raw {
            "." | "this" => Self::This,
            "@index" => Self::Index,
            _ => Self::Segments(
                raw.trim_start_matches("this.")
                    .split('.')
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    fn display(&self) -> String {
        match self {
            Self::This => ".".to_string(),
            Self::Index => "@index".to_string(),
            Self::Segments(segments) => segments.join("."),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var { path: Path, raw: bool },
    Each { path: Path, body: Vec<Node> },
    If { path: Path, then: Vec<Node>, otherwise: Vec<Node> },
}

/// A parsed template. Parse once, render per request.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

// ============================================================================
// parsing
// ============================================================================

enum Block {
    Each(Path),
    If { path: Path, then: Option<Vec<Node>> },
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        // (block, nodes collected before the block opened)
        let mut stack: Vec<(Block, Vec<Node>)> = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                nodes.push(Node::Text(rest[..start].to_string()));
            }
            let tag_offset = offset + start;
            let after = &rest[start..];

            let (raw, close, open_len) = if after.starts_with("{{{") {
                (true, "}}}", 3)
            } else {
                (false, "}}", 2)
            };
            let end = after[open_len..]
                .find(close)
                .ok_or(TemplateError::Unclosed(tag_offset))?;
            let tag = after[open_len..open_len + end].trim();
            let consumed = start + open_len + end + close.len();

            if tag.is_empty() {
                return Err(TemplateError::Empty(tag_offset));
            }

            if raw {
                nodes.push(Node::Var { path: Path::parse(tag), raw: true });
            } else if let Some(path) = tag.strip_prefix("#each") {
                stack.push((Block::Each(Path::parse(path.trim())), std::mem::take(&mut nodes)));
            } else if let Some(path) = tag.strip_prefix("#if") {
                let block = Block::If { path: Path::parse(path.trim()), then: None };
                stack.push((block, std::mem::take(&mut nodes)));
            } else if tag == "else" {
                match stack.last_mut() {
                    Some((Block::If { then: then @ None, .. }, _)) => {
                        *then = Some(std::mem::take(&mut nodes));
                    }
                    _ => return Err(unexpected(tag, tag_offset)),
                }
            } else if tag == "/each" {
                match stack.pop() {
                    Some((Block::Each(path), outer)) => {
                        let body = std::mem::replace(&mut nodes, outer);
                        nodes.push(Node::Each { path, body });
                    }
                    _ => return Err(unexpected(tag, tag_offset)),
                }
            } else if tag == "/if" {
                match stack.pop() {
                    Some((Block::If { path, then }, outer)) => {
                        let tail = std::mem::replace(&mut nodes, outer);
                        let (then, otherwise) = match then {
                            Some(then) => (then, tail),
                            None => (tail, Vec::new()),
                        };
                        nodes.push(Node::If { path, then, otherwise });
                    }
                    _ => return Err(unexpected(tag, tag_offset)),
                }
            } else if tag.starts_with('#') || tag.starts_with('/') {
                return Err(unexpected(tag, tag_offset));
            } else {
                nodes.push(Node::Var { path: Path::parse(tag), raw: false });
            }

            rest = &rest[consumed..];
            offset += consumed;
        }

        if let Some((block, _)) = stack.pop() {
            let name = match block {
                Block::Each(_) => "each",
                Block::If { .. } => "if",
            };
            return Err(TemplateError::UnclosedBlock(name.to_string()));
        }
        if !rest.is_empty() {
            nodes.push(Node::Text(rest.to_string()));
        }

        Ok(Self { nodes })
    }

    /// Render against resource values.
    pub fn render(&self, bindings: &Bindings) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut scopes = vec![Scope::Root(bindings)];
        render_nodes(&self.nodes, &mut scopes, &mut out)?;
        Ok(out)
    }
}

fn unexpected(tag: &str, offset: usize) -> TemplateError {
    TemplateError::Unexpected {
        tag: tag.to_string(),
        offset,
    }
}

// ============================================================================
// rendering
// ============================================================================

#[derive(Clone, Copy)]
enum Scope<'a> {
    Root(&'a Bindings),
    Item { value: &'a Value, index: usize },
}

enum Resolved<'a> {
    Root(&'a Bindings),
    Value(&'a Value),
    Index(usize),
}

fn render_nodes<'a>(
    nodes: &[Node],
    scopes: &mut Vec<Scope<'a>>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { path, raw } => {
                let text = match resolve(path, scopes)? {
                    Resolved::Value(value) => stringify(value),
                    Resolved::Index(index) => index.to_string(),
                    Resolved::Root(bindings) => root_json(bindings),
                };
                if *raw {
                    out.push_str(&text);
                } else {
                    out.push_str(&html::escape(&text));
                }
            }
            Node::Each { path, body } => {
                let items = match resolve(path, scopes)? {
                    Resolved::Value(Value::Array(items)) => items,
                    Resolved::Value(Value::Null) => continue,
                    _ => return Err(RenderError::NotIterable(path.display())),
                };
                for (index, value) in items.iter().enumerate() {
                    scopes.push(Scope::Item { value, index });
                    let result = render_nodes(body, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
            Node::If { path, then, otherwise } => {
                let truthy = match resolve(path, scopes) {
                    Ok(Resolved::Value(value)) => is_truthy(value),
                    Ok(Resolved::Index(index)) => index != 0,
                    Ok(Resolved::Root(bindings)) => !bindings.is_empty(),
                    Err(RenderError::Missing(_)) => false,
                    Err(e) => return Err(e),
                };
                render_nodes(if truthy { then } else { otherwise }, scopes, out)?;
            }
        }
    }
    Ok(())
}

fn resolve<'a>(path: &Path, scopes: &[Scope<'a>]) -> Result<Resolved<'a>, RenderError> {
    match path {
        Path::This => Ok(match scopes.last().copied() {
            Some(Scope::Item { value, .. }) => Resolved::Value(value),
            Some(Scope::Root(bindings)) => Resolved::Root(bindings),
            None => return Err(RenderError::Missing(".".to_string())),
        }),
        Path::Index => scopes
            .iter()
            .rev()
            .find_map(|scope| match *scope {
                Scope::Item { index, .. } => Some(Resolved::Index(index)),
                Scope::Root(_) => None,
            })
            .ok_or(RenderError::IndexOutsideEach),
        Path::Segments(segments) => {
            let Some((first, rest)) = segments.split_first() else {
                return Err(RenderError::Missing(String::new()));
            };
            let start = scopes.iter().rev().find_map(|scope| match *scope {
                Scope::Root(bindings) => bindings.get(first).map(|v| v.as_ref()),
                Scope::Item { value, .. } => step(value, first),
            });
            start
                .and_then(|value| rest.iter().try_fold(value, |v, seg| step(v, seg)))
                .map(Resolved::Value)
                .ok_or_else(|| RenderError::Missing(path.display()))
        }
    }
}

#[inline]
fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn root_json(bindings: &Bindings) -> String {
    let map: serde_json::Map<String, Value> = bindings
        .iter()
        .map(|(k, v)| (k.clone(), Value::clone(v)))
        .collect();
    Value::Object(map).to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
