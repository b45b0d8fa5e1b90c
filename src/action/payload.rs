//! Request body -> payload decoding.
//!
//! Url-encoded forms are turned into a JSON object of strings (repeated
//! fields become arrays), so both body kinds go through the same serde
//! path. Form fields therefore bind to `String` (or `Vec<String>`) fields.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::form_urlencoded;

use super::BindingError;
use crate::utils::mime;

/// Decode a request body into `T`.
///
/// An empty body decodes as `{}`; a missing content type is read as a form.
pub fn decode_payload<T: DeserializeOwned>(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<T, BindingError> {
    let is_blank = body.iter().all(u8::is_ascii_whitespace);

    match content_type {
        _ if is_blank => {
            serde_json::from_value(Value::Object(Map::new())).map_err(BindingError::Form)
        }
        Some(ct) if mime::is_json(ct) => serde_json::from_slice(body).map_err(BindingError::Json),
        None => decode_form(body),
        Some(ct) if mime::is_form(ct) => decode_form(body),
        Some(ct) => Err(BindingError::UnsupportedContentType(ct.to_string())),
    }
}

fn decode_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, BindingError> {
    let mut fields = Map::new();
    for (key, value) in form_urlencoded::parse(body) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key.into_owned(), value);
            }
        }
    }
    serde_json::from_value(Value::Object(fields)).map_err(BindingError::Form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct AddTodo {
        title: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn test_form_body() {
        let todo: AddTodo = decode_payload(
            Some("application/x-www-form-urlencoded"),
            b"title=Buy+milk&tags=a&tags=b%20c",
        )
        .unwrap();
        assert_eq!(
            todo,
            AddTodo {
                title: "Buy milk".into(),
                tags: vec!["a".into(), "b c".into()]
            }
        );
    }

    #[test]
    fn test_json_body() {
        let todo: AddTodo =
            decode_payload(Some("application/json; charset=utf-8"), br#"{"title":"x"}"#).unwrap();
        assert_eq!(todo.title, "x");
        assert!(todo.tags.is_empty());
    }

    #[test]
    fn test_missing_field_is_binding_error() {
        let err = decode_payload::<AddTodo>(Some("application/x-www-form-urlencoded"), b"other=1")
            .unwrap_err();
        assert!(matches!(err, BindingError::Form(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = decode_payload::<AddTodo>(Some("application/json"), b"{").unwrap_err();
        assert!(matches!(err, BindingError::Json(_)));
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        #[derive(Deserialize)]
        struct Nothing {}
        assert!(decode_payload::<Nothing>(Some("application/json"), b"").is_ok());
        assert!(decode_payload::<Nothing>(None, b"  ").is_ok());
    }

    #[test]
    fn test_unsupported_content_type() {
        let err = decode_payload::<AddTodo>(Some("multipart/form-data; boundary=x"), b"--x").unwrap_err();
        assert!(matches!(err, BindingError::UnsupportedContentType(_)));
    }
}
