//! Normalization of Gravity errors into mutation error payloads
//!
//! Gravity rejections reach us as `"<url> - <json>"`. Mutations never throw
//! for structured errors: they are parsed here into a
//! [`GravityMutationError`] and returned as the failure branch of the
//! mutation's union.

use async_graphql::SimpleObject;
use serde_json::{Map, Value};

use crate::loaders::LoaderError;

const DELIMITER: &str = " - ";

/// Structured error returned by a failed mutation
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
#[graphql(name = "GravityMutationError")]
pub struct GravityMutationError {
    #[graphql(name = "type")]
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub error: Option<String>,
    pub field_errors: Option<Vec<FieldErrorResults>>,
}

/// Validation message(s) for a single input field
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct FieldErrorResults {
    pub name: String,
    pub message: String,
}

impl GravityMutationError {
    fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn has_field_errors(&self) -> bool {
        self.field_errors.is_some()
    }
}

/// Parse a rejection message into a structured error.
///
/// Returns `None` when the message carries no `" - "` delimiter; callers then
/// surface the raw error.
pub fn format_gravity_error(message: &str) -> Option<GravityMutationError> {
    let (_, payload) = message.split_once(DELIMITER)?;

    let parsed = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(parsed)) => parsed,
        _ => return Some(GravityMutationError::from_message(payload)),
    };

    if let Some(field_errors) = parsed.get("detail").and_then(field_errors) {
        return Some(GravityMutationError {
            error_type: text(parsed.get("type")),
            message: text(parsed.get("message")),
            detail: None,
            error: text(parsed.get("error")),
            field_errors: Some(field_errors),
        });
    }

    if let Some(error) = text(parsed.get("error")) {
        return Some(GravityMutationError {
            error_type: Some("error".to_string()),
            message: Some(error),
            detail: text(parsed.get("text")),
            ..Default::default()
        });
    }

    Some(GravityMutationError {
        error_type: text(parsed.get("type")),
        message: text(parsed.get("message")),
        detail: text(parsed.get("detail")),
        error: None,
        field_errors: None,
    })
}

/// Turn a rejected loader call into a failure payload, or pass the raw
/// message through as a GraphQL error when it carries no structure.
pub fn mutation_error(err: &LoaderError) -> async_graphql::Result<GravityMutationError> {
    match format_gravity_error(&err.message) {
        Some(formatted) => {
            tracing::info!(
                message = ?formatted.message,
                field_errors = formatted.has_field_errors(),
                "upstream rejected mutation"
            );
            Ok(formatted)
        }
        None => {
            tracing::warn!(error = %err.message, "unstructured upstream error");
            Err(async_graphql::Error::new(err.message.clone()))
        }
    }
}

fn field_errors(detail: &Value) -> Option<Vec<FieldErrorResults>> {
    let detail: &Map<String, Value> = detail.as_object()?;
    let errors: Vec<FieldErrorResults> = detail
        .iter()
        .filter_map(|(name, messages)| {
            let messages = messages.as_array()?;
            let message = messages
                .iter()
                .map(|m| text(Some(m)).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", ");
            Some(FieldErrorResults {
                name: name.clone(),
                message,
            })
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://stagingapi.artsy.net/api/v1/me";

    #[test]
    fn test_field_errors_from_detail() {
        let message = format!(r#"{URL} - {{"detail":{{"email":["is invalid"]}}}}"#);
        let error = format_gravity_error(&message).unwrap();

        assert_eq!(
            error.field_errors,
            Some(vec![FieldErrorResults {
                name: "email".into(),
                message: "is invalid".into(),
            }])
        );
        assert_eq!(error.message, None);
        assert_eq!(error.detail, None);
    }

    #[test]
    fn test_field_error_messages_are_joined() {
        let message = format!(
            r#"{URL} - {{"type":"param_error","detail":{{"password":["is too short","needs a digit"],"email":["is taken"]}}}}"#
        );
        let error = format_gravity_error(&message).unwrap();
        let field_errors = error.field_errors.unwrap();

        assert_eq!(error.error_type.as_deref(), Some("param_error"));
        assert!(field_errors.contains(&FieldErrorResults {
            name: "password".into(),
            message: "is too short, needs a digit".into(),
        }));
        assert!(field_errors.contains(&FieldErrorResults {
            name: "email".into(),
            message: "is taken".into(),
        }));
    }

    #[test]
    fn test_flat_error_with_text() {
        let message = format!(r#"{URL} - {{"error":"Bad","text":"explain"}}"#);
        let error = format_gravity_error(&message).unwrap();

        assert_eq!(
            error,
            GravityMutationError {
                error_type: Some("error".into()),
                message: Some("Bad".into()),
                detail: Some("explain".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_malformed_json_falls_back_to_message() {
        let message = format!("{URL} - not json at all");
        let error = format_gravity_error(&message).unwrap();

        assert_eq!(error, GravityMutationError::from_message("not json at all"));
    }

    #[test]
    fn test_no_delimiter_yields_nothing() {
        assert_eq!(format_gravity_error("socket hang up"), None);
    }

    #[test]
    fn test_empty_detail_falls_through_to_error() {
        let message = format!(r#"{URL} - {{"error":"Nope","detail":{{}}}}"#);
        let error = format_gravity_error(&message).unwrap();

        assert_eq!(error.field_errors, None);
        assert_eq!(error.message.as_deref(), Some("Nope"));
        assert_eq!(error.error_type.as_deref(), Some("error"));
    }

    #[test]
    fn test_plain_object_passes_through() {
        let message = format!(r#"{URL} - {{"type":"other","message":"Already exists","detail":"dupe"}}"#);
        let error = format_gravity_error(&message).unwrap();

        assert_eq!(error.error_type.as_deref(), Some("other"));
        assert_eq!(error.message.as_deref(), Some("Already exists"));
        assert_eq!(error.detail.as_deref(), Some("dupe"));
        assert_eq!(error.field_errors, None);
    }

    #[test]
    fn test_splits_on_first_delimiter_only() {
        let message = format!(r#"{URL} - {{"error":"a - b"}}"#);
        let error = format_gravity_error(&message).unwrap();
        assert_eq!(error.message.as_deref(), Some("a - b"));
    }

    #[test]
    fn test_mutation_error_passes_raw_errors_through() {
        let raw = LoaderError::new("connection refused");
        let err = mutation_error(&raw).unwrap_err();
        assert_eq!(err.message, "connection refused");

        let structured = LoaderError::new(format!(r#"{URL} - {{"error":"Bad"}}"#));
        assert_eq!(
            mutation_error(&structured).unwrap().message.as_deref(),
            Some("Bad")
        );
    }
}
