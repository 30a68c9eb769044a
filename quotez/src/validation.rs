//! Field-level validation for quote payloads.
//!
//! Request bodies are first collected into a [`QuoteDraft`], which records for each field whether
//! it was absent, a string, or some other JSON value. A draft is then checked against one of two
//! schemas:
//!
//! - [`QuoteDraft::validate_full`] (create): `quote` and `author` are both required.
//! - [`QuoteDraft::validate_partial`] (update): both fields are optional, but a supplied field
//!   must satisfy the same length rules as on create.
//!
//! Every violated rule is reported, not just the first. Lengths are counted in characters and
//! values are kept exactly as received.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimum length of a quote's text, in characters.
pub const QUOTE_MIN_CHARS: usize = 5;
/// Minimum length of an author's name, in characters.
pub const AUTHOR_MIN_CHARS: usize = 2;

/// Where in the request a rejected value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldLocation {
    Body,
    Params,
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Name of the offending field, e.g. `quote` or `id`
    pub field: String,
    pub location: FieldLocation,
    /// Human readable description of the violation
    pub message: String,
}

impl FieldError {
    pub fn body(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            location: FieldLocation::Body,
            message: message.into(),
        }
    }

    pub fn params(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            location: FieldLocation::Params,
            message: message.into(),
        }
    }
}

/// A candidate field value as it arrived in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// A JSON value that is not a string (number, bool, array, object)
    NotText,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Unvalidated `{quote?, author?}` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteDraft {
    pub quote: Option<FieldValue>,
    pub author: Option<FieldValue>,
}

/// A payload that passed the full schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    pub quote: String,
    pub author: String,
}

/// A payload that passed the partial schema. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotePatch {
    pub quote: Option<String>,
    pub author: Option<String>,
}

impl QuotePatch {
    pub fn is_empty(&self) -> bool {
        self.quote.is_none() && self.author.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schema {
    Full,
    Partial,
}

struct TextRule {
    field: &'static str,
    label: &'static str,
    min_chars: usize,
}

const QUOTE_RULE: TextRule = TextRule {
    field: "quote",
    label: "Quote",
    min_chars: QUOTE_MIN_CHARS,
};

const AUTHOR_RULE: TextRule = TextRule {
    field: "author",
    label: "Author",
    min_chars: AUTHOR_MIN_CHARS,
};

impl TextRule {
    /// Check one field, pushing at most one error. Returns the accepted value, if any.
    fn check(&self, value: Option<FieldValue>, schema: Schema, errors: &mut Vec<FieldError>) -> Option<String> {
        match value {
            None => {
                if schema == Schema::Full {
                    errors.push(FieldError::body(self.field, format!("{} is required", self.label)));
                }
                None
            }
            Some(FieldValue::Text(text)) if text.is_empty() && schema == Schema::Full => {
                errors.push(FieldError::body(self.field, format!("{} is required", self.label)));
                None
            }
            Some(FieldValue::NotText) => {
                errors.push(FieldError::body(self.field, format!("{} must be a string", self.label)));
                None
            }
            Some(FieldValue::Text(text)) if text.chars().count() < self.min_chars => {
                errors.push(FieldError::body(
                    self.field,
                    format!("{} must be at least {} characters long", self.label, self.min_chars),
                ));
                None
            }
            Some(FieldValue::Text(text)) => Some(text),
        }
    }
}

impl QuoteDraft {
    /// Build a draft from a decoded JSON body. Keys other than `quote` and `author` are ignored,
    /// and `null` counts as omitted. Returns `None` when the body is not a JSON object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return None;
        };
        let mut take = |key: &str| match map.remove(key) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(FieldValue::Text(s)),
            Some(_) => Some(FieldValue::NotText),
        };
        Some(Self {
            quote: take("quote"),
            author: take("author"),
        })
    }

    /// Validate against the create schema.
    pub fn validate_full(self) -> Result<NewQuote, Vec<FieldError>> {
        let mut errors = Vec::new();
        let quote = QUOTE_RULE.check(self.quote, Schema::Full, &mut errors);
        let author = AUTHOR_RULE.check(self.author, Schema::Full, &mut errors);

        match (quote, author) {
            (Some(quote), Some(author)) if errors.is_empty() => Ok(NewQuote { quote, author }),
            _ => Err(errors),
        }
    }

    /// Validate against the update schema.
    pub fn validate_partial(self) -> Result<QuotePatch, Vec<FieldError>> {
        let mut errors = Vec::new();
        let quote = QUOTE_RULE.check(self.quote, Schema::Partial, &mut errors);
        let author = AUTHOR_RULE.check(self.author, Schema::Partial, &mut errors);

        if errors.is_empty() {
            Ok(QuotePatch { quote, author })
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(quote: Option<&str>, author: Option<&str>) -> QuoteDraft {
        QuoteDraft {
            quote: quote.map(FieldValue::from),
            author: author.map(FieldValue::from),
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_full_schema_accepts_valid_payload_unchanged() {
        let valid = draft(Some("  Stay hungry  "), Some("Jo")).validate_full().unwrap();
        assert_eq!(valid.quote, "  Stay hungry  ");
        assert_eq!(valid.author, "Jo");
    }

    #[test]
    fn test_full_schema_boundaries() {
        assert!(draft(Some("12345"), Some("ab")).validate_full().is_ok());
        assert_eq!(fields(&draft(Some("1234"), Some("ab")).validate_full().unwrap_err()), ["quote"]);
        assert_eq!(fields(&draft(Some("12345"), Some("a")).validate_full().unwrap_err()), ["author"]);
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // Four characters, twelve bytes
        let errors = draft(Some("日本語!"), Some("李")).validate_full().unwrap_err();
        assert_eq!(fields(&errors), ["quote", "author"]);

        assert!(draft(Some("日本語です"), Some("李白")).validate_full().is_ok());
    }

    #[test]
    fn test_full_schema_reports_every_violation() {
        let errors = draft(None, None).validate_full().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::body("quote", "Quote is required"),
                FieldError::body("author", "Author is required"),
            ]
        );

        let errors = draft(Some("Hi"), Some("B")).validate_full().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::body("quote", "Quote must be at least 5 characters long"),
                FieldError::body("author", "Author must be at least 2 characters long"),
            ]
        );
    }

    #[test]
    fn test_empty_string_is_missing_on_create() {
        let errors = draft(Some(""), Some("Bob")).validate_full().unwrap_err();
        assert_eq!(errors, vec![FieldError::body("quote", "Quote is required")]);
    }

    #[test]
    fn test_partial_schema_allows_omitted_fields() {
        let patch = draft(None, None).validate_partial().unwrap();
        assert!(patch.is_empty());

        let patch = draft(None, Some("New")).validate_partial().unwrap();
        assert_eq!(
            patch,
            QuotePatch {
                quote: None,
                author: Some("New".to_string())
            }
        );
    }

    #[test]
    fn test_partial_schema_still_checks_supplied_fields() {
        let errors = draft(Some("abc"), None).validate_partial().unwrap_err();
        assert_eq!(errors, vec![FieldError::body("quote", "Quote must be at least 5 characters long")]);

        // An explicitly supplied empty value is too short, not "missing"
        let errors = draft(None, Some("")).validate_partial().unwrap_err();
        assert_eq!(errors, vec![FieldError::body("author", "Author must be at least 2 characters long")]);
    }

    #[test]
    fn test_from_json() {
        let draft = QuoteDraft::from_json(json!({
            "quote": "Simplicity is prerequisite for reliability",
            "author": null,
            "image": "/etc/passwd",
        }))
        .unwrap();
        assert_eq!(
            draft.quote,
            Some(FieldValue::Text("Simplicity is prerequisite for reliability".to_string()))
        );
        assert_eq!(draft.author, None);

        assert!(QuoteDraft::from_json(json!(["quote"])).is_none());
        assert!(QuoteDraft::from_json(json!("quote")).is_none());
    }

    #[test]
    fn test_non_string_values_are_rejected() {
        let errors = QuoteDraft::from_json(json!({"quote": 12345, "author": ["Ada"]}))
            .unwrap()
            .validate_full()
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::body("quote", "Quote must be a string"),
                FieldError::body("author", "Author must be a string"),
            ]
        );
    }

    #[test]
    fn test_field_error_serialization() {
        let value = serde_json::to_value(FieldError::params("id", "bad")).unwrap();
        assert_eq!(value, json!({"field": "id", "location": "params", "message": "bad"}));
    }
}
