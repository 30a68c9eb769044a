//! Typed request extractors forming the validation pipeline.
//!
//! Handlers take these as arguments and axum runs them in argument order, so a handler declared as
//! `(State, QuoteIdParam, UpdateQuoteForm)` checks the id before reading the body and checks the
//! body before the handler (and therefore the store or the disk) is touched. Every rejection is an
//! [`Error`], rendered in the common JSON envelope.
//!
//! - [`QuoteIdParam`]: the `{id}` path segment must be a well-formed [`QuoteId`]
//! - [`QuoteSubmission`]: decodes a multipart or JSON body into a draft plus optional image
//! - [`CreateQuoteForm`] / [`UpdateQuoteForm`]: a submission that passed the full or partial schema

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request, multipart::Field, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE, request::Parts},
};
use bytes::BytesMut;
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::{Error, Result};
use crate::types::QuoteId;
use crate::uploads::{IMAGE_FIELD, UploadedImage};
use crate::validation::{FieldError, FieldValue, NewQuote, QuoteDraft, QuotePatch};

/// A path `{id}` that parsed as a [`QuoteId`].
#[derive(Debug, Clone)]
pub struct QuoteIdParam(pub QuoteId);

impl<S: Send + Sync> FromRequestParts<S> for QuoteIdParam {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::BadRequest { message: e.body_text() })?;

        raw.parse().map(QuoteIdParam).map_err(|_| Error::InvalidId {
            errors: vec![FieldError::params("id", "ID must be a 24 character hexadecimal string")],
        })
    }
}

/// How a request body should be decoded, judged from its `Content-Type`.
#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    Json,
    /// No content type at all; only acceptable if the body is empty
    Unspecified,
    Unsupported(String),
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return BodyKind::Unspecified;
    };
    let Ok(value) = value.to_str() else {
        return BodyKind::Unsupported("<non-ascii>".to_string());
    };

    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "multipart/form-data" => BodyKind::Multipart,
        "application/json" => BodyKind::Json,
        other if other.starts_with("application/") && other.ends_with("+json") => BodyKind::Json,
        _ => BodyKind::Unsupported(value.to_string()),
    }
}

/// A decoded, not yet validated quote body.
#[derive(Debug)]
pub struct QuoteSubmission {
    pub draft: QuoteDraft,
    pub image: Option<UploadedImage>,
}

impl FromRequest<AppState> for QuoteSubmission {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        match body_kind(req.headers()) {
            BodyKind::Multipart => {
                let multipart = Multipart::from_request(req, state).await.map_err(|e| Error::BadRequest {
                    message: e.body_text(),
                })?;
                read_multipart(multipart, state.config.uploads.max_file_size).await
            }
            BodyKind::Json => {
                let bytes = read_bytes(req, state).await?;
                if bytes.is_empty() {
                    return Ok(Self::empty());
                }
                let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| Error::BadRequest {
                    message: format!("Invalid JSON body: {e}"),
                })?;
                let draft = QuoteDraft::from_json(value).ok_or_else(|| Error::BadRequest {
                    message: "Request body must be a JSON object".to_string(),
                })?;
                Ok(Self { draft, image: None })
            }
            BodyKind::Unspecified => {
                if read_bytes(req, state).await?.is_empty() {
                    Ok(Self::empty())
                } else {
                    Err(Error::UnsupportedMediaType {
                        content_type: "(none)".to_string(),
                    })
                }
            }
            BodyKind::Unsupported(content_type) => Err(Error::UnsupportedMediaType { content_type }),
        }
    }
}

impl QuoteSubmission {
    fn empty() -> Self {
        Self {
            draft: QuoteDraft::default(),
            image: None,
        }
    }
}

async fn read_bytes(req: Request, state: &AppState) -> Result<Bytes> {
    Bytes::from_request(req, state).await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge {
                message: "Request body is too large".to_string(),
            }
        } else {
            Error::BadRequest { message: e.body_text() }
        }
    })
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Request body is too large".to_string(),
        }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

/// Walk the multipart fields: `quote` and `author` as text, at most one [`IMAGE_FIELD`] file.
/// Unknown text fields are ignored; any other file field is rejected.
async fn read_multipart(mut multipart: Multipart, max_file_size: u64) -> Result<QuoteSubmission> {
    let mut submission = QuoteSubmission::empty();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == IMAGE_FIELD {
            if submission.image.is_some() {
                return Err(Error::Upload {
                    message: format!("Only one '{IMAGE_FIELD}' file may be uploaded"),
                });
            }
            submission.image = read_image(field, max_file_size).await?;
            continue;
        }

        if field.file_name().is_some() {
            return Err(Error::Upload {
                message: format!("Unexpected file field '{field_name}'"),
            });
        }

        match field_name.as_str() {
            "quote" => submission.draft.quote = Some(FieldValue::Text(field.text().await.map_err(multipart_error)?)),
            "author" => submission.draft.author = Some(FieldValue::Text(field.text().await.map_err(multipart_error)?)),
            _ => debug!(field = %field_name, "Ignoring unknown form field"),
        }
    }

    Ok(submission)
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("image/"))
}

/// Buffer one image field, enforcing the size ceiling as chunks arrive.
///
/// Browsers submit an empty, unnamed part when no file was chosen; that counts as no image.
#[instrument(skip(field))]
async fn read_image(mut field: Field<'_>, max_file_size: u64) -> Result<Option<UploadedImage>> {
    let original_name = field.file_name().filter(|name| !name.is_empty()).map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    // Fail fast on a named file of the wrong type, before reading it
    if original_name.is_some() && !is_image(content_type.as_deref()) {
        return Err(Error::Upload {
            message: "Please upload an image".to_string(),
        });
    }

    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if (buffer.len() + chunk.len()) as u64 > max_file_size {
            return Err(Error::PayloadTooLarge {
                message: format!(
                    "File size exceeds maximum allowed size of {} bytes ({} MB)",
                    max_file_size,
                    max_file_size / (1024 * 1024)
                ),
            });
        }
        buffer.extend_from_slice(&chunk);
    }

    if buffer.is_empty() && original_name.is_none() {
        return Ok(None);
    }

    match content_type {
        Some(content_type) if is_image(Some(content_type.as_str())) => Ok(Some(UploadedImage {
            original_name,
            content_type,
            bytes: buffer.freeze(),
        })),
        _ => Err(Error::Upload {
            message: "Please upload an image".to_string(),
        }),
    }
}

/// A create body that passed the full schema.
#[derive(Debug)]
pub struct CreateQuoteForm {
    pub quote: NewQuote,
    pub image: Option<UploadedImage>,
}

impl FromRequest<AppState> for CreateQuoteForm {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let QuoteSubmission { draft, image } = QuoteSubmission::from_request(req, state).await?;
        let quote = draft.validate_full().map_err(|errors| Error::Validation { errors })?;
        Ok(Self { quote, image })
    }
}

/// An update body that passed the partial schema.
#[derive(Debug)]
pub struct UpdateQuoteForm {
    pub patch: QuotePatch,
    pub image: Option<UploadedImage>,
}

impl FromRequest<AppState> for UpdateQuoteForm {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let QuoteSubmission { draft, image } = QuoteSubmission::from_request(req, state).await?;
        let patch = draft.validate_partial().map_err(|errors| Error::Validation { errors })?;
        Ok(Self { patch, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        headers
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(body_kind(&headers(Some("multipart/form-data; boundary=xyz"))), BodyKind::Multipart);
        assert_eq!(body_kind(&headers(Some("Application/JSON; charset=utf-8"))), BodyKind::Json);
        assert_eq!(body_kind(&headers(Some("application/merge-patch+json"))), BodyKind::Json);
        assert_eq!(body_kind(&headers(None)), BodyKind::Unspecified);
        assert_eq!(
            body_kind(&headers(Some("text/plain"))),
            BodyKind::Unsupported("text/plain".to_string())
        );
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Some("image/png")));
        assert!(is_image(Some("IMAGE/JPEG")));
        assert!(!is_image(Some("application/pdf")));
        assert!(!is_image(None));
    }
}
