//! HTTP handlers for quote endpoints.

use axum::{Json, extract::State, http::StatusCode};
use tracing::{debug, instrument, warn};

use crate::{
    AppState,
    api::{
        extractors::{CreateQuoteForm, QuoteIdParam, UpdateQuoteForm},
        models::quotes::{MessageResponse, QuoteForm, QuoteResponse},
    },
    db::models::quotes::{QuoteCreateDBRequest, QuoteUpdateDBRequest},
    errors::{Error, ErrorBody, Result},
    types::{QuoteId, abbrev_id},
    uploads::{StoredImage, UploadedImage},
};

fn quote_not_found(id: &QuoteId) -> Error {
    Error::NotFound {
        resource: "Quote".to_string(),
        id: id.to_string(),
    }
}

async fn store_image(state: &AppState, image: Option<&UploadedImage>) -> Result<Option<StoredImage>> {
    match image {
        Some(image) => state.images.store(image).await.map(Some),
        None => Ok(None),
    }
}

/// Best-effort removal of an image file; failures are logged, never surfaced.
async fn discard_image(state: &AppState, public_path: &str) {
    match state.images.remove(public_path).await {
        Ok(removed) => debug!(path = public_path, removed, "Discarded image"),
        Err(e) => warn!(path = public_path, error = %e, "Failed to discard image"),
    }
}

/// List all quotes
#[utoipa::path(
    get,
    path = "/api/quotes",
    tag = "quotes",
    summary = "List quotes",
    description = "Returns every stored quote in insertion order.",
    responses(
        (status = 200, description = "All quotes", body = [QuoteResponse]),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[instrument(skip_all)]
pub async fn list_quotes(State(state): State<AppState>) -> Result<Json<Vec<QuoteResponse>>> {
    let quotes = state.store.list().await?;
    Ok(Json(quotes.into_iter().map(QuoteResponse::from).collect()))
}

/// Get a single quote
#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    tag = "quotes",
    summary = "Get quote",
    params(("id" = String, Path, description = "Quote ID (24 hexadecimal characters)")),
    responses(
        (status = 200, description = "The quote", body = QuoteResponse),
        (status = 400, description = "Invalid ID format", body = ErrorBody),
        (status = 404, description = "Quote not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(quote_id = %abbrev_id(&id)))]
pub async fn get_quote(State(state): State<AppState>, QuoteIdParam(id): QuoteIdParam) -> Result<Json<QuoteResponse>> {
    let quote = state.store.get(&id).await?.ok_or_else(|| quote_not_found(&id))?;
    Ok(Json(quote.into()))
}

/// Create a quote, optionally with an author image
#[utoipa::path(
    post,
    path = "/api/quotes",
    tag = "quotes",
    summary = "Create quote",
    description = "Accepts `multipart/form-data` (with an optional `authorImage` file) or a JSON object. \
                   The image is stored only after the text fields pass validation.",
    request_body(content = QuoteForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Quote created", body = QuoteResponse),
        (status = 400, description = "Validation failed or image rejected", body = ErrorBody),
        (status = 409, description = "The quote could not be saved", body = ErrorBody),
        (status = 413, description = "Image too large", body = ErrorBody),
        (status = 415, description = "Unsupported content type", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(author = %form.quote.author, has_image = form.image.is_some()))]
pub async fn create_quote(State(state): State<AppState>, form: CreateQuoteForm) -> Result<(StatusCode, Json<QuoteResponse>)> {
    let stored = store_image(&state, form.image.as_ref()).await?;

    let request = QuoteCreateDBRequest {
        quote: form.quote.quote,
        author: form.quote.author,
        image: stored.as_ref().map(|image| image.public_path.clone()),
    };

    match state.store.create(&request).await {
        Ok(quote) => Ok((StatusCode::CREATED, Json(quote.into()))),
        Err(e) => {
            warn!(error = %e, "Store rejected new quote");
            if let Some(image) = &stored {
                discard_image(&state, &image.public_path).await;
            }
            Err(Error::Conflict {
                message: "Quote could not be saved".to_string(),
            })
        }
    }
}

/// Update a quote
///
/// Only supplied fields change. Without a new image the existing `image` is kept; with one, the
/// previous file is removed once the record points at the new one.
#[utoipa::path(
    put,
    path = "/api/quotes/{id}",
    tag = "quotes",
    summary = "Update quote",
    description = "Merges any subset of `quote`, `author` and a new `authorImage` into the quote. \
                   Omitted fields are left unchanged; an omitted image never clears the existing one.",
    params(("id" = String, Path, description = "Quote ID (24 hexadecimal characters)")),
    request_body(content = QuoteForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Quote updated", body = QuoteResponse),
        (status = 400, description = "Invalid ID format, validation failed or image rejected", body = ErrorBody),
        (status = 404, description = "Quote not found", body = ErrorBody),
        (status = 413, description = "Image too large", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(quote_id = %abbrev_id(&id), has_image = form.image.is_some()))]
pub async fn update_quote(
    State(state): State<AppState>,
    QuoteIdParam(id): QuoteIdParam,
    form: UpdateQuoteForm,
) -> Result<Json<QuoteResponse>> {
    // Look the record up first so an unknown id never leaves an orphaned file behind
    if state.store.get(&id).await?.is_none() {
        return Err(quote_not_found(&id));
    }

    let stored = store_image(&state, form.image.as_ref()).await?;
    let request = QuoteUpdateDBRequest {
        quote: form.patch.quote,
        author: form.patch.author,
        image: stored.as_ref().map(|image| image.public_path.clone()),
    };

    let outcome = match state.store.update(&id, &request).await {
        Ok(Some(outcome)) => outcome,
        outcome => {
            if let Some(image) = &stored {
                discard_image(&state, &image.public_path).await;
            }
            return match outcome {
                Ok(_) => Err(quote_not_found(&id)),
                Err(e) => Err(e.into()),
            };
        }
    };

    // Only the image this write displaced; a concurrent update cleans up its own
    if let Some(replaced) = &outcome.replaced_image {
        discard_image(&state, replaced).await;
    }

    Ok(Json(outcome.quote.into()))
}

/// Delete a quote
///
/// Deleting an id that does not exist is a successful no-op.
#[utoipa::path(
    delete,
    path = "/api/quotes/{id}",
    tag = "quotes",
    summary = "Delete quote",
    description = "Hard-deletes the quote and its image. Idempotent: deleting an unknown ID also returns 200.",
    params(("id" = String, Path, description = "Quote ID (24 hexadecimal characters)")),
    responses(
        (status = 200, description = "Quote deleted", body = MessageResponse),
        (status = 400, description = "Invalid ID format", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
#[instrument(skip_all, fields(quote_id = %abbrev_id(&id)))]
pub async fn delete_quote(State(state): State<AppState>, QuoteIdParam(id): QuoteIdParam) -> Result<Json<MessageResponse>> {
    match state.store.delete(&id).await? {
        Some(deleted) => {
            if let Some(image) = &deleted.image {
                discard_image(&state, image).await;
            }
        }
        None => debug!("Delete of unknown quote treated as success"),
    }

    Ok(Json(MessageResponse {
        message: "Quote deleted successfully.".to_string(),
    }))
}
