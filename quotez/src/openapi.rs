//! OpenAPI documentation for the quotes API, served at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorBody;
use crate::validation::{FieldError, FieldLocation};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::quotes::list_quotes,
        api::handlers::quotes::get_quote,
        api::handlers::quotes::create_quote,
        api::handlers::quotes::update_quote,
        api::handlers::quotes::delete_quote,
        api::handlers::static_assets::get_uploaded_image,
    ),
    components(schemas(
        api::models::quotes::QuoteResponse,
        api::models::quotes::QuoteForm,
        api::models::quotes::MessageResponse,
        ErrorBody,
        FieldError,
        FieldLocation,
    )),
    tags(
        (name = "quotes", description = "Create, read, update and delete quotes.

Each quote has a `quote` text (at least 5 characters), an `author` (at least 2 characters) and an
optional author image uploaded as the `authorImage` multipart file field."),
    ),
    info(
        title = "Quotez API",
        version = "1.0.0",
        description = "REST API for storing quotes with an optional author image.

## Errors

Every error response is a JSON object with a `message`. Validation failures also carry an `errors`
array with one entry per offending field:

```json
{
  \"message\": \"Validation failed\",
  \"errors\": [
    { \"field\": \"quote\", \"location\": \"body\", \"message\": \"Quote must be at least 5 characters long\" }
  ]
}
```",
    ),
)]
pub struct ApiDoc;
