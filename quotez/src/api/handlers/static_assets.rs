//! HTTP handlers for stored images and the optional frontend bundle.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::{
    AppState,
    errors::{Error, ErrorBody, Result},
    uploads::is_plain_filename,
};

/// Download a stored author image
#[utoipa::path(
    get,
    path = "/api/quotes/files/{filename}",
    tag = "quotes",
    summary = "Get author image",
    description = "Returns the raw bytes of a stored image. The same file is also served statically under `/uploads/quotes/`.",
    params(("filename" = String, Path, description = "Generated image filename, as found at the end of a quote's `image` path")),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/*"),
        (status = 400, description = "Not a plain filename", body = ErrorBody),
        (status = 404, description = "Image not found", body = ErrorBody),
    )
)]
#[instrument(skip(state))]
pub async fn get_uploaded_image(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    if !is_plain_filename(&filename) {
        return Err(Error::BadRequest {
            message: "Invalid image filename".to_string(),
        });
    }

    let bytes = state.images.retrieve(&filename).await?.ok_or_else(|| Error::NotFound {
        resource: "Image".to_string(),
        id: filename.clone(),
    })?;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.as_ref())], bytes).into_response())
}

/// Resolve a request path inside `root`, refusing anything but plain path segments.
fn resolve_asset(root: &FsPath, path: &str) -> Option<PathBuf> {
    let relative = FsPath::new(path);
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| root.join(relative))
}

/// Serve the frontend bundle, falling back to `index.html` for client-side routes
#[instrument(skip(state))]
pub async fn serve_frontend_asset(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(root) = state.config.frontend.directory.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut path = uri.path().trim_start_matches('/');

    // If path is empty or ends with /, serve index.html
    if path.is_empty() || path.ends_with('/') {
        path = "index.html";
    }

    if let Some(file) = resolve_asset(root, path)
        && let Ok(content) = tokio::fs::read(&file).await
    {
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        // Vite hashed assets can be cached indefinitely
        let cache_control = if path.starts_with("assets/") {
            "public, max-age=31536000, immutable"
        } else {
            "no-cache"
        };

        return (
            [(header::CONTENT_TYPE, mime.as_ref()), (header::CACHE_CONTROL, cache_control)],
            content,
        )
            .into_response();
    }

    debug!("Hitting SPA fallback for: {}", uri.path());
    match tokio::fs::read(root.join("index.html")).await {
        Ok(index) => (
            [(header::CONTENT_TYPE, "text/html"), (header::CACHE_CONTROL, "no-cache")],
            index,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tempfile::TempDir;

    const INDEX_HTML: &str = "<!doctype html><title>Quotez</title>";

    async fn frontend_app() -> (TestApp, TempDir) {
        let frontend = TempDir::new().unwrap();
        std::fs::write(frontend.path().join("index.html"), INDEX_HTML).unwrap();
        std::fs::create_dir(frontend.path().join("assets")).unwrap();
        std::fs::write(frontend.path().join("assets/app-1a2b3c.js"), "console.log('hi')").unwrap();
        std::fs::write(frontend.path().join("favicon.png"), PNG_BYTES).unwrap();

        let uploads = TempDir::new().unwrap();
        let mut config = create_test_config(uploads.path());
        config.frontend.directory = Some(frontend.path().to_path_buf());

        let app = create_test_app_with_config(config, Arc::new(Default::default()), uploads).await;
        (app, frontend)
    }

    #[test]
    fn test_resolve_asset_rejects_traversal() {
        let root = FsPath::new("/srv/frontend");
        assert_eq!(resolve_asset(root, "assets/app.js"), Some(root.join("assets/app.js")));
        assert_eq!(resolve_asset(root, "../etc/passwd"), None);
        assert_eq!(resolve_asset(root, "assets/../../secret"), None);
        assert_eq!(resolve_asset(root, "/etc/passwd"), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_get_uploaded_image_not_found() {
        let app = create_test_app().await;

        let response = app.server.get("/api/quotes/files/authorImage-1-2.png").await;
        response.assert_status_not_found();
        assert!(response.json::<serde_json::Value>()["message"].is_string());
    }

    #[test_log::test(tokio::test)]
    async fn test_get_uploaded_image_rejects_odd_names() {
        let app = create_test_app().await;

        app.server
            .get("/api/quotes/files/.hidden")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.server
            .get("/api/quotes/files/..%2Fsecret")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[test_log::test(tokio::test)]
    async fn test_serve_root_returns_index_html() {
        let (app, _frontend) = frontend_app().await;

        // `/` belongs to the API, so the bundle is reached through its explicit path
        let response = app.server.get("/index.html").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "text/html");
        assert_eq!(response.header("cache-control"), "no-cache");
        assert_eq!(response.text(), INDEX_HTML);
    }

    #[test_log::test(tokio::test)]
    async fn test_hashed_assets_have_immutable_cache() {
        let (app, _frontend) = frontend_app().await;

        let response = app.server.get("/assets/app-1a2b3c.js").await;
        response.assert_status_ok();
        assert_eq!(response.header("cache-control"), "public, max-age=31536000, immutable");
        assert!(response.header("content-type").to_str().unwrap().contains("javascript"));

        let response = app.server.get("/favicon.png").await;
        assert_eq!(response.header("content-type"), "image/png");
        assert_eq!(response.header("cache-control"), "no-cache");
    }

    #[test_log::test(tokio::test)]
    async fn test_spa_fallback_for_unknown_routes() {
        let (app, _frontend) = frontend_app().await;

        for path in ["/quotes/65a1b2c3d4e5f60718293a4b/edit", "/about/", "/../../etc/passwd"] {
            let response = app.server.get(path).await;
            response.assert_status_ok();
            assert_eq!(response.text(), INDEX_HTML);
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_no_frontend_means_plain_404() {
        let app = create_test_app().await;
        app.server.get("/quotes/new").await.assert_status_not_found();
    }
}
