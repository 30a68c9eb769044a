//! API layer for HTTP request handling and data models.
//!
//! - **[`extractors`]**: typed extractors that validate ids and bodies before a handler runs
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: request/response data structures
//!
//! # API Structure
//!
//! - **Quotes** (`/api/quotes`, `/api/quotes/{id}`): CRUD with optional author image upload
//! - **Images** (`/api/quotes/files/{filename}`, `/uploads/quotes/*`): stored author images
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`. The rendered reference
//! is served at `/docs`.

pub mod extractors;
pub mod handlers;
pub mod models;
