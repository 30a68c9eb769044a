//! HTTP request handlers.
//!
//! - [`quotes`]: quote CRUD, including image upload and replacement
//! - [`static_assets`]: stored images and the optional frontend bundle
//!
//! Handlers return [`crate::errors::Error`], which renders as a status code plus the JSON error
//! envelope.

pub mod quotes;
pub mod static_assets;
