//! Storage for uploaded author images.
//!
//! Images arrive as a single multipart file field named [`IMAGE_FIELD`]. The request extractor
//! buffers the file (bounded by the configured ceiling) and checks its MIME type; this module
//! only deals with putting validated bytes on disk and taking them off again.
//!
//! Stored files get generated names of the form `authorImage-<unix millis>-<random>.<ext>` and are
//! referenced from quote records by their public path, `/uploads/quotes/<filename>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use rand::prelude::RngExt;
use rand::rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::errors::{Error, Result};

/// Multipart field carrying the author image.
pub const IMAGE_FIELD: &str = "authorImage";

/// URL prefix under which the upload directory is served.
pub const UPLOADS_MOUNT: &str = "/uploads";

/// Subdirectory (and public path segment) holding quote images.
pub const QUOTE_IMAGES_DIR: &str = "quotes";

/// Exclusive upper bound of the random filename component.
const RANDOM_SUFFIX_BOUND: u32 = 1_000_000_000;

/// How many fresh names to try before giving up on a write.
const MAX_NAME_ATTEMPTS: usize = 5;

/// Longest extension we keep from a client filename.
const MAX_EXTENSION_LEN: usize = 16;

/// An image received from a client, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as sent by the client, used only for its extension
    pub original_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    /// Path clients fetch the image from, stored on the quote record
    pub public_path: String,
}

/// Trait for image storage backends
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Persist an image under a freshly generated, collision-free name
    async fn store(&self, image: &UploadedImage) -> Result<StoredImage>;

    /// Read a stored image by filename. `None` if it does not exist or the name is not a plain
    /// filename.
    async fn retrieve(&self, filename: &str) -> Result<Option<Bytes>>;

    /// Remove the image a quote record points to. Returns whether a file was removed; paths outside
    /// this storage's public prefix are ignored.
    async fn remove(&self, public_path: &str) -> Result<bool>;
}

/// Local filesystem storage backend - stores images flat in one directory
pub struct LocalImageStorage {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalImageStorage {
    /// Create the storage, making sure `dir` exists.
    ///
    /// `public_prefix` is the URL path the directory is served under, without a trailing slash.
    pub async fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        Ok(Self {
            dir,
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn public_path(&self, filename: &str) -> String {
        format!("{}/{}", self.public_prefix, filename)
    }

    /// Map a public path back to a filename in this storage, if it is one of ours.
    fn filename_for<'a>(&self, public_path: &'a str) -> Option<&'a str> {
        public_path
            .strip_prefix(self.public_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| is_plain_filename(name))
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    #[instrument(skip(self, image), fields(size = image.bytes.len(), content_type = %image.content_type), err)]
    async fn store(&self, image: &UploadedImage) -> Result<StoredImage> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = generate_filename(IMAGE_FIELD, image.original_name.as_deref());
            let path = self.dir.join(&filename);

            let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(%filename, "Generated image name already taken, retrying");
                    continue;
                }
                Err(e) => return Err(anyhow::Error::new(e).context("Failed to create image file").into()),
            };

            let written = async {
                file.write_all(&image.bytes).await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&path).await {
                    warn!(%filename, error = %cleanup, "Failed to remove partially written image");
                }
                return Err(anyhow::Error::new(e).context("Failed to write image file").into());
            }

            debug!(%filename, "Stored uploaded image");
            return Ok(StoredImage {
                public_path: self.public_path(&filename),
                filename,
            });
        }

        Err(Error::Internal {
            operation: format!("find a free image filename after {MAX_NAME_ATTEMPTS} attempts"),
        })
    }

    async fn retrieve(&self, filename: &str) -> Result<Option<Bytes>> {
        if !is_plain_filename(filename) {
            return Ok(None);
        }

        match fs::read(self.dir.join(filename)).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read image file").into()),
        }
    }

    #[instrument(skip(self), err)]
    async fn remove(&self, public_path: &str) -> Result<bool> {
        let Some(filename) = self.filename_for(public_path) else {
            debug!("Not removing image outside the upload directory");
            return Ok(false);
        };

        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to remove image file").into()),
        }
    }
}

/// Build `<field>-<unix millis>-<random>[.<ext>]` from the client's filename.
pub fn generate_filename(field: &str, original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = rng().random_range(0..RANDOM_SUFFIX_BOUND);

    match original_name.and_then(extension_of) {
        Some(ext) => format!("{field}-{millis}-{suffix}.{ext}"),
        None => format!("{field}-{millis}-{suffix}"),
    }
}

/// Lower-cased extension of a client filename, dropped unless it is short and alphanumeric.
fn extension_of(original_name: &str) -> Option<String> {
    // Browsers on Windows may send the full client path
    let base = original_name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = base.rsplit_once('.')?;

    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

/// Whether `name` is a single, non-hidden path component safe to join onto the upload directory.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png(name: &str) -> UploadedImage {
        UploadedImage {
            original_name: Some(name.to_string()),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\nnot really a png"),
        }
    }

    async fn storage() -> (LocalImageStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        let storage = LocalImageStorage::new(temp.path().join("quotes"), "/uploads/quotes/")
            .await
            .unwrap();
        (storage, temp)
    }

    fn assert_generated_name(name: &str, ext: Option<&str>) {
        let rest = name.strip_prefix("authorImage-").expect("field prefix");
        let (numbers, actual_ext) = match rest.split_once('.') {
            Some((numbers, ext)) => (numbers, Some(ext)),
            None => (rest, None),
        };
        assert_eq!(actual_ext, ext);

        let (millis, random) = numbers.split_once('-').expect("two numeric parts");
        assert!(millis.parse::<i64>().is_ok(), "{millis} is not a timestamp");
        assert!(random.parse::<u32>().unwrap() < RANDOM_SUFFIX_BOUND);
    }

    #[test]
    fn test_generate_filename_keeps_extension() {
        assert_generated_name(&generate_filename(IMAGE_FIELD, Some("portrait.JPG")), Some("jpg"));
        assert_generated_name(&generate_filename(IMAGE_FIELD, Some("C:\\photos\\me.webp")), Some("webp"));
        assert_generated_name(&generate_filename(IMAGE_FIELD, Some("archive.tar.gz")), Some("gz"));
    }

    #[test]
    fn test_generate_filename_drops_unsafe_extensions() {
        for name in [None, Some("noext"), Some(".hidden"), Some("x.p/ng"), Some("x.p ng"), Some("trailing.")] {
            assert_generated_name(&generate_filename(IMAGE_FIELD, name), None);
        }
    }

    #[test]
    fn test_is_plain_filename() {
        assert!(is_plain_filename("authorImage-1700000000000-42.png"));
        for name in ["", ".", "..", "../secret", "a/b", "a\\b", ".env", "name with space.png"] {
            assert!(!is_plain_filename(name), "{name:?} should not be plain");
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let (storage, _temp) = storage().await;

        let stored = storage.store(&png("author.png")).await.unwrap();
        assert_generated_name(&stored.filename, Some("png"));
        assert_eq!(stored.public_path, format!("/uploads/quotes/{}", stored.filename));
        assert!(storage.dir().join(&stored.filename).exists());

        let content = storage.retrieve(&stored.filename).await.unwrap().unwrap();
        assert_eq!(content, png("author.png").bytes);

        assert!(storage.retrieve("missing.png").await.unwrap().is_none());
        assert!(storage.retrieve("../quotes").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_never_overwrites() {
        let (storage, _temp) = storage().await;

        let mut names = std::collections::HashSet::new();
        for _ in 0..20 {
            names.insert(storage.store(&png("same.png")).await.unwrap().filename);
        }
        assert_eq!(names.len(), 20);
    }

    #[tokio::test]
    async fn test_remove_only_touches_own_files() {
        let (storage, temp) = storage().await;
        let stored = storage.store(&png("bye.gif")).await.unwrap();

        // Something outside the image directory that a crafted path might target
        let outside = temp.path().join("keep.txt");
        std::fs::write(&outside, "keep").unwrap();

        assert!(!storage.remove("/uploads/quotes/../keep.txt").await.unwrap());
        assert!(!storage.remove("/elsewhere/keep.txt").await.unwrap());
        assert!(outside.exists());

        assert!(storage.remove(&stored.public_path).await.unwrap());
        assert!(!storage.dir().join(&stored.filename).exists());

        // Already gone
        assert!(!storage.remove(&stored.public_path).await.unwrap());
    }
}
