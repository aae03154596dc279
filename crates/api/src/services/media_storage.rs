//! On-disk storage for the media library.
//!
//! Files live under `{UPLOAD_DIR}/{collection}/originals/{uuid}.{ext}` and are
//! served statically under `/uploads`. Uploads are content-addressed per
//! collection: a file whose SHA-256 matches an existing row in the same
//! collection is not written again.

use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use olfong_core::{MediaCollection, MediaId, UserId, extension_for};

use crate::db::{MediaRepository, RepositoryError};
use crate::models::{Media, NewMedia};

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("File too large. Maximum size for {collection} is {max_mb}MB")]
    TooLarge {
        collection: MediaCollection,
        max_mb: u64,
    },

    #[error("File type {0} is not allowed for this collection")]
    UnsupportedType(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A file received from a client or downloaded from a provider.
#[derive(Debug, Clone)]
pub struct Upload {
    pub collection: MediaCollection,
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: Option<UserId>,
}

/// Result of [`MediaStorage::ingest`].
#[derive(Debug)]
pub struct Ingested {
    pub media: Media,
    /// The same content was already in the collection.
    pub existing: bool,
}

/// A written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check `mime` and `size` against the collection's limits.
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` or `UnsupportedType`.
    pub fn validate(
        collection: MediaCollection,
        mime: &str,
        size: usize,
    ) -> Result<(), MediaStorageError> {
        if !collection.accepts(mime) {
            return Err(MediaStorageError::UnsupportedType(mime.to_string()));
        }
        if u64::try_from(size).unwrap_or(u64::MAX) > collection.max_size() {
            return Err(MediaStorageError::TooLarge {
                collection,
                max_mb: collection.max_size() / (1024 * 1024),
            });
        }
        Ok(())
    }

    /// SHA-256 of `bytes`, hex encoded.
    #[must_use]
    pub fn content_hash(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Validate, de-duplicate, write and record an upload.
    ///
    /// # Errors
    ///
    /// Returns validation, filesystem or database errors.
    #[instrument(skip(self, repo, upload), fields(collection = %upload.collection, size = upload.bytes.len()))]
    pub async fn ingest(
        &self,
        repo: &MediaRepository<'_>,
        upload: Upload,
    ) -> Result<Ingested, MediaStorageError> {
        Self::validate(upload.collection, &upload.mime_type, upload.bytes.len())?;

        let hash = Self::content_hash(&upload.bytes);
        if let Some(media) = repo.find_by_hash(&hash, upload.collection).await? {
            tracing::info!(media_id = %media.id, "Upload matches existing media");
            return Ok(Ingested {
                media,
                existing: true,
            });
        }

        let id = MediaId::generate();
        let ext = extension_for(&upload.mime_type).unwrap_or("bin");
        let stored = self
            .write(
                &format!("{}/originals", upload.collection.dir_name()),
                &format!("{id}.{ext}"),
                &upload.bytes,
            )
            .await?;

        let new = NewMedia {
            id,
            collection: upload.collection,
            filename: stored.filename,
            original_name: upload.original_name,
            mime_type: upload.mime_type,
            size: i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX),
            hash,
            url: stored.url,
            path: stored.path.to_string_lossy().into_owned(),
            alt: upload.alt,
            caption: upload.caption,
            description: upload.description,
            uploaded_by: upload.uploaded_by,
        };

        match repo.create(&new).await {
            Ok(media) => Ok(Ingested {
                media,
                existing: false,
            }),
            Err(e) => {
                self.remove(&new.path).await;
                // A concurrent upload of the same content won the insert
                if matches!(e, RepositoryError::Conflict(_))
                    && let Some(media) = repo.find_by_hash(&new.hash, new.collection).await?
                {
                    tracing::info!(media_id = %media.id, "Upload raced an identical upload");
                    return Ok(Ingested {
                        media,
                        existing: true,
                    });
                }
                Err(e.into())
            }
        }
    }

    /// Write a generated product image as `products/ai-{millis}-{hex}.png`.
    ///
    /// # Errors
    ///
    /// Returns filesystem errors.
    pub async fn store_generated(&self, bytes: &[u8]) -> Result<StoredFile, MediaStorageError> {
        let suffix: u32 = rand::random();
        let filename = format!("ai-{}-{suffix:08x}.png", Utc::now().timestamp_millis());
        self.write(MediaCollection::Products.dir_name(), &filename, bytes)
            .await
    }

    /// Delete a stored file. A missing file is not an error.
    pub async fn remove(&self, path: &str) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path, error = %e, "Failed to remove media file"),
        }
    }

    async fn write(
        &self,
        dir: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, MediaStorageError> {
        let directory = self.root.join(dir);
        tokio::fs::create_dir_all(&directory).await?;
        let path = directory.join(filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(StoredFile {
            filename: filename.to_string(),
            path,
            url: format!("{}/uploads/{dir}/{filename}", self.base_url),
        })
    }
}

/// Read a response body of at most `max` bytes.
///
/// Returns `Ok(None)` as soon as the declared length or the bytes received
/// so far pass `max`; the rest of the body is never buffered.
///
/// # Errors
///
/// Returns transport errors from the body stream.
pub async fn read_limited(
    response: reqwest::Response,
    max: u64,
) -> Result<Option<Vec<u8>>, reqwest::Error> {
    if response.content_length().is_some_and(|len| len > max) {
        return Ok(None);
    }
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX) > max {
            return Ok(None);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Some(body))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fetch(server: &MockServer, route: &str) -> reqwest::Response {
        reqwest::get(format!("{}{route}", server.uri())).await.unwrap()
    }

    #[tokio::test]
    async fn test_read_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/small.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7_u8; 64]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/large.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7_u8; 4096]))
            .mount(&server)
            .await;

        let body = read_limited(fetch(&server, "/small.png").await, 64).await.unwrap();
        assert_eq!(body.unwrap().len(), 64);
        assert!(read_limited(fetch(&server, "/large.png").await, 1024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_limited_without_content_length() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Chunked body, so the limit can only be enforced while streaming
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: image/png\r\ntransfer-encoding: chunked\r\n\r\n")
                .await
                .unwrap();
            let chunk = [0_u8; 512];
            for _ in 0..8 {
                if socket.write_all(b"200\r\n").await.is_err()
                    || socket.write_all(&chunk).await.is_err()
                    || socket.write_all(b"\r\n").await.is_err()
                {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });

        let response = reqwest::get(format!("http://{addr}/big.png")).await.unwrap();
        assert!(response.content_length().is_none());
        assert!(read_limited(response, 1024).await.unwrap().is_none());
    }

    #[test]
    fn test_validate_limits() {
        assert!(MediaStorage::validate(MediaCollection::Products, "image/gif", 1024).is_ok());
        assert!(matches!(
            MediaStorage::validate(MediaCollection::Categories, "image/gif", 1024),
            Err(MediaStorageError::UnsupportedType(_))
        ));
        let err =
            MediaStorage::validate(MediaCollection::Categories, "image/png", 3 * 1024 * 1024)
                .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File too large. Maximum size for CATEGORIES is 2MB"
        );
        assert!(MediaStorage::validate(MediaCollection::Temp, "video/mp4", 9 * 1024 * 1024).is_ok());
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            MediaStorage::content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_store_generated_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path(), "https://olfong.is/");

        let stored = storage.store_generated(b"png-bytes").await.unwrap();
        assert!(stored.filename.starts_with("ai-"));
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("https://olfong.is/uploads/products/{}", stored.filename)
        );
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"png-bytes");

        let path = stored.path.to_string_lossy().into_owned();
        storage.remove(&path).await;
        assert!(!stored.path.exists());
        storage.remove(&path).await;
    }
}
