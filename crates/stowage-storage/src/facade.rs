//! Storage facade
//!
//! Turns logical paths into backend coordinates and dispatches the transfer to
//! the configured [`BackendAdapter`]. Input problems are reported before any
//! backend call; backend failures come back wrapped in a [`StorageError`].

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use stowage_core::StorageConfig;

use crate::error::{BackendError, Error, Operation, StorageError, StorageResult};
use crate::factory::create_backend;
use crate::keys::compose_upload_key;
use crate::naming::{validate_all, NamingRuleSet};
use crate::path::{
    normalize, split_for_download, split_for_upload, ObjectLocation, PathNormalizer, StoragePath,
};
use crate::traits::{bytes_reader, collect_stream, once_stream, BackendAdapter, ByteReader, ByteStream};
use crate::{sniff, StorageBackend};

/// Downloaded object: body plus a concrete content type.
pub struct StoredObject {
    pub body: ByteStream,
    pub content_type: String,
}

impl StoredObject {
    /// Buffer the whole body.
    pub async fn into_bytes(self) -> StorageResult<Bytes> {
        collect_stream(self.body)
            .await
            .map_err(|e| StorageError::new(Operation::Download, e).into())
    }

    pub fn into_parts(self) -> (ByteStream, String) {
        (self.body, self.content_type)
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Backend-agnostic object storage facade
///
/// Cheap to clone; holds only the shared adapter and immutable settings.
#[derive(Clone)]
pub struct StorageFacade {
    backend: Arc<dyn BackendAdapter>,
    rules: NamingRuleSet,
    normalizer: PathNormalizer,
}

impl fmt::Debug for StorageFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageFacade")
            .field("backend", &self.backend.backend_type())
            .field("rules", &self.rules)
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

impl StorageFacade {
    pub fn new(backend: Arc<dyn BackendAdapter>, rules: NamingRuleSet) -> Self {
        StorageFacade {
            backend,
            rules,
            normalizer: PathNormalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: PathNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Build the adapter named by `config` and pick the naming rules.
    ///
    /// `strict_naming` overrides the backend's own rule set when present.
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let backend = create_backend(config)
            .await
            .map_err(|e| Error::Config(e.to_string()))?;

        let rules = match config.strict_naming {
            Some(true) => NamingRuleSet::Strict,
            Some(false) => NamingRuleSet::Default,
            None => NamingRuleSet::for_backend(config.backend_type()),
        };

        tracing::info!(
            backend = %config.backend_type(),
            rules = ?rules,
            replace_spaces = config.replace_spaces,
            "Storage facade initialized"
        );

        Ok(Self::new(backend, rules).with_normalizer(PathNormalizer::new(config.replace_spaces)))
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.backend.backend_type()
    }

    pub fn rules(&self) -> NamingRuleSet {
        self.rules
    }

    /// Normalize, split and validate an upload path without touching the backend.
    pub fn resolve_upload(&self, raw_path: &str) -> StorageResult<StoragePath> {
        require_non_empty("path", raw_path)?;
        let normalized = self.normalizer.normalize(raw_path)?;
        let path = split_for_upload(&normalized)?;
        validate_all(path.segments(), self.rules)?;
        Ok(path)
    }

    /// Normalize and split a stored path. Keys are opaque, so no naming rules
    /// apply and spaces are never rewritten.
    pub fn resolve_download(&self, raw_path: &str) -> StorageResult<ObjectLocation> {
        require_non_empty("path", raw_path)?;
        let normalized = normalize(raw_path)?;
        split_for_download(&normalized)
    }

    /// Store `data` under a fresh identifier below `raw_path`.
    ///
    /// Creates the container on first use. Returns the stored path,
    /// `container[/segment]*/identifier`.
    pub async fn upload(
        &self,
        raw_path: &str,
        data: ByteReader,
        content_type: &str,
    ) -> StorageResult<String> {
        require_non_empty("content type", content_type)?;
        let path = self.resolve_upload(raw_path)?;
        let location = compose_upload_key(&path);
        let start = std::time::Instant::now();

        let wrap = |e: BackendError| StorageError::new(Operation::Upload, e);

        self.ensure_container(location.container())
            .await
            .map_err(wrap)?;

        let size = self
            .backend
            .put(location.container(), location.key(), data, content_type)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    container = %location.container(),
                    key = %location.key(),
                    "Upload failed"
                );
                wrap(e)
            })?;

        tracing::info!(
            container = %location.container(),
            key = %location.key(),
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload successful"
        );

        Ok(location.stored_path())
    }

    /// Convenience wrapper around [`upload`](Self::upload) for in-memory data.
    pub async fn upload_bytes(
        &self,
        raw_path: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> StorageResult<String> {
        self.upload(raw_path, bytes_reader(data), content_type).await
    }

    /// Open a stored object.
    ///
    /// When the backend keeps no content type the whole body is buffered and
    /// sniffed.
    pub async fn download(&self, raw_path: &str) -> StorageResult<StoredObject> {
        let location = self.resolve_download(raw_path)?;
        let wrap = |e: BackendError| StorageError::new(Operation::Download, e);

        let object = self
            .backend
            .get(location.container(), location.key())
            .await
            .map_err(|e| {
                if !e.is_not_found() {
                    tracing::error!(
                        error = %e,
                        container = %location.container(),
                        key = %location.key(),
                        "Download failed"
                    );
                }
                wrap(e)
            })?;

        match object.content_type.filter(|ct| !ct.trim().is_empty()) {
            Some(content_type) => Ok(StoredObject {
                body: object.body,
                content_type,
            }),
            None => {
                let data = collect_stream(object.body).await.map_err(wrap)?;
                let content_type = sniff::detect(&data).to_string();

                tracing::debug!(
                    container = %location.container(),
                    key = %location.key(),
                    size_bytes = data.len(),
                    content_type = %content_type,
                    "Content type sniffed"
                );

                Ok(StoredObject {
                    body: once_stream(data),
                    content_type,
                })
            }
        }
    }

    pub async fn delete(&self, raw_path: &str) -> StorageResult<()> {
        let location = self.resolve_download(raw_path)?;

        self.backend
            .delete(location.container(), location.key())
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    container = %location.container(),
                    key = %location.key(),
                    "Delete failed"
                );
                StorageError::new(Operation::Delete, e)
            })?;

        tracing::info!(
            container = %location.container(),
            key = %location.key(),
            "Delete successful"
        );

        Ok(())
    }

    async fn ensure_container(&self, container: &str) -> Result<(), BackendError> {
        if self.backend.container_exists(container).await? {
            return Ok(());
        }

        tracing::debug!(container = %container, "Container missing, creating");
        self.backend.create_container(container).await
    }
}

fn require_non_empty(name: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", name)));
    }
    Ok(())
}
