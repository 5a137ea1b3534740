use crate::error::{BackendError, BackendResult};
use crate::keys::generate_object_id;
use crate::traits::{BackendAdapter, BackendObject, ByteReader};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem backend
///
/// Each container is a directory under `base_path`; keys are relative file
/// paths inside it. Content types are not persisted.
#[derive(Clone, Debug)]
pub struct LocalBackend {
    base_path: PathBuf,
}

impl LocalBackend {
    /// Create a new LocalBackend rooted at `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> BackendResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            BackendError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBackend { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn container_path(&self, container: &str) -> BackendResult<PathBuf> {
        if container.is_empty()
            || container == "."
            || container.contains("..")
            || container.contains('/')
            || container.contains('\\')
        {
            return Err(BackendError::InvalidKey(format!(
                "container '{}' is not a valid directory name",
                container
            )));
        }
        Ok(self.base_path.join(container))
    }

    /// Map container and key to a file path, rejecting anything that could
    /// escape the container directory.
    fn object_path(&self, container: &str, key: &str) -> BackendResult<PathBuf> {
        let container_path = self.container_path(container)?;

        if key.is_empty()
            || key.starts_with('/')
            || key.contains('\\')
            || key.split('/').any(|part| part == ".." || part == ".")
        {
            return Err(BackendError::InvalidKey(format!(
                "key '{}' resolves outside container '{}'",
                key, container
            )));
        }

        Ok(container_path.join(key))
    }

    async fn is_dir(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial-{}", name, generate_object_id()))
}

async fn write_file(path: &Path, data: &mut ByteReader) -> std::io::Result<u64> {
    let mut file = fs::File::create(path).await?;
    let copied = tokio::io::copy(data, &mut file).await?;
    file.sync_all().await?;
    Ok(copied)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %path.display(), "Failed to remove staging file");
        }
    }
}

#[async_trait]
impl BackendAdapter for LocalBackend {
    async fn put(
        &self,
        container: &str,
        key: &str,
        mut data: ByteReader,
        _content_type: &str,
    ) -> BackendResult<u64> {
        let container_path = self.container_path(container)?;
        let path = self.object_path(container, key)?;

        if !Self::is_dir(&container_path).await {
            return Err(BackendError::not_found(container, key));
        }

        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Bytes land in a staging file first, so a failed transfer never
        // leaves a readable object under `key`.
        let staging = staging_path(&path);
        let bytes_copied = match write_file(&staging, &mut data).await {
            Ok(copied) => copied,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage write failed"
                );
                discard(&staging).await;
                return Err(BackendError::Io(e));
            }
        };

        if let Err(e) = fs::rename(&staging, &path).await {
            discard(&staging).await;
            return Err(BackendError::Io(e));
        }

        tracing::info!(
            path = %path.display(),
            container = %container,
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(bytes_copied)
    }

    async fn get(&self, container: &str, key: &str) -> BackendResult<BackendObject> {
        let path = self.object_path(container, key)?;
        let start = std::time::Instant::now();

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::not_found(container, key));
            }
            Err(e) => return Err(BackendError::Io(e)),
        };

        // Directories along a key prefix are not objects.
        if !file.metadata().await?.is_file() {
            return Err(BackendError::not_found(container, key));
        }

        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |item| {
            item.map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %path_display,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                BackendError::Io(e)
            })
        });

        tracing::info!(
            path = %path.display(),
            container = %container,
            key = %key,
            "Local storage download opened"
        );

        Ok(BackendObject {
            body: Box::pin(stream),
            content_type: None,
        })
    }

    async fn delete(&self, container: &str, key: &str) -> BackendResult<()> {
        let path = self.object_path(container, key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BackendError::Io(e)),
        }

        tracing::info!(
            path = %path.display(),
            container = %container,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn container_exists(&self, container: &str) -> BackendResult<bool> {
        let path = self.container_path(container)?;
        Ok(Self::is_dir(&path).await)
    }

    async fn create_container(&self, container: &str) -> BackendResult<()> {
        let path = self.container_path(container)?;
        fs::create_dir_all(&path).await?;

        tracing::debug!(path = %path.display(), container = %container, "Local container created");
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
