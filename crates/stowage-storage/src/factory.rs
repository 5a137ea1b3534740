use crate::cloud::ObjectStoreBackend;
use crate::error::{BackendError, BackendResult};
#[cfg(feature = "storage-local")]
use crate::LocalBackend;
#[cfg(feature = "storage-s3")]
use crate::S3Backend;
use crate::{BackendAdapter, StorageBackend};
use std::sync::Arc;
use stowage_core::{BackendConfig, StorageConfig};

/// Create the backend adapter selected by the configuration
pub async fn create_backend(config: &StorageConfig) -> BackendResult<Arc<dyn BackendAdapter>> {
    let backend: Arc<dyn BackendAdapter> = match &config.backend {
        #[cfg(feature = "storage-s3")]
        BackendConfig::Minio(minio) => Arc::new(S3Backend::minio(minio).await?),

        #[cfg(feature = "storage-s3")]
        BackendConfig::S3(s3) => Arc::new(S3Backend::s3(s3).await?),

        #[cfg(not(feature = "storage-s3"))]
        BackendConfig::Minio(_) | BackendConfig::S3(_) => {
            return Err(not_enabled(config.backend_type(), "storage-s3"))
        }

        #[cfg(feature = "storage-azure")]
        BackendConfig::Azure(azure) => Arc::new(ObjectStoreBackend::azure(azure)),

        #[cfg(not(feature = "storage-azure"))]
        BackendConfig::Azure(_) => return Err(not_enabled(StorageBackend::Azure, "storage-azure")),

        #[cfg(feature = "storage-gcs")]
        BackendConfig::Gcs(gcs) => Arc::new(ObjectStoreBackend::gcs(gcs)),

        #[cfg(not(feature = "storage-gcs"))]
        BackendConfig::Gcs(_) => return Err(not_enabled(StorageBackend::Gcs, "storage-gcs")),

        #[cfg(feature = "storage-local")]
        BackendConfig::Local(local) => Arc::new(LocalBackend::new(&local.base_path).await?),

        #[cfg(not(feature = "storage-local"))]
        BackendConfig::Local(_) => return Err(not_enabled(StorageBackend::Local, "storage-local")),

        BackendConfig::Memory => Arc::new(ObjectStoreBackend::memory()),
    };

    tracing::info!(backend = %backend.backend_type(), "Storage backend created");
    Ok(backend)
}

#[allow(dead_code)]
fn not_enabled(backend: StorageBackend, feature: &str) -> BackendError {
    BackendError::Config(format!(
        "{} storage backend not available ({} feature not enabled)",
        backend, feature
    ))
}
