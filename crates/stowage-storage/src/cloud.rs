//! object_store backed adapters: Azure Blob Storage, Google Cloud Storage and
//! an in-process memory store.
//!
//! object_store binds one client to one bucket or container and has no notion
//! of creating either, so data I/O goes through a per-container object_store
//! client while existence checks and creation use the provider SDKs. A client
//! is cached only once its container is known to exist.

use crate::error::{BackendError, BackendResult};
use crate::traits::{read_all, BackendAdapter, BackendObject, ByteReader};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "storage-azure")]
use azure_core::StatusCode;
#[cfg(feature = "storage-azure")]
use azure_storage::StorageCredentials;
#[cfg(feature = "storage-azure")]
use azure_storage_blobs::prelude::BlobServiceClient;
#[cfg(feature = "storage-azure")]
use object_store::azure::MicrosoftAzureBuilder;
#[cfg(feature = "storage-azure")]
use stowage_core::AzureConfig;

#[cfg(feature = "storage-gcs")]
use google_cloud_storage::client::google_cloud_auth::credentials::CredentialsFile;
#[cfg(feature = "storage-gcs")]
use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
#[cfg(feature = "storage-gcs")]
use google_cloud_storage::http::buckets::get::GetBucketRequest;
#[cfg(feature = "storage-gcs")]
use google_cloud_storage::http::buckets::insert::{InsertBucketParam, InsertBucketRequest};
#[cfg(feature = "storage-gcs")]
use google_cloud_storage::http::Error as GcsError;
#[cfg(feature = "storage-gcs")]
use object_store::gcp::GoogleCloudStorageBuilder;
#[cfg(feature = "storage-gcs")]
use stowage_core::GcsConfig;
#[cfg(feature = "storage-gcs")]
use tokio::sync::OnceCell;

enum StoreKind {
    Memory,
    #[cfg(feature = "storage-azure")]
    Azure {
        config: AzureConfig,
        service: BlobServiceClient,
    },
    #[cfg(feature = "storage-gcs")]
    Gcs {
        config: GcsConfig,
        admin: OnceCell<GcsAdmin>,
    },
}

/// Bucket administration client, built on first use because reading the
/// service account file is async.
#[cfg(feature = "storage-gcs")]
struct GcsAdmin {
    client: GcsClient,
    project_id: Option<String>,
}

#[cfg(feature = "storage-gcs")]
async fn gcs_admin<'a>(
    config: &GcsConfig,
    cell: &'a OnceCell<GcsAdmin>,
) -> BackendResult<&'a GcsAdmin> {
    cell.get_or_try_init(|| async {
        let credentials = CredentialsFile::new_from_file(config.credentials_path.clone())
            .await
            .map_err(|e| {
                BackendError::Config(format!(
                    "Failed to read GCS credentials {}: {}",
                    config.credentials_path, e
                ))
            })?;
        let client_config = ClientConfig::default()
            .with_credentials(credentials)
            .await
            .map_err(|e| BackendError::Config(format!("Failed to configure GCS client: {}", e)))?;

        // An explicit project wins over the one named in the service account.
        let project_id = config
            .project_id
            .clone()
            .or_else(|| client_config.project_id.clone());

        Ok::<_, BackendError>(GcsAdmin {
            client: GcsClient::new(client_config),
            project_id,
        })
    })
    .await
}

#[cfg(feature = "storage-gcs")]
fn gcs_status(err: &GcsError) -> Option<u16> {
    match err {
        GcsError::Response(response) => Some(response.code),
        _ => None,
    }
}

#[cfg(feature = "storage-azure")]
fn azure_status(err: &azure_core::Error) -> Option<StatusCode> {
    err.as_http_error().map(|http| http.status())
}

/// Backend adapter over `object_store` clients
pub struct ObjectStoreBackend {
    kind: StoreKind,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreBackend {
    /// Process-local store; containers exist once created.
    pub fn memory() -> Self {
        Self::with_kind(StoreKind::Memory)
    }

    #[cfg(feature = "storage-azure")]
    pub fn azure(config: &AzureConfig) -> Self {
        tracing::info!(account = %config.account, "Azure blob store configured");
        let credentials =
            StorageCredentials::access_key(config.account.clone(), config.access_key.clone());
        Self::with_kind(StoreKind::Azure {
            config: config.clone(),
            service: BlobServiceClient::new(config.account.clone(), credentials),
        })
    }

    #[cfg(feature = "storage-gcs")]
    pub fn gcs(config: &GcsConfig) -> Self {
        tracing::info!(
            credentials_path = %config.credentials_path,
            project_id = ?config.project_id,
            "GCS blob store configured"
        );
        Self::with_kind(StoreKind::Gcs {
            config: config.clone(),
            admin: OnceCell::new(),
        })
    }

    fn with_kind(kind: StoreKind) -> Self {
        ObjectStoreBackend {
            kind,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Build a client bound to `container`. The memory store never builds one
    /// on demand: its containers only come from `create_container`.
    fn build_store(&self, container: &str) -> BackendResult<Option<Arc<dyn ObjectStore>>> {
        match &self.kind {
            StoreKind::Memory => Ok(None),
            #[cfg(feature = "storage-azure")]
            StoreKind::Azure { config, .. } => {
                let store = MicrosoftAzureBuilder::new()
                    .with_account(&config.account)
                    .with_access_key(&config.access_key)
                    .with_container_name(container)
                    .build()
                    .map_err(|e| BackendError::Config(e.to_string()))?;
                Ok(Some(Arc::new(store)))
            }
            #[cfg(feature = "storage-gcs")]
            StoreKind::Gcs { config, .. } => {
                let store = GoogleCloudStorageBuilder::new()
                    .with_service_account_path(&config.credentials_path)
                    .with_bucket_name(container)
                    .build()
                    .map_err(|e| BackendError::Config(e.to_string()))?;
                Ok(Some(Arc::new(store)))
            }
        }
    }

    /// Cached client for `container`, or a fresh uncached one.
    async fn store(&self, container: &str) -> BackendResult<Option<Arc<dyn ObjectStore>>> {
        if let Some(store) = self.stores.read().await.get(container) {
            return Ok(Some(store.clone()));
        }
        self.build_store(container)
    }

    async fn existing_store(&self, container: &str, key: &str) -> BackendResult<Arc<dyn ObjectStore>> {
        self.store(container)
            .await?
            .ok_or_else(|| BackendError::not_found(container, key))
    }

    /// Keep the client for a container that is known to exist.
    async fn remember(&self, container: &str, store: Arc<dyn ObjectStore>) {
        self.stores
            .write()
            .await
            .entry(container.to_string())
            .or_insert(store);
    }

    async fn remember_container(&self, container: &str) -> BackendResult<()> {
        if let Some(store) = self.build_store(container)? {
            self.remember(container, store).await;
        }
        Ok(())
    }

    #[cfg(test)]
    async fn cached_containers(&self) -> usize {
        self.stores.read().await.len()
    }
}

fn map_store_error(container: &str, key: &str, action: &str, err: object_store::Error) -> BackendError {
    match err {
        object_store::Error::NotFound { .. } => BackendError::not_found(container, key),
        other => BackendError::request(format!("{} {}/{} failed", action, container, key), other),
    }
}

#[async_trait]
impl BackendAdapter for ObjectStoreBackend {
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: ByteReader,
        content_type: &str,
    ) -> BackendResult<u64> {
        let store = self.existing_store(container, key).await?;
        let body = read_all(data).await?;
        let size = body.len() as u64;
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        store
            .put_opts(&ObjectPath::from(key), PutPayload::from(body), options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    backend = %self.backend_type(),
                    container = %container,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store upload failed"
                );
                map_store_error(container, key, "put", e)
            })?;

        tracing::info!(
            backend = %self.backend_type(),
            container = %container,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store upload successful"
        );

        self.remember(container, store).await;
        Ok(size)
    }

    async fn get(&self, container: &str, key: &str) -> BackendResult<BackendObject> {
        let store = self.existing_store(container, key).await?;
        let start = std::time::Instant::now();

        let result = store
            .get(&ObjectPath::from(key))
            .await
            .map_err(|e| map_store_error(container, key, "get", e))?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string());

        tracing::info!(
            backend = %self.backend_type(),
            container = %container,
            key = %key,
            size_bytes = result.meta.size,
            content_type = ?content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store download started"
        );

        let stream = result.into_stream().map(|item| {
            item.map_err(|e| BackendError::request("object store stream read failed", e))
        });

        Ok(BackendObject {
            body: Box::pin(stream),
            content_type,
        })
    }

    async fn delete(&self, container: &str, key: &str) -> BackendResult<()> {
        let Some(store) = self.store(container).await? else {
            return Ok(());
        };

        match store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(map_store_error(container, key, "delete", e)),
        }

        tracing::info!(
            backend = %self.backend_type(),
            container = %container,
            key = %key,
            "Object store delete successful"
        );

        Ok(())
    }

    async fn container_exists(&self, container: &str) -> BackendResult<bool> {
        let exists = match &self.kind {
            StoreKind::Memory => self.stores.read().await.contains_key(container),
            #[cfg(feature = "storage-azure")]
            StoreKind::Azure { service, .. } => service
                .container_client(container)
                .exists()
                .await
                .map_err(|e| {
                    BackendError::request(format!("checking container {} failed", container), e)
                })?,
            #[cfg(feature = "storage-gcs")]
            StoreKind::Gcs { config, admin } => {
                let admin = gcs_admin(config, admin).await?;
                let request = GetBucketRequest {
                    bucket: container.to_string(),
                    ..Default::default()
                };
                match admin.client.get_bucket(&request).await {
                    Ok(_) => true,
                    Err(e) if gcs_status(&e) == Some(404) => false,
                    Err(e) => {
                        return Err(BackendError::request(
                            format!("checking bucket {} failed", container),
                            e,
                        ))
                    }
                }
            }
        };

        if exists {
            self.remember_container(container).await?;
        }
        Ok(exists)
    }

    async fn create_container(&self, container: &str) -> BackendResult<()> {
        match &self.kind {
            StoreKind::Memory => {
                self.remember(container, Arc::new(InMemory::new())).await;
            }
            #[cfg(feature = "storage-azure")]
            StoreKind::Azure { service, .. } => {
                match service.container_client(container).create().await {
                    Ok(_) => {}
                    // Lost a race with another creator.
                    Err(e) if azure_status(&e) == Some(StatusCode::Conflict) => {}
                    Err(e) => {
                        return Err(BackendError::request(
                            format!("creating container {} failed", container),
                            e,
                        ))
                    }
                }
                self.remember_container(container).await?;
            }
            #[cfg(feature = "storage-gcs")]
            StoreKind::Gcs { config, admin } => {
                let admin = gcs_admin(config, admin).await?;
                let project = admin.project_id.clone().ok_or_else(|| {
                    BackendError::Config(
                        "GCS_PROJECT_ID must be set to create buckets".to_string(),
                    )
                })?;
                let request = InsertBucketRequest {
                    name: container.to_string(),
                    param: InsertBucketParam {
                        project,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                match admin.client.insert_bucket(&request).await {
                    Ok(_) => {}
                    Err(e) if gcs_status(&e) == Some(409) => {}
                    Err(e) => {
                        return Err(BackendError::request(
                            format!("creating bucket {} failed", container),
                            e,
                        ))
                    }
                }
                self.remember_container(container).await?;
            }
        }

        tracing::debug!(
            backend = %self.backend_type(),
            container = %container,
            "Container created"
        );
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        match self.kind {
            StoreKind::Memory => StorageBackend::Memory,
            #[cfg(feature = "storage-azure")]
            StoreKind::Azure { .. } => StorageBackend::Azure,
            #[cfg(feature = "storage-gcs")]
            StoreKind::Gcs { .. } => StorageBackend::Gcs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{bytes_reader, collect_stream};

    #[tokio::test]
    async fn test_memory_round_trip_keeps_content_type() {
        let backend = ObjectStoreBackend::memory();
        backend.create_container("my-bucket").await.unwrap();

        backend
            .put("my-bucket", "docs/readme", bytes_reader(&b"# hello"[..]), "text/markdown")
            .await
            .unwrap();

        let object = backend.get("my-bucket", "docs/readme").await.unwrap();
        assert_eq!(object.content_type.as_deref(), Some("text/markdown"));
        assert_eq!(&collect_stream(object.body).await.unwrap()[..], b"# hello");
    }

    #[tokio::test]
    async fn test_memory_containers() {
        let backend = ObjectStoreBackend::memory();
        assert!(!backend.container_exists("my-bucket").await.unwrap());

        backend.create_container("my-bucket").await.unwrap();
        backend.create_container("my-bucket").await.unwrap();
        assert!(backend.container_exists("my-bucket").await.unwrap());
        assert_eq!(backend.backend_type(), StorageBackend::Memory);
    }

    #[tokio::test]
    async fn test_memory_missing_objects() {
        let backend = ObjectStoreBackend::memory();

        let err = backend.get("nowhere", "key").await.unwrap_err();
        assert!(err.is_not_found());

        let err = backend
            .put("nowhere", "key", bytes_reader(&b"x"[..]), "text/plain")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        backend.create_container("my-bucket").await.unwrap();
        assert!(backend.get("my-bucket", "missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_memory_delete_is_idempotent() {
        let backend = ObjectStoreBackend::memory();
        backend.delete("nowhere", "key").await.unwrap();

        backend.create_container("my-bucket").await.unwrap();
        backend
            .put("my-bucket", "key", bytes_reader(&b"x"[..]), "text/plain")
            .await
            .unwrap();
        backend.delete("my-bucket", "key").await.unwrap();
        backend.delete("my-bucket", "key").await.unwrap();
        assert!(backend.get("my-bucket", "key").await.unwrap_err().is_not_found());
    }

    #[cfg(feature = "storage-azure")]
    fn azure_backend() -> ObjectStoreBackend {
        ObjectStoreBackend::azure(&AzureConfig {
            account: "devstoreaccount1".to_string(),
            access_key: "a2V5".to_string(),
        })
    }

    #[cfg(feature = "storage-azure")]
    #[tokio::test]
    async fn test_unconfirmed_containers_are_not_cached() {
        let backend = azure_backend();
        assert_eq!(backend.backend_type(), StorageBackend::Azure);

        for container in ["ghost-one", "ghost-two", "ghost-three"] {
            assert!(backend.store(container).await.unwrap().is_some());
        }
        assert_eq!(backend.cached_containers().await, 0);

        backend.remember_container("confirmed").await.unwrap();
        assert_eq!(backend.cached_containers().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_is_cached_only_by_create() {
        let backend = ObjectStoreBackend::memory();
        backend.delete("nowhere", "key").await.unwrap();
        assert!(!backend.container_exists("nowhere").await.unwrap());
        assert_eq!(backend.cached_containers().await, 0);

        backend.create_container("my-bucket").await.unwrap();
        assert_eq!(backend.cached_containers().await, 1);
    }

    #[cfg(feature = "storage-gcs")]
    #[tokio::test]
    async fn test_gcs_unreadable_credentials_are_config_errors() {
        let backend = ObjectStoreBackend::gcs(&GcsConfig {
            credentials_path: "/nonexistent/service-account.json".to_string(),
            project_id: Some("stowage-test".to_string()),
        });
        assert_eq!(backend.backend_type(), StorageBackend::Gcs);

        let err = backend.create_container("my-bucket").await.unwrap_err();
        assert!(matches!(err, BackendError::Config(_)), "{:?}", err);
        let err = backend.container_exists("my-bucket").await.unwrap_err();
        assert!(matches!(err, BackendError::Config(_)), "{:?}", err);
        assert_eq!(backend.cached_containers().await, 0);
    }

    #[cfg(any(feature = "storage-azure", feature = "storage-gcs"))]
    fn live_container() -> String {
        format!("stowage-{}", &crate::keys::generate_object_id()[..8])
    }

    #[cfg(feature = "storage-azure")]
    #[tokio::test]
    #[ignore] // Needs AZURE_STORAGE_ACCOUNT and AZURE_STORAGE_KEY for a real account
    async fn test_azure_creates_missing_container() {
        let backend = ObjectStoreBackend::azure(&AzureConfig {
            account: std::env::var("AZURE_STORAGE_ACCOUNT").unwrap(),
            access_key: std::env::var("AZURE_STORAGE_KEY").unwrap(),
        });
        let container = live_container();

        assert!(!backend.container_exists(&container).await.unwrap());
        backend.create_container(&container).await.unwrap();
        backend.create_container(&container).await.unwrap();
        assert!(backend.container_exists(&container).await.unwrap());

        backend
            .put(&container, "docs/readme", bytes_reader(&b"hi"[..]), "text/plain")
            .await
            .unwrap();
        let object = backend.get(&container, "docs/readme").await.unwrap();
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
    }

    #[cfg(feature = "storage-gcs")]
    #[tokio::test]
    #[ignore] // Needs GCS_CREDENTIALS_PATH for a real project
    async fn test_gcs_creates_missing_bucket() {
        let backend = ObjectStoreBackend::gcs(&GcsConfig {
            credentials_path: std::env::var("GCS_CREDENTIALS_PATH").unwrap(),
            project_id: std::env::var("GCS_PROJECT_ID").ok(),
        });
        let bucket = live_container();

        assert!(!backend.container_exists(&bucket).await.unwrap());
        backend.create_container(&bucket).await.unwrap();
        assert!(backend.container_exists(&bucket).await.unwrap());

        backend
            .put(&bucket, "docs/readme", bytes_reader(&b"hi"[..]), "text/plain")
            .await
            .unwrap();
        let object = backend.get(&bucket, "docs/readme").await.unwrap();
        assert_eq!(&collect_stream(object.body).await.unwrap()[..], b"hi");
    }
}
