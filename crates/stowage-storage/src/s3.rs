use crate::error::{BackendError, BackendResult};
use crate::traits::{read_all, BackendAdapter, BackendObject, ByteReader};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use futures::StreamExt;
use stowage_core::{MinioConfig, S3Config};
use tokio_util::io::ReaderStream;

const US_EAST_1: &str = "us-east-1";
const NO_SUCH_BUCKET: &str = "NoSuchBucket";

/// S3-compatible backend
///
/// Serves both Amazon S3 and self-hosted MinIO. Containers are buckets.
#[derive(Clone, Debug)]
pub struct S3Backend {
    client: Client,
    backend: StorageBackend,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Backend {
    /// Connect to a MinIO deployment with static credentials and path-style
    /// addressing.
    pub async fn minio(config: &MinioConfig) -> BackendResult<Self> {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "stowage-static",
        );
        Self::connect(
            StorageBackend::Minio,
            config.region.clone(),
            Some(config.endpoint.clone()),
            Some(credentials),
        )
        .await
    }

    /// Connect to Amazon S3 (or an S3-compatible endpoint).
    ///
    /// Without a static key pair the default AWS credential chain is used.
    pub async fn s3(config: &S3Config) -> BackendResult<Self> {
        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Some(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "stowage-static",
            )),
            (None, None) => None,
            _ => {
                return Err(BackendError::Config(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together".to_string(),
                ))
            }
        };
        Self::connect(
            StorageBackend::S3,
            config.region.clone(),
            config.endpoint.clone(),
            credentials,
        )
        .await
    }

    async fn connect(
        backend: StorageBackend,
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<Credentials>,
    ) -> BackendResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(ref endpoint) = endpoint_url {
            // Path-style addressing is required for MinIO and most S3-compatible providers
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let Some(credentials) = credentials {
            builder = builder.credentials_provider(credentials);
        }

        let client = Client::from_conf(builder.build());

        tracing::info!(
            backend = %backend,
            region = %region,
            endpoint = ?endpoint_url,
            "S3 client configured"
        );

        Ok(S3Backend {
            client,
            backend,
            region,
            endpoint_url,
        })
    }

    /// AWS rejects an explicit `us-east-1` constraint; custom endpoints take none.
    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        if self.endpoint_url.is_some() || self.region == US_EAST_1 {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

fn is_no_such_bucket<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    err.as_service_error().and_then(|e| e.code()) == Some(NO_SUCH_BUCKET)
}

#[async_trait]
impl BackendAdapter for S3Backend {
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: ByteReader,
        content_type: &str,
    ) -> BackendResult<u64> {
        let body = read_all(data).await?;
        let size = body.len() as u64;
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %container,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                if is_no_such_bucket(&e) {
                    BackendError::not_found(container, key)
                } else {
                    BackendError::request(format!("S3 put_object {}/{} failed", container, key), e)
                }
            })?;

        tracing::info!(
            bucket = %container,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(size)
    }

    async fn get(&self, container: &str, key: &str) -> BackendResult<BackendObject> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = matches!(e.as_service_error(), Some(GetObjectError::NoSuchKey(_)))
                    || is_no_such_bucket(&e);
                if missing {
                    return BackendError::not_found(container, key);
                }
                tracing::error!(
                    error = %e,
                    bucket = %container,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                BackendError::request(format!("S3 get_object {}/{} failed", container, key), e)
            })?;

        let content_type = response.content_type().map(String::from);

        // ByteStream -> AsyncRead -> Stream<Item = Result<Bytes, BackendError>>
        let bucket = container.to_string();
        let object_key = key.to_string();
        let stream = ReaderStream::new(response.body.into_async_read()).map(move |item| {
            item.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %object_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                BackendError::Io(e)
            })
        });

        tracing::info!(
            bucket = %container,
            key = %key,
            content_type = ?content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download started"
        );

        Ok(BackendObject {
            body: Box::pin(stream),
            content_type,
        })
    }

    async fn delete(&self, container: &str, key: &str) -> BackendResult<()> {
        let start = std::time::Instant::now();

        // S3 reports success for absent keys; a missing bucket means nothing to delete either.
        match self
            .client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) if is_no_such_bucket(&e) => return Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %container,
                    key = %key,
                    "S3 delete failed"
                );
                return Err(BackendError::request(
                    format!("S3 delete_object {}/{} failed", container, key),
                    e,
                ));
            }
        }

        tracing::info!(
            bucket = %container,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn container_exists(&self, container: &str) -> BackendResult<bool> {
        match self.client.head_bucket().bucket(container).send().await {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.as_service_error(), Some(HeadBucketError::NotFound(_))) => {
                Ok(false)
            }
            Err(e) => Err(BackendError::request(
                format!("S3 head_bucket {} failed", container),
                e,
            )),
        }
    }

    async fn create_container(&self, container: &str) -> BackendResult<()> {
        let result = self
            .client
            .create_bucket()
            .bucket(container)
            .set_create_bucket_configuration(self.location_constraint())
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(bucket = %container, region = %self.region, "S3 bucket created");
                Ok(())
            }
            // Another upload provisioned it first
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(CreateBucketError::BucketAlreadyOwnedByYou(_))
                ) =>
            {
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, bucket = %container, "S3 create bucket failed");
                Err(BackendError::request(
                    format!("S3 create_bucket {} failed", container),
                    e,
                ))
            }
        }
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}
