//! Configuration module
//!
//! Collects the backend selector and the per-backend connection parameters into
//! one struct. It is loaded once at startup and handed to the storage facade;
//! nothing reads the environment after that.

use std::env;

use crate::storage_types::StorageBackend;

const DEFAULT_MINIO_REGION: &str = "us-east-1";

/// Self-hosted object store (MinIO) connection parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Amazon S3 connection parameters
///
/// Without a static key pair the default AWS credential chain is used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Config {
    pub region: String,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Azure Blob Storage connection parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AzureConfig {
    pub account: String,
    pub access_key: String,
}

/// Google Cloud Storage connection parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcsConfig {
    pub credentials_path: String,
    pub project_id: Option<String>,
}

/// Local filesystem parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalConfig {
    pub base_path: String,
}

/// Backend selector together with the parameters that backend needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendConfig {
    Minio(MinioConfig),
    S3(S3Config),
    Azure(AzureConfig),
    Gcs(GcsConfig),
    Local(LocalConfig),
    Memory,
}

impl BackendConfig {
    pub fn backend_type(&self) -> StorageBackend {
        match self {
            BackendConfig::Minio(_) => StorageBackend::Minio,
            BackendConfig::S3(_) => StorageBackend::S3,
            BackendConfig::Azure(_) => StorageBackend::Azure,
            BackendConfig::Gcs(_) => StorageBackend::Gcs,
            BackendConfig::Local(_) => StorageBackend::Local,
            BackendConfig::Memory => StorageBackend::Memory,
        }
    }
}

/// Storage facade configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: BackendConfig,
    /// Map spaces inside path segments to hyphens during normalization.
    pub replace_spaces: bool,
    /// Force the strict (`Some(true)`) or default (`Some(false)`) naming rules
    /// instead of the backend's own choice.
    pub strict_naming: Option<bool>,
}

impl StorageConfig {
    pub fn new(backend: BackendConfig) -> Self {
        StorageConfig {
            backend,
            replace_spaces: false,
            strict_naming: None,
        }
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.backend.backend_type()
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Values are trimmed and empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend_type: StorageBackend = var("STORAGE_SERVICE_TYPE")
            .ok_or_else(|| anyhow::anyhow!("STORAGE_SERVICE_TYPE must be set"))?
            .parse()?;

        let required = |key: &str| {
            var(key).ok_or_else(|| {
                anyhow::anyhow!(
                    "{} must be set when using {} storage backend",
                    key,
                    backend_type
                )
            })
        };

        let backend = match backend_type {
            StorageBackend::Minio => BackendConfig::Minio(MinioConfig {
                endpoint: required("STORAGE_ENDPOINT")?,
                access_key: required("STORAGE_ACCESS_KEY")?,
                secret_key: required("STORAGE_SECRET_KEY")?,
                region: var("STORAGE_REGION").unwrap_or_else(|| DEFAULT_MINIO_REGION.to_string()),
            }),
            StorageBackend::S3 => BackendConfig::S3(S3Config {
                region: var("S3_REGION").or_else(|| var("AWS_REGION")).ok_or_else(|| {
                    anyhow::anyhow!("S3_REGION or AWS_REGION must be set when using s3 storage backend")
                })?,
                endpoint: var("S3_ENDPOINT"),
                access_key_id: var("AWS_ACCESS_KEY_ID"),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            }),
            StorageBackend::Azure => BackendConfig::Azure(AzureConfig {
                account: required("AZURE_STORAGE_ACCOUNT")?,
                access_key: required("AZURE_STORAGE_KEY")?,
            }),
            StorageBackend::Gcs => BackendConfig::Gcs(GcsConfig {
                credentials_path: required("GCS_CREDENTIALS_PATH")?,
                project_id: var("GCS_PROJECT_ID"),
            }),
            StorageBackend::Local => BackendConfig::Local(LocalConfig {
                base_path: required("LOCAL_STORAGE_PATH")?,
            }),
            StorageBackend::Memory => BackendConfig::Memory,
        };

        let config = StorageConfig {
            backend,
            replace_spaces: var("STORAGE_REPLACE_SPACES")
                .unwrap_or_else(|| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            strict_naming: var("STORAGE_STRICT_NAMING")
                .and_then(|value| value.to_lowercase().parse().ok()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters required by the selected backend are present.
    ///
    /// `from_lookup` already enforces presence; this also covers configs that
    /// were assembled in code.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match &self.backend {
            BackendConfig::Minio(minio) => {
                require_non_empty("endpoint", &minio.endpoint, StorageBackend::Minio)?;
                require_non_empty("access_key", &minio.access_key, StorageBackend::Minio)?;
                require_non_empty("secret_key", &minio.secret_key, StorageBackend::Minio)?;
                require_non_empty("region", &minio.region, StorageBackend::Minio)?;
                if !minio.endpoint.starts_with("http://") && !minio.endpoint.starts_with("https://")
                {
                    return Err(anyhow::anyhow!(
                        "STORAGE_ENDPOINT must be an http:// or https:// URL, got {}",
                        minio.endpoint
                    ));
                }
            }
            BackendConfig::S3(s3) => {
                require_non_empty("region", &s3.region, StorageBackend::S3)?;
                if s3.access_key_id.is_some() != s3.secret_access_key.is_some() {
                    return Err(anyhow::anyhow!(
                        "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
                    ));
                }
            }
            BackendConfig::Azure(azure) => {
                require_non_empty("account", &azure.account, StorageBackend::Azure)?;
                require_non_empty("access_key", &azure.access_key, StorageBackend::Azure)?;
            }
            BackendConfig::Gcs(gcs) => {
                require_non_empty("credentials_path", &gcs.credentials_path, StorageBackend::Gcs)?;
            }
            BackendConfig::Local(local) => {
                require_non_empty("base_path", &local.base_path, StorageBackend::Local)?;
            }
            BackendConfig::Memory => {}
        }

        Ok(())
    }
}

fn require_non_empty(
    field: &str,
    value: &str,
    backend: StorageBackend,
) -> Result<(), anyhow::Error> {
    if value.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "{} must not be empty for {} storage backend",
            field,
            backend
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<StorageConfig, anyhow::Error> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StorageConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_minio_config() {
        let config = load(&[
            ("STORAGE_SERVICE_TYPE", "minio"),
            ("STORAGE_ENDPOINT", "http://localhost:9000"),
            ("STORAGE_ACCESS_KEY", "minioadmin"),
            ("STORAGE_SECRET_KEY", "minioadmin"),
        ])
        .unwrap();

        assert_eq!(config.backend_type(), StorageBackend::Minio);
        assert_eq!(
            config.backend,
            BackendConfig::Minio(MinioConfig {
                endpoint: "http://localhost:9000".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                region: "us-east-1".to_string(),
            })
        );
        assert!(!config.replace_spaces);
        assert_eq!(config.strict_naming, None);
    }

    #[test]
    fn test_missing_selector() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("STORAGE_SERVICE_TYPE"));
    }

    #[test]
    fn test_unknown_selector() {
        assert!(load(&[("STORAGE_SERVICE_TYPE", "ftp")]).is_err());
    }

    #[test]
    fn test_minio_missing_secret_names_variable() {
        let err = load(&[
            ("STORAGE_SERVICE_TYPE", "minio"),
            ("STORAGE_ENDPOINT", "http://localhost:9000"),
            ("STORAGE_ACCESS_KEY", "minioadmin"),
            ("STORAGE_SECRET_KEY", "   "),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("STORAGE_SECRET_KEY"));
    }

    #[test]
    fn test_minio_endpoint_must_be_url() {
        let err = load(&[
            ("STORAGE_SERVICE_TYPE", "minio"),
            ("STORAGE_ENDPOINT", "localhost:9000"),
            ("STORAGE_ACCESS_KEY", "a"),
            ("STORAGE_SECRET_KEY", "b"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("STORAGE_ENDPOINT"));
    }

    #[test]
    fn test_s3_region_falls_back_to_aws_region() {
        let config = load(&[("STORAGE_SERVICE_TYPE", "s3"), ("AWS_REGION", "eu-west-1")]).unwrap();
        match config.backend {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.region, "eu-west-1");
                assert_eq!(s3.endpoint, None);
            }
            other => panic!("unexpected backend config: {:?}", other),
        }
    }

    #[test]
    fn test_s3_requires_region() {
        let err = load(&[("STORAGE_SERVICE_TYPE", "s3")]).unwrap_err();
        assert!(err.to_string().contains("S3_REGION"));
    }

    #[test]
    fn test_s3_half_a_key_pair_is_rejected() {
        let err = load(&[
            ("STORAGE_SERVICE_TYPE", "aws"),
            ("S3_REGION", "us-east-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_azure_and_gcs_required_parameters() {
        assert!(load(&[("STORAGE_SERVICE_TYPE", "azure"), ("AZURE_STORAGE_ACCOUNT", "acct")]).is_err());
        assert!(load(&[("STORAGE_SERVICE_TYPE", "gcs")]).is_err());

        let config = load(&[
            ("STORAGE_SERVICE_TYPE", "gcp"),
            ("GCS_CREDENTIALS_PATH", "/etc/gcs.json"),
        ])
        .unwrap();
        assert_eq!(config.backend_type(), StorageBackend::Gcs);
    }

    #[test]
    fn test_flags() {
        let config = load(&[
            ("STORAGE_SERVICE_TYPE", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/stowage"),
            ("STORAGE_REPLACE_SPACES", "TRUE"),
            ("STORAGE_STRICT_NAMING", "true"),
        ])
        .unwrap();
        assert!(config.replace_spaces);
        assert_eq!(config.strict_naming, Some(true));
    }

    #[test]
    fn test_validate_programmatic_config() {
        let config = StorageConfig::new(BackendConfig::Local(LocalConfig {
            base_path: String::new(),
        }));
        assert!(config.validate().is_err());
        assert!(StorageConfig::new(BackendConfig::Memory).validate().is_ok());
    }
}
