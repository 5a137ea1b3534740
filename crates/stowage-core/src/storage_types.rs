use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Selects which backend adapter the facade is built on. The value is read
/// once at startup and never consulted again after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Self-hosted S3-compatible object store (MinIO).
    Minio,
    /// Amazon S3.
    S3,
    /// Azure Blob Storage.
    Azure,
    /// Google Cloud Storage.
    Gcs,
    /// Local filesystem, one directory per container.
    Local,
    /// Process-local in-memory store.
    Memory,
}

impl StorageBackend {
    pub const ALL: [StorageBackend; 6] = [
        StorageBackend::Minio,
        StorageBackend::S3,
        StorageBackend::Azure,
        StorageBackend::Gcs,
        StorageBackend::Local,
        StorageBackend::Memory,
    ];
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minio" => Ok(StorageBackend::Minio),
            "s3" | "aws" => Ok(StorageBackend::S3),
            "azure" => Ok(StorageBackend::Azure),
            "gcs" | "gcp" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Minio => write!(f, "minio"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Azure => write!(f, "azure"),
            StorageBackend::Gcs => write!(f, "gcs"),
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}
