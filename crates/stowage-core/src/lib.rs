//! Stowage Core Library
//!
//! This crate provides the configuration surface and the backend selector type
//! shared by the storage facade and its front ends.

pub mod config;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    AzureConfig, BackendConfig, GcsConfig, LocalConfig, MinioConfig, S3Config, StorageConfig,
};
pub use storage_types::StorageBackend;
