//! Stowage Storage Library
//!
//! A backend-agnostic object storage facade. Callers hand over a logical path
//! and a byte stream; the facade validates and resolves the path, attaches a
//! fresh object identifier and dispatches the transfer to one configured
//! backend (MinIO, Amazon S3, Azure Blob Storage, Google Cloud Storage, the
//! local filesystem or an in-memory store).
//!
//! # Stored path format
//!
//! Every upload returns `container[/segment]*/identifier`, where the first
//! segment names the container (bucket) and the identifier is a hyphenated
//! lowercase v4 UUID. Downloads split that string at the first `/` only: the
//! container comes first and everything after it is the object key.

pub mod cloud;
pub mod error;
pub mod facade;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod naming;
pub mod path;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod sniff;
pub mod traits;

// Re-export commonly used types
pub use cloud::ObjectStoreBackend;
pub use error::{BackendError, BackendResult, Error, Operation, StorageError, StorageResult};
pub use facade::{StorageFacade, StoredObject};
pub use factory::create_backend;
pub use keys::{compose_upload_key, generate_object_id, is_object_id};
#[cfg(feature = "storage-local")]
pub use local::LocalBackend;
pub use naming::{is_valid_segment, validate_all, validate_segment, NamingRuleSet, SegmentViolation};
pub use path::{normalize, split_for_download, split_for_upload, ObjectLocation, PathNormalizer, StoragePath};
#[cfg(feature = "storage-s3")]
pub use s3::S3Backend;
pub use stowage_core::StorageBackend;
pub use traits::{bytes_reader, BackendAdapter, BackendObject, ByteReader, ByteStream};
