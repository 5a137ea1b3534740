//! Object identifier generation.
//!
//! Key format: `{directory prefix}/{identifier}`, or just `{identifier}` when the
//! prefix is empty. The identifier is a random v4 UUID in hyphenated lowercase
//! form. No existence check is made before writing.

use uuid::Uuid;

use crate::path::{ObjectLocation, StoragePath, SEPARATOR};

/// Length of the canonical identifier text.
pub const OBJECT_ID_LEN: usize = 36;

/// Generate a fresh object identifier.
pub fn generate_object_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Whether `candidate` is an identifier in the canonical stored form.
pub fn is_object_id(candidate: &str) -> bool {
    candidate.len() == OBJECT_ID_LEN
        && !candidate.bytes().any(|b| b.is_ascii_uppercase())
        && Uuid::try_parse(candidate).is_ok()
}

/// Attach a new identifier to the prefix of `path`.
pub fn compose_upload_key(path: &StoragePath) -> ObjectLocation {
    let id = generate_object_id();
    let key = if path.directory_prefix().is_empty() {
        id
    } else {
        let mut key = path.directory_prefix().join("/");
        key.push(SEPARATOR);
        key.push_str(&id);
        key
    };

    ObjectLocation::from_parts(path.base_container(), key)
}
