//! Logical path handling
//!
//! Raw caller paths are normalized into `/`-separated segments, then split
//! either into a container plus directory prefix (upload) or into a container
//! plus opaque object key (download).

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::{Error, StorageResult};

pub const SEPARATOR: char = '/';

/// Normalizes raw logical paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathNormalizer {
    /// Map spaces inside a segment to hyphens.
    pub replace_spaces: bool,
}

impl PathNormalizer {
    pub fn new(replace_spaces: bool) -> Self {
        PathNormalizer { replace_spaces }
    }

    /// Trim, collapse separator runs and strip outer separators.
    ///
    /// Each segment is trimmed as well, so whitespace next to a separator goes
    /// away. Casing and whitespace inside a segment are left alone unless
    /// `replace_spaces` is set. Fails when nothing is left.
    pub fn normalize(&self, raw: &str) -> StorageResult<String> {
        let segments: Vec<String> = raw
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if self.replace_spaces {
                    segment.replace(' ', "-")
                } else {
                    segment.to_string()
                }
            })
            .collect();

        if segments.is_empty() {
            return Err(Error::InvalidPath(format!(
                "path '{}' is empty after normalization",
                raw
            )));
        }

        Ok(segments.join("/"))
    }
}

/// Normalize with the default normalizer (spaces kept).
pub fn normalize(raw: &str) -> StorageResult<String> {
    PathNormalizer::default().normalize(raw)
}

/// Upload target before the object identifier is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    base_container: String,
    directory_prefix: Vec<String>,
}

impl StoragePath {
    pub fn base_container(&self) -> &str {
        &self.base_container
    }

    pub fn directory_prefix(&self) -> &[String] {
        &self.directory_prefix
    }

    /// Container followed by the prefix segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base_container.as_str())
            .chain(self.directory_prefix.iter().map(String::as_str))
    }
}

impl Display for StoragePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.base_container)?;
        for segment in &self.directory_prefix {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

/// Backend-addressable coordinates of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    container: String,
    key: String,
}

impl ObjectLocation {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> StorageResult<Self> {
        let container = container.into();
        let key = key.into();
        if container.is_empty() || key.is_empty() {
            return Err(Error::InvalidPath(format!(
                "object location '{}{}{}' needs both a container and a key",
                container, SEPARATOR, key
            )));
        }
        Ok(ObjectLocation { container, key })
    }

    /// Both parts must already be non-empty.
    pub(crate) fn from_parts(container: &str, key: String) -> Self {
        ObjectLocation {
            container: container.to_string(),
            key,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored path handed back to callers: `container/key`.
    pub fn stored_path(&self) -> String {
        self.to_string()
    }
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}{}", self.container, SEPARATOR, self.key)
    }
}

/// Split a normalized path into its container and directory prefix.
pub fn split_for_upload(normalized: &str) -> StorageResult<StoragePath> {
    let mut segments = normalized
        .split(SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(String::from);

    let base_container = segments
        .next()
        .ok_or_else(|| Error::InvalidPath(format!("path '{}' has no segments", normalized)))?;

    Ok(StoragePath {
        base_container,
        directory_prefix: segments.collect(),
    })
}

/// Split a normalized stored path at its first separator.
///
/// Everything after the container is treated as an opaque key.
pub fn split_for_download(normalized: &str) -> StorageResult<ObjectLocation> {
    let (container, key) = normalized.split_once(SEPARATOR).ok_or_else(|| {
        Error::InvalidPath(format!(
            "path '{}' has no object key after the container",
            normalized
        ))
    })?;

    ObjectLocation::new(container.trim(), key.trim())
}
