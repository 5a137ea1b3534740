//! Segment naming rules
//!
//! Every caller-supplied path segment, the container included, is checked
//! against the active [`NamingRuleSet`] before any backend call. The strict set
//! mirrors the bucket naming rules of S3-compatible object stores.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, StorageResult};
use crate::StorageBackend;

const MIN_SEGMENT_LEN: usize = 3;
const MAX_SEGMENT_LEN: usize = 63;
const RESERVED_PREFIX: &str = "xn--";
const RESERVED_SUFFIX: &str = "-s3alias";
const FORBIDDEN_SEQUENCES: [&str; 3] = [".-", "--", ".."];

static STRICT_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("strict segment pattern is valid")
});

static IPV4_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").expect("ipv4 pattern is valid")
});

/// First rule a segment broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentViolation {
    TooShort { min: usize },
    TooLong { max: usize },
    ReservedPrefix,
    ForbiddenSequence(&'static str),
    ReservedSuffix,
    IpAddress,
    InvalidCharacters,
}

impl Display for SegmentViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SegmentViolation::TooShort { min } => {
                write!(f, "must be at least {} characters long", min)
            }
            SegmentViolation::TooLong { max } => {
                write!(f, "must be at most {} characters long", max)
            }
            SegmentViolation::ReservedPrefix => {
                write!(f, "must not start with '{}'", RESERVED_PREFIX)
            }
            SegmentViolation::ForbiddenSequence(sequence) => {
                write!(f, "must not contain '{}'", sequence)
            }
            SegmentViolation::ReservedSuffix => {
                write!(f, "must not end with '{}'", RESERVED_SUFFIX)
            }
            SegmentViolation::IpAddress => write!(f, "must not be formatted as an IP address"),
            SegmentViolation::InvalidCharacters => write!(
                f,
                "must contain only lowercase letters, digits and hyphens, and start and end with a letter or digit"
            ),
        }
    }
}

/// Naming rules applied to path segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingRuleSet {
    /// Length bounds only.
    #[default]
    Default,
    /// Bucket-style rules required by self-hosted S3-compatible stores.
    Strict,
}

impl NamingRuleSet {
    /// Rule set a backend needs when nothing overrides it.
    pub fn for_backend(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Minio => NamingRuleSet::Strict,
            _ => NamingRuleSet::Default,
        }
    }

    pub fn min_len(&self) -> usize {
        MIN_SEGMENT_LEN
    }

    pub fn max_len(&self) -> usize {
        MAX_SEGMENT_LEN
    }

    /// Check one segment, reporting the first violated rule.
    pub fn check(&self, segment: &str) -> Result<(), SegmentViolation> {
        let len = segment.chars().count();
        if len < self.min_len() {
            return Err(SegmentViolation::TooShort { min: self.min_len() });
        }
        if len > self.max_len() {
            return Err(SegmentViolation::TooLong { max: self.max_len() });
        }

        if *self == NamingRuleSet::Default {
            return Ok(());
        }

        if segment.starts_with(RESERVED_PREFIX) {
            return Err(SegmentViolation::ReservedPrefix);
        }
        if let Some(sequence) = FORBIDDEN_SEQUENCES
            .iter()
            .copied()
            .find(|sequence| segment.contains(sequence))
        {
            return Err(SegmentViolation::ForbiddenSequence(sequence));
        }
        if segment.ends_with(RESERVED_SUFFIX) {
            return Err(SegmentViolation::ReservedSuffix);
        }
        if IPV4_SHAPE.is_match(segment) {
            return Err(SegmentViolation::IpAddress);
        }
        if !STRICT_SEGMENT.is_match(segment) {
            return Err(SegmentViolation::InvalidCharacters);
        }

        Ok(())
    }

    pub fn is_valid(&self, segment: &str) -> bool {
        self.check(segment).is_ok()
    }
}

pub fn is_valid_segment(segment: &str, rules: NamingRuleSet) -> bool {
    rules.is_valid(segment)
}

/// Validate a single segment, mapping a violation into [`Error::InvalidSegment`].
pub fn validate_segment(segment: &str, rules: NamingRuleSet) -> StorageResult<()> {
    rules.check(segment).map_err(|violation| Error::InvalidSegment {
        segment: segment.to_string(),
        violation,
    })
}

/// Validate segments in order, failing on the first violation.
///
/// An empty sequence is valid.
pub fn validate_all<I, S>(segments: I, rules: NamingRuleSet) -> StorageResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for segment in segments {
        validate_segment(segment.as_ref(), rules)?;
    }
    Ok(())
}
