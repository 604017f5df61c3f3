//! Storage object references.
//!
//! Every conversion is keyed by the source object it was asked to convert.
//! The output and lock locations are derived deterministically from the
//! source so that repeated requests for the same object always resolve to
//! the same downstream keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Namespace prefix under which converted videos are stored.
pub const CONVERTED_PREFIX: &str = "anime_converted/";

/// Suffix appended to an output key to form its lock marker key.
pub const LOCK_SUFFIX: &str = ".lock";

/// Result type for reference construction.
pub type RefResult<T> = Result<T, RefError>;

/// Errors raised while validating object references.
#[derive(Debug, Error)]
pub enum RefError {
    #[error("Bucket name must not be empty")]
    EmptyBucket,

    #[error("Object key must not be empty")]
    EmptyKey,

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// Reference to an uploaded source video: bucket + object key.
///
/// Immutable once a request is accepted; all downstream identifiers are
/// derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Storage bucket name
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl SourceRef {
    /// Create a validated source reference.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> RefResult<Self> {
        let bucket = bucket.into();
        let key = key.into();

        if bucket.is_empty() {
            return Err(RefError::EmptyBucket);
        }
        validate_key(&key)?;

        Ok(Self { bucket, key })
    }

    /// Derive the output location for this source.
    ///
    /// Same source always yields the same output key, which is what makes
    /// the result cache and the lock effective across requests.
    pub fn output_ref(&self) -> OutputRef {
        OutputRef {
            bucket: self.bucket.clone(),
            key: format!("{}{}", CONVERTED_PREFIX, self.key),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Reference to the converted output object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// Storage bucket name
    pub bucket: String,
    /// Derived object key (`anime_converted/` + source key)
    pub key: String,
}

impl OutputRef {
    /// Derive the lock marker location for this output.
    pub fn lock_ref(&self) -> LockRef {
        LockRef {
            bucket: self.bucket.clone(),
            key: format!("{}{}", self.key, LOCK_SUFFIX),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Reference to a transient lock marker object.
///
/// Only its presence matters; the content is a small timestamp payload
/// used for stale-lock reclamation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockRef {
    /// Storage bucket name
    pub bucket: String,
    /// Derived object key (output key + `.lock`)
    pub key: String,
}

impl fmt::Display for LockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Validate an object key: non-empty, no absolute paths, no traversal.
fn validate_key(key: &str) -> RefResult<()> {
    if key.is_empty() {
        return Err(RefError::EmptyKey);
    }
    if key.starts_with('/') {
        return Err(RefError::InvalidKey("key must be relative".to_string()));
    }
    if key.split('/').any(|seg| seg == "..") {
        return Err(RefError::InvalidKey(
            "key must not contain path traversal".to_string(),
        ));
    }
    if key.contains('\0') {
        return Err(RefError::InvalidKey("key contains NUL byte".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_ref_derivation() {
        let source = SourceRef::new("videos", "uploads/cat.mp4").unwrap();
        let output = source.output_ref();
        assert_eq!(output.bucket, "videos");
        assert_eq!(output.key, "anime_converted/uploads/cat.mp4");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = SourceRef::new("b", "k.mp4").unwrap();
        let b = SourceRef::new("b", "k.mp4").unwrap();
        assert_eq!(a.output_ref(), b.output_ref());
        assert_eq!(a.output_ref().lock_ref(), b.output_ref().lock_ref());
    }

    #[test]
    fn test_lock_ref_suffix() {
        let source = SourceRef::new("videos", "cat.mp4").unwrap();
        let lock = source.output_ref().lock_ref();
        assert_eq!(lock.key, "anime_converted/cat.mp4.lock");
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(SourceRef::new("videos", "").is_err());
    }

    #[test]
    fn test_rejects_empty_bucket() {
        assert!(SourceRef::new("", "cat.mp4").is_err());
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(SourceRef::new("videos", "../secrets").is_err());
        assert!(SourceRef::new("videos", "a/../../b").is_err());
        assert!(SourceRef::new("videos", "/etc/passwd").is_err());
    }

    #[test]
    fn test_dotted_filenames_allowed() {
        // ".." must only be rejected as a path segment, not as a substring
        assert!(SourceRef::new("videos", "my..video.mp4").is_ok());
    }
}
