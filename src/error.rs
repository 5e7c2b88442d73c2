//! Error taxonomy shared by the repositories, the upload pipeline and the
//! admin session.
//!
//! Every variant is non-fatal: callers surface it to the admin and keep the
//! working collections and any open draft intact.
use thiserror::Error;

use crate::model::EntityKind;

pub type Result<T, E = ContentError> = std::result::Result<T, E>;

/// Client-detectable bad input. Never reaches the remote store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid file type '{0}': only image/* uploads are accepted")]
    InvalidFileType(String),
    #[error("file is {size} bytes; the upload limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("'{0}' is not a server-issued identifier")]
    InvalidIdentifier(String),
    #[error("{0} records have no image field")]
    NoImageField(EntityKind),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("{table} record '{id}' not found")]
    NotFound { table: &'static str, id: String },
    #[error("content store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("storage bucket '{0}' does not exist")]
    BucketMissing(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("storage object '{0}' already exists")]
    DuplicateName(String),
    #[error("uploaded '{0}' but could not resolve its public URL")]
    UrlResolutionFailed(String),
    #[error("a {0} save is already in flight")]
    Busy(EntityKind),
    #[error("no {0} draft is open")]
    NoDraft(EntityKind),
}

impl ContentError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        ContentError::StoreUnavailable(err.to_string())
    }

    /// Operator-facing hint for how to recover.
    pub fn remedy(&self) -> &'static str {
        match self {
            ContentError::ValidationFailed(_) => "correct the highlighted input and save again",
            ContentError::NotFound { .. } => "the record was removed remotely; reload the list",
            ContentError::StoreUnavailable(_) => "check connectivity and credentials, then retry",
            ContentError::BucketMissing(_) => "provision the storage bucket before uploading",
            ContentError::PermissionDenied(_) => "grant write access in the storage policy",
            ContentError::DuplicateName(_) => "object naming collided; report this as a bug",
            ContentError::UrlResolutionFailed(_) => "check the bucket is public, then re-upload",
            ContentError::Busy(_) => "wait for the pending save to finish",
            ContentError::NoDraft(_) => "open a record for editing first",
        }
    }

    /// Whether a user-initiated retry of the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContentError::StoreUnavailable(_) | ContentError::Busy(_)
        )
    }
}
