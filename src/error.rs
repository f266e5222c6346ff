//! Error types for the rating engine.

use std::path::PathBuf;
use thiserror::Error;

/// Everything a rating operation can fail with.
///
/// Non-numeric score input is not an error: it is coerced to `N/A` when the
/// submission is built.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("`{0}` already exists")]
    DuplicateName(String),

    #[error("no submission named `{0}`")]
    EntryNotFound(String),

    #[error("ratings file {path} is malformed: {reason}")]
    MalformedStore { path: PathBuf, reason: String },

    #[error("notification channel `{0}` is not configured")]
    MissingCollaboratorChannel(String),

    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("`{0}` is not allowed to drop submissions")]
    Forbidden(String),
}

impl RatingError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RatingError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RatingError>;
