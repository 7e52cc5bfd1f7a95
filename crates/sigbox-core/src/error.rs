//! Error types for container operations.

use std::path::Path;

use sigbox_trust::TrustError;
use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur while creating, signing or editing containers.
///
/// Every variant carries a message fit for the API boundary; the HTTP layer
/// renders `to_string()` as the error body.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A required field was empty or unusable.
    #[error("{message}")]
    Validation { message: String },

    /// A container with this name already exists.
    #[error("Container with that name already exists: {name}")]
    NameConflict { name: String },

    /// The container does not exist.
    #[error("Container not found: {name}")]
    NotFound { name: String },

    /// The trust service did not produce a signature.
    #[error("signing failed: {0}")]
    Signing(#[source] TrustError),

    /// Every signature candidate in the container was undecodable.
    #[error("could not decode signature {entry}: {reason}")]
    Decode { entry: String, reason: String },

    /// A manifest/signature pair is broken inside the container.
    #[error("container {name} is inconsistent: {message}")]
    Inconsistent { name: String, message: String },

    /// The zip structure could not be read or written.
    #[error("archive error in {path}: {message}")]
    Archive { path: String, message: String },

    /// Storage read/write error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ContainerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn archive(path: impl AsRef<Path>, err: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true if the error was raised before any mutation was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if a container with the same name already exists.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, Self::NameConflict { .. })
    }

    /// Returns true if the container was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the trust service failed.
    pub fn is_signing_failure(&self) -> bool {
        matches!(self, Self::Signing(_))
    }

    /// Short stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NameConflict { .. } => "name_conflict",
            Self::NotFound { .. } => "not_found",
            Self::Signing(_) => "signing",
            Self::Decode { .. } => "decode",
            Self::Inconsistent { .. } => "inconsistent",
            Self::Archive { .. } => "archive",
            Self::Io { .. } => "io",
        }
    }
}

impl From<TrustError> for ContainerError {
    fn from(err: TrustError) -> Self {
        Self::Signing(err)
    }
}
