//! Load failure reporting.

use std::fmt;

use thiserror::Error;

use super::entry::AssetId;

/// Why a single asset could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The identifier was empty.
    EmptyIdentifier,
    /// Nothing exists at the resolved location.
    NotFound,
    /// Reading the asset failed.
    Io(String),
    /// The bytes could not be decoded as an image.
    Decode(String),
    /// A custom loader reported an error.
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyIdentifier => write!(f, "empty identifier"),
            Self::NotFound => write!(f, "not found"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

/// An asset's fetch or decode failed.
///
/// Failures are never cached and never retried by the cache; the caller
/// decides whether to fall back to another asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load {id}: {reason}")]
pub struct LoadFailure {
    /// The identifier that failed.
    pub id: AssetId,
    /// What went wrong.
    pub reason: FailureReason,
}

impl LoadFailure {
    #[must_use]
    pub fn new(id: AssetId, reason: FailureReason) -> Self {
        Self { id, reason }
    }

    /// Shorthand for a loader-specific failure message.
    #[must_use]
    pub fn other(id: AssetId, message: impl Into<String>) -> Self {
        Self::new(id, FailureReason::Other(message.into()))
    }
}
