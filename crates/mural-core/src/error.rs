//! Typed failure taxonomy for the engine surface.
//!
//! Every public operation returns [`Result`]. The four domain kinds map
//! one-to-one onto transport-level responses; [`Error::code`] gives the
//! stable machine-readable identifier a REST layer should emit. Storage
//! failures are wrapped, never swallowed.

use thiserror::Error;

/// Engine error. All variants are local, synchronous and non-retriable;
/// transient-storage retries belong to the calling transport layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced user, project or content item does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A capability check failed. Deliberately distinct from `NotFound`
    /// so callers can avoid leaking existence through permission errors.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Malformed input: unsupported language tag, empty required text,
    /// out-of-range pagination bound, self-referential relation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A unique relation row already exists (e.g. double bookmark cast
    /// through a path that skipped the `can_bookmark` pre-check).
    #[error("conflict: {0} already exists")]
    Conflict(&'static str),

    /// Underlying SQLite failure.
    #[error("storage error")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    /// Stable snake_case identifier for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }

    /// Re-map a unique-constraint violation into [`Error::Conflict`],
    /// leaving every other storage failure untouched.
    pub(crate) fn conflict_on_unique(err: rusqlite::Error, what: &'static str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(what)
            }
            other => Self::Storage(other),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
