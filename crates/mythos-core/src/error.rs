//! Stable error codes and the typed errors that carry them.
//!
//! `anyhow` contexts describe what failed; [`error_code`] classifies a
//! finished error chain into a stable code that callers (CLIs, servers,
//! agents) can branch on without string matching.

use std::fmt;

use crate::model::UnknownEntityKind;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    UnknownEntityKind,
    FtsIndexMissing,
    VectorIndexMissing,
    RerankServiceUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::UnknownEntityKind => "E2001",
            Self::FtsIndexMissing => "E6001",
            Self::VectorIndexMissing => "E6002",
            Self::RerankServiceUnavailable => "E7001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::UnknownEntityKind => "Unknown entity kind",
            Self::FtsIndexMissing => "Full-text index missing",
            Self::VectorIndexMissing => "Vector index missing",
            Self::RerankServiceUnavailable => "Rerank service unavailable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .mythos/config.toml and retry."),
            Self::UnknownEntityKind => {
                Some("Use one of: faction, region, character.")
            }
            Self::FtsIndexMissing => {
                Some("Run the schema migration to create the entities_fts index.")
            }
            Self::VectorIndexMissing => {
                Some("Populate entity_embeddings before enabling semantic search.")
            }
            Self::RerankServiceUnavailable => {
                Some("Check the rerank endpoint; results fall back to fused ordering.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Typed failure of an on-disk search index.
///
/// Raised at the statement-preparation boundary, where a missing table is
/// distinguishable from a bad query.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("full-text index missing or unreadable: {0}")]
    FtsMissing(#[source] rusqlite::Error),
    #[error("vector index missing or unreadable: {0}")]
    VectorMissing(#[source] rusqlite::Error),
}

impl IndexError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::FtsMissing(_) => ErrorCode::FtsIndexMissing,
            Self::VectorMissing(_) => ErrorCode::VectorIndexMissing,
        }
    }
}

/// Classify an error chain into a stable code.
///
/// Walks the chain looking for a typed cause; anything unrecognized is
/// `InternalUnexpected`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> ErrorCode {
    for cause in err.chain() {
        if let Some(index) = cause.downcast_ref::<IndexError>() {
            return index.code();
        }
        if cause.downcast_ref::<UnknownEntityKind>().is_some() {
            return ErrorCode::UnknownEntityKind;
        }
        if cause.downcast_ref::<toml::de::Error>().is_some() {
            return ErrorCode::ConfigParseError;
        }
    }
    ErrorCode::InternalUnexpected
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
