//! Error taxonomy for config resolution.

use std::fmt;

use thiserror::Error;

/// Errors reported by a forge client.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// The requested file or directory does not exist at this revision.
    #[error("config not found: {path}")]
    NotFound { path: String },

    /// This forge does not implement the requested capability.
    #[error("forge does not implement {operation}")]
    Unsupported { operation: &'static str },

    /// The forge API call failed.
    #[error("forge request failed: {0}")]
    Request(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Absence or missing capability: the cascade moves on without
    /// recording evidence.
    pub fn is_soft_miss(&self) -> bool {
        matches!(
            self,
            ForgeError::NotFound { .. } | ForgeError::Unsupported { .. }
        )
    }
}

/// Result type for forge operations.
pub type ForgeResult<T> = std::result::Result<T, ForgeError>;

/// A forge error observed while probing one candidate.
#[derive(Debug)]
pub struct CandidateFailure {
    pub candidate: String,
    pub error: ForgeError,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate, self.error)
    }
}

/// Every real forge failure seen during one cascade, in candidate order.
#[derive(Debug, Default)]
pub struct FetchFailures {
    failures: Vec<CandidateFailure>,
}

impl FetchFailures {
    pub fn push(&mut self, candidate: impl Into<String>, error: ForgeError) {
        self.failures.push(CandidateFailure {
            candidate: candidate.into(),
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateFailure> {
        self.failures.iter()
    }
}

impl fmt::Display for FetchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchFailures {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| &failure.error as &(dyn std::error::Error + 'static))
    }
}

/// Resolution failures surfaced to callers.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No candidate matched and the forge reported nothing but absence.
    #[error("no config found, searched: {}", .candidates.join(", "))]
    NotFound { candidates: Vec<String> },

    /// Two files collapse to the same logical name.
    #[error("duplicate config file name '{name}' found at paths: '{first}' and '{second}'")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// At least one candidate failed for a reason other than absence.
    #[error("could not fetch config from forge:\n{0}")]
    AggregateFetchFailure(#[source] FetchFailures),

    /// The repository's explicit config location produced nothing usable.
    #[error("user defined config '{config}' not found: {source}")]
    UserOverrideNotFound {
        config: String,
        #[source]
        source: Box<ResolveError>,
    },

    /// The attempt, or the caller's deadline, ran out before the search ended.
    #[error("config resolution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The caller cancelled the resolution.
    #[error("config resolution cancelled")]
    Cancelled,

    #[error("invalid repository config policy: {0}")]
    InvalidPolicy(String),
}

impl ResolveError {
    /// Whether another attempt could produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::NotFound { .. }
            | ResolveError::AggregateFetchFailure(_)
            | ResolveError::Timeout { .. } => true,
            ResolveError::UserOverrideNotFound { source, .. } => source.is_retryable(),
            ResolveError::DuplicateName { .. }
            | ResolveError::Cancelled
            | ResolveError::InvalidPolicy(_) => false,
        }
    }
}

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;
