use thiserror::Error;

pub type TemporalResult<T> = Result<T, TemporalError>;

/// The error taxonomy of the whole engine.
///
/// Constructors raise `InvariantViolated`; cross-type operations raise
/// `DomainMismatch`; parsers raise `Parse` with the byte offset of the
/// offending input where one is known. The index support layer never
/// surfaces errors to callers, it degrades to lossy answers instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalError {
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("domain mismatch: {0}")]
    DomainMismatch(String),

    #[error("the {0} dimension is missing")]
    DimensionMissing(&'static str),

    #[error("result is not contiguous: {0}")]
    NotContiguous(&'static str),

    #[error("parse error at byte {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("arithmetic error: {0}")]
    Arithmetic(&'static str),

    #[error("operation cancelled")]
    Cancelled,
}

impl TemporalError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolated(message.into())
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::DomainMismatch(message.into())
    }

    pub fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }
}
