use crate::foundation::core::TimeRange;

/// Convenience result type used across stillreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Structured error kind, naming the stage that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// Rejected parameter set (durations, zoom, transition length, fps, limits).
    InvalidParameter,
    /// Corrupt, zero-size or otherwise unusable source asset.
    InvalidInput,
    /// Memory or time budget exceeded.
    ResourceExhausted,
    /// Codec or container write failure.
    EncodeFailure,
    /// Intermediate artifacts could not be joined.
    ConcatenationFailure,
    /// The host cancelled the render.
    Cancelled,
    /// Lower-level failure (IO, process spawning) without a more specific kind.
    Other,
}

/// Top-level error taxonomy used by render APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided parameters.
    #[error("invalid parameter error: {0}")]
    InvalidParameter(String),

    /// Unusable input asset.
    #[error("invalid input error: {0}")]
    InvalidInput(String),

    /// Memory or time budget exceeded; retry with a smaller chunk or fewer assets.
    #[error("resource exhausted error: {0}")]
    ResourceExhausted(String),

    /// Codec/container write error.
    #[error("encode error: {0}")]
    EncodeFailure(String),

    /// Segment artifacts could not be joined.
    #[error("concatenation error: {0}")]
    ConcatenationFailure(String),

    /// The render was cancelled by the host.
    #[error("render cancelled")]
    Cancelled,

    /// A chunked render failed inside one segment.
    #[error("segment [{:.3}s, {:.3}s) failed: {source}", .range.start, .range.end)]
    Segment {
        /// Timeline time range of the failing segment.
        range: TimeRange,
        /// Underlying failure.
        #[source]
        source: Box<ReelError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::InvalidParameter`] value.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Build a [`ReelError::InvalidInput`] value.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`ReelError::ResourceExhausted`] value.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    /// Build a [`ReelError::EncodeFailure`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::EncodeFailure(msg.into())
    }

    /// Build a [`ReelError::ConcatenationFailure`] value.
    pub fn concat(msg: impl Into<String>) -> Self {
        Self::ConcatenationFailure(msg.into())
    }

    /// Wrap `self` as the failure of the segment covering `range`.
    ///
    /// Cancellation is not attributed to a segment.
    pub fn in_segment(self, range: TimeRange) -> Self {
        match self {
            Self::Cancelled => Self::Cancelled,
            Self::Segment { .. } => self,
            other => Self::Segment {
                range,
                source: Box::new(other),
            },
        }
    }

    /// Structured kind of this error. Segment failures report their inner kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::EncodeFailure(_) => ErrorKind::EncodeFailure,
            Self::ConcatenationFailure(_) => ErrorKind::ConcatenationFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Segment { source, .. } => source.kind(),
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Time range of the failing segment, for chunked render failures.
    pub fn segment_range(&self) -> Option<TimeRange> {
        match self {
            Self::Segment { range, .. } => Some(*range),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
