//! Error types for layout passes.
//!
//! Only `InvalidRange`, `InvalidOptions` and `InvariantViolation` abort a
//! pass. `UnlayoutableMeasure` is reported back through the
//! [`LayoutReport`](crate::layout::LayoutReport) warnings and the measure is
//! still placed.

use thiserror::Error;

use crate::fraction::Fraction;

pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Range passed to a range layout is reversed or outside the score.
    #[error("invalid layout range {from}..{to} (score ends at {end})")]
    InvalidRange {
        from: Fraction,
        to: Fraction,
        end: Fraction,
    },

    /// A measure's intrinsic width could not be computed.
    #[error("measure {index} cannot be laid out: {reason}")]
    UnlayoutableMeasure { index: usize, reason: String },

    /// Post-pass consistency check failed; nothing was committed.
    #[error("layout invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid layout options: {0}")]
    InvalidOptions(String),

    /// JSON encoding or decoding failed at the document boundary.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LayoutError {
    pub(crate) fn unlayoutable(index: usize, reason: impl Into<String>) -> Self {
        LayoutError::UnlayoutableMeasure {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        LayoutError::InvariantViolation(msg.into())
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        LayoutError::Serialization(e.to_string())
    }
}
