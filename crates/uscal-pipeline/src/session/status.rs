//! Outcome of a recomputation.

use serde::{Deserialize, Serialize};
use uscal_core::Mat4;
use uscal_linear::{CornerError, ProbeSide, ScaleError, SimilarityError};

/// Broad class of a failed recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Not enough points, no depth, or no image.
    InsufficientInput,
    /// Paired lists differ in length.
    SynchronizationFault,
    /// Points are coincident, collinear, or otherwise unusable.
    DegenerateGeometry,
}

/// Status of the most recent recomputation.
///
/// Failures are values, not errors: a session keeps running and simply
/// reports why no new transform was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationStatus {
    Success,
    InsufficientMarkedPoints { count: usize },
    InsufficientUnmarkedPoints { count: usize },
    /// Depth missing, negative, non-numeric, or above the configured limit.
    InvalidDepth,
    NoImage,
    NotEnoughPairs { count: usize, required: usize },
    /// One list leads by a single entry whose counterpart is still missing.
    IncompletePair { image: usize, probe: usize },
    /// The lists drifted apart by more than one entry.
    Unsynchronized { image: usize, probe: usize },
    Degenerate { reason: String },
}

impl CalibrationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CalibrationStatus::Success)
    }

    /// `None` for [`CalibrationStatus::Success`].
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CalibrationStatus::Success => None,
            CalibrationStatus::InsufficientMarkedPoints { .. }
            | CalibrationStatus::InsufficientUnmarkedPoints { .. }
            | CalibrationStatus::InvalidDepth
            | CalibrationStatus::NoImage
            | CalibrationStatus::NotEnoughPairs { .. }
            | CalibrationStatus::IncompletePair { .. } => Some(FailureKind::InsufficientInput),
            CalibrationStatus::Unsynchronized { .. } => Some(FailureKind::SynchronizationFault),
            CalibrationStatus::Degenerate { .. } => Some(FailureKind::DegenerateGeometry),
        }
    }

    /// Operator-facing status line.
    pub fn message(&self) -> String {
        match self {
            CalibrationStatus::Success => "Success!".to_string(),
            CalibrationStatus::InsufficientMarkedPoints { .. } => {
                "Insufficient number of marked corner points selected.".to_string()
            }
            CalibrationStatus::InsufficientUnmarkedPoints { .. } => {
                "Insufficient number of unmarked corner points selected.".to_string()
            }
            CalibrationStatus::InvalidDepth => "Depth improperly specified.".to_string(),
            CalibrationStatus::NoImage => "No ultrasound image is selected.".to_string(),
            CalibrationStatus::NotEnoughPairs { count, required } => format!(
                "Insufficient number of point pairs selected ({count} of {required})."
            ),
            CalibrationStatus::IncompletePair { .. } => {
                "Waiting for the matching point of the last pair.".to_string()
            }
            CalibrationStatus::Unsynchronized { .. } => {
                "Image and probe points lists have become unsynchronized.".to_string()
            }
            CalibrationStatus::Degenerate { reason } => {
                format!("Point configuration is degenerate: {reason}.")
            }
        }
    }
}

impl From<SimilarityError> for CalibrationStatus {
    fn from(err: SimilarityError) -> Self {
        match err {
            SimilarityError::NotEnoughPoints(count) => CalibrationStatus::NotEnoughPairs {
                count,
                required: uscal_linear::MIN_CORRESPONDENCES,
            },
            SimilarityError::MismatchedLengths {
                source_len,
                target_len,
            } => CalibrationStatus::Unsynchronized {
                image: source_len,
                probe: target_len,
            },
            other => CalibrationStatus::Degenerate {
                reason: other.to_string(),
            },
        }
    }
}

impl From<CornerError> for CalibrationStatus {
    fn from(err: CornerError) -> Self {
        match err {
            CornerError::InsufficientPoints {
                side: ProbeSide::Marked,
                count,
            } => CalibrationStatus::InsufficientMarkedPoints { count },
            CornerError::InsufficientPoints {
                side: ProbeSide::Unmarked,
                count,
            } => CalibrationStatus::InsufficientUnmarkedPoints { count },
            CornerError::InvalidDepth(_) => CalibrationStatus::InvalidDepth,
            CornerError::DegenerateSide(_) => CalibrationStatus::Degenerate {
                reason: err.to_string(),
            },
        }
    }
}

impl From<ScaleError> for CalibrationStatus {
    fn from(err: ScaleError) -> Self {
        match err {
            ScaleError::NoImage => CalibrationStatus::NoImage,
            ScaleError::InvalidDepth(_) => CalibrationStatus::InvalidDepth,
        }
    }
}

/// Result of one recomputation.
///
/// `transform` is set only on success; on failure the session keeps the
/// previously computed transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    pub status: CalibrationStatus,
    pub transform: Option<Mat4>,
}

impl RecomputeOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
