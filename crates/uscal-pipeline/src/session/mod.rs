//! Building blocks shared by the calibration sessions.
//!
//! A session owns its point lists and parameters. Every mutation triggers a
//! synchronous recomputation whose [`RecomputeOutcome`] is returned to the
//! caller; the latest status and transform stay on the session in a
//! [`CalibrationOutput`] and are optionally pushed to a [`TransformHandle`].

pub mod journal;
pub mod output;
pub mod status;

pub use journal::{LogEntry, SessionMetadata};
pub use output::{CalibrationOutput, TransformHandle};
pub use status::{CalibrationStatus, FailureKind, RecomputeOutcome};
