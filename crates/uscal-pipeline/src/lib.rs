//! Calibration sessions for tracked ultrasound probes.
//!
//! Two methods produce the `ImageToProbe` transform:
//!
//! - [`imageless`]: from two corner points on each side of the transducer
//!   face, the imaging depth, and the image size.
//! - [`pointer`]: from image/probe point pairs collected with a tracked
//!   stylus.
//!
//! Sessions own their point lists and recompute on every change. Results
//! are returned as [`session::RecomputeOutcome`] values and optionally
//! published to a shared [`session::TransformHandle`].

pub mod imageless;
pub mod pointer;
pub mod session;

pub use imageless::{ImagelessConfig, ImagelessSession};
pub use pointer::{PairingError, PointerConfig, PointerSession};
pub use session::{CalibrationStatus, FailureKind, RecomputeOutcome, TransformHandle};
