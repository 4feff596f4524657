//! Closed-form solvers for ultrasound probe calibration.
//!
//! - [`fit_similarity`]: least-squares rotation + translation + uniform scale
//!   between two index-aligned 3D point sets (SVD / orthogonal Procrustes).
//! - [`reconstruct_probe_landmarks`]: probe-space image corners from measured
//!   probe-footprint corner points and the imaging depth.
//! - [`PixelToMm`]: depth-derived pixel → millimetre scaling of the image.
//! - [`point_residuals`]: per-correspondence distances after applying a
//!   transform.

mod corners;
mod residuals;
mod scale;
mod similarity;

pub use corners::*;
pub use residuals::*;
pub use scale::*;
pub use similarity::*;
