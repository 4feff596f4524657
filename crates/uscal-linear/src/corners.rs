//! Probe-space image corners from the physical probe footprint.
//!
//! The operator touches two corners on each lateral side of the transducer
//! face (the side carrying the orientation mark and the opposite one). The
//! midpoint of each pair is where the image's top edge meets that side. The
//! image extends away from the face along a per-side depth direction,
//! perpendicular to both the lateral axis and that side's corner edge, for
//! `depth` millimetres.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uscal_core::{PointList, Pt3, Real, Vec3, midpoint};

/// Corner points needed on each side of the probe face.
pub const CORNERS_PER_SIDE: usize = 2;

const DIRECTION_EPS: Real = 1e-12;

/// Lateral side of the transducer face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeSide {
    /// Side carrying the orientation mark.
    Marked,
    Unmarked,
}

impl fmt::Display for ProbeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeSide::Marked => write!(f, "marked"),
            ProbeSide::Unmarked => write!(f, "unmarked"),
        }
    }
}

/// Errors returned by [`reconstruct_probe_landmarks`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CornerError {
    /// A side has fewer than [`CORNERS_PER_SIDE`] corners.
    #[error("insufficient number of {side} corner points selected ({count})")]
    InsufficientPoints { side: ProbeSide, count: usize },
    /// Depth is negative or not a number.
    #[error("depth improperly specified ({0})")]
    InvalidDepth(Real),
    /// The side's corner edge is parallel to the lateral axis (or has zero
    /// length), so its depth direction is undefined.
    #[error("{0} corner edge does not define a depth direction")]
    DegenerateSide(ProbeSide),
}

/// Two measured corners per side, in probe coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeCorners {
    pub marked: [Pt3; 2],
    pub unmarked: [Pt3; 2],
}

impl ProbeCorners {
    /// Take the first two points of each list.
    ///
    /// Extra points beyond the first two are ignored.
    pub fn from_lists(marked: &PointList, unmarked: &PointList) -> Result<Self, CornerError> {
        Ok(Self {
            marked: first_two(marked, ProbeSide::Marked)?,
            unmarked: first_two(unmarked, ProbeSide::Unmarked)?,
        })
    }
}

fn first_two(list: &PointList, side: ProbeSide) -> Result<[Pt3; 2], CornerError> {
    match (list.get(0), list.get(1)) {
        (Some(a), Some(b)) => Ok([a.position, b.position]),
        _ => Err(CornerError::InsufficientPoints {
            side,
            count: list.len(),
        }),
    }
}

/// The four probe-space landmarks plus the depth directions used to build
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeLandmarks {
    pub unmarked_near: Pt3,
    pub marked_near: Pt3,
    pub unmarked_far: Pt3,
    pub marked_far: Pt3,
    /// Unit depth direction on the marked side.
    pub marked_direction: Vec3,
    /// Unit depth direction on the unmarked side.
    pub unmarked_direction: Vec3,
}

impl ProbeLandmarks {
    /// Landmarks in the fixed order unmarked-near, marked-near, unmarked-far,
    /// marked-far. This matches the image corner order of
    /// [`crate::PixelToMm::image_corners_mm`].
    pub fn ordered(&self) -> [Pt3; 4] {
        [
            self.unmarked_near,
            self.marked_near,
            self.unmarked_far,
            self.marked_far,
        ]
    }
}

/// Build the four probe-space image corners from the footprint and depth.
///
/// Each side gets its own depth direction; the two sides need not be
/// coplanar.
pub fn reconstruct_probe_landmarks(
    corners: &ProbeCorners,
    depth: Real,
) -> Result<ProbeLandmarks, CornerError> {
    if !depth.is_finite() || depth < 0.0 {
        return Err(CornerError::InvalidDepth(depth));
    }

    let [m1, m2] = corners.marked;
    let [u1, u2] = corners.unmarked;

    let marked_near = midpoint(&m1, &m2);
    let unmarked_near = midpoint(&u1, &u2);
    let across = unmarked_near - marked_near;

    let marked_direction = across
        .cross(&(m2 - m1))
        .try_normalize(DIRECTION_EPS)
        .ok_or(CornerError::DegenerateSide(ProbeSide::Marked))?;
    let unmarked_direction = across
        .cross(&(u2 - u1))
        .try_normalize(DIRECTION_EPS)
        .ok_or(CornerError::DegenerateSide(ProbeSide::Unmarked))?;

    Ok(ProbeLandmarks {
        unmarked_near,
        marked_near,
        unmarked_far: unmarked_near + unmarked_direction * depth,
        marked_far: marked_near + marked_direction * depth,
        marked_direction,
        unmarked_direction,
    })
}
