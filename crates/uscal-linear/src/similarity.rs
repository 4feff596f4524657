//! Similarity transform between two index-aligned 3D point sets.
//!
//! Finds `T(p) = s R p + t` minimizing `Σ |T(source[i]) - target[i]|²`:
//!
//! 1. subtract centroids,
//! 2. rotation from the SVD of the cross-covariance (Kabsch), with the
//!    reflection case folded back onto SO(3),
//! 3. scale as the ratio of RMS distances to the centroid (target / source),
//! 4. translation from the centroid difference after rotation and scale.

use log::debug;
use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uscal_core::{Mat3, Pt3, Real, Sim3, Vec3};

/// Minimum number of correspondences for a well-posed 3D similarity.
pub const MIN_CORRESPONDENCES: usize = 3;

/// RMS spread (relative to coordinate magnitude) under which a point set
/// counts as a single point.
const COINCIDENT_TOL: Real = 1e-9;
/// Ratio of the two largest scatter eigenvalues under which a point set
/// counts as a line.
const COLLINEAR_TOL: Real = 1e-12;

/// Which transform family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegistrationMode {
    /// Rotation, translation and one uniform scale.
    #[default]
    Similarity,
    /// Rotation and translation; scale fixed to 1.
    Rigid,
}

/// Errors that can occur while fitting a similarity transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    /// Fewer than [`MIN_CORRESPONDENCES`] pairs.
    #[error("need at least 3 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    /// Source and target have different lengths.
    #[error("source and target point counts differ ({source_len} vs {target_len})")]
    MismatchedLengths { source_len: usize, target_len: usize },
    /// A coordinate is NaN or infinite.
    #[error("{0} points contain non-finite coordinates")]
    NonFinite(&'static str),
    /// Points are coincident or collinear, so the rotation is undefined.
    #[error("{0} points are degenerate (coincident or collinear)")]
    Degenerate(&'static str),
    /// Coordinates are finite but their squared spread overflows.
    #[error("{0} points are too far apart to fit")]
    Overflow(&'static str),
    /// Singular value decomposition did not produce both factors.
    #[error("svd failed in similarity fit")]
    SvdFailed,
    /// The solve finished but the transform has NaN or infinite entries.
    #[error("similarity fit produced a non-finite transform")]
    NonFiniteTransform,
}

/// Fit the transform mapping `source[i]` onto `target[i]`.
///
/// `mode` selects between a full similarity and a rigid fit. Returns an
/// error instead of a transform whenever the problem is under-constrained.
///
/// # Example
///
/// ```
/// use uscal_core::Pt3;
/// use uscal_linear::{fit_similarity, RegistrationMode};
///
/// let source = vec![
///     Pt3::new(0.0, 0.0, 0.0),
///     Pt3::new(1.0, 0.0, 0.0),
///     Pt3::new(0.0, 1.0, 0.0),
/// ];
/// let target: Vec<Pt3> = source.iter().map(|p| Pt3::from(p.coords * 2.0)).collect();
///
/// let sim = fit_similarity(&source, &target, RegistrationMode::Similarity).unwrap();
/// assert!((sim.scaling() - 2.0).abs() < 1e-12);
/// ```
pub fn fit_similarity(
    source: &[Pt3],
    target: &[Pt3],
    mode: RegistrationMode,
) -> Result<Sim3, SimilarityError> {
    let n = source.len();
    if target.len() != n {
        return Err(SimilarityError::MismatchedLengths {
            source_len: n,
            target_len: target.len(),
        });
    }
    if n < MIN_CORRESPONDENCES {
        return Err(SimilarityError::NotEnoughPoints(n));
    }
    if !all_finite(source) {
        return Err(SimilarityError::NonFinite("source"));
    }
    if !all_finite(target) {
        return Err(SimilarityError::NonFinite("target"));
    }

    let c_s = centroid(source);
    let c_t = centroid(target);
    let d_s: Vec<Vec3> = source.iter().map(|p| p.coords - c_s).collect();
    let d_t: Vec<Vec3> = target.iter().map(|p| p.coords - c_t).collect();

    let ss: Real = d_s.iter().map(|d| d.norm_squared()).sum();
    let st: Real = d_t.iter().map(|d| d.norm_squared()).sum();
    if !c_s.iter().all(|v| v.is_finite()) || !ss.is_finite() {
        return Err(SimilarityError::Overflow("source"));
    }
    if !c_t.iter().all(|v| v.is_finite()) || !st.is_finite() {
        return Err(SimilarityError::Overflow("target"));
    }

    if is_degenerate(&d_s, max_abs_coord(source)) {
        return Err(SimilarityError::Degenerate("source"));
    }
    if is_degenerate(&d_t, max_abs_coord(target)) {
        return Err(SimilarityError::Degenerate("target"));
    }

    let mut h = Mat3::zeros();
    for (ds, dt) in d_s.iter().zip(d_t.iter()) {
        h += dt * ds.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(SimilarityError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(SimilarityError::SvdFailed)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }

    let scale = match mode {
        RegistrationMode::Similarity => (st / ss).sqrt(),
        RegistrationMode::Rigid => 1.0,
    };

    let t = c_t - r * c_s * scale;
    if !scale.is_finite() || !r.iter().chain(t.iter()).all(|v| v.is_finite()) {
        return Err(SimilarityError::NonFiniteTransform);
    }
    debug!(
        "similarity fit over {} pairs ({:?}): scale={:.6}, |t|={:.3}",
        n,
        mode,
        scale,
        t.norm()
    );

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    Ok(Sim3::from_parts(Translation3::from(t), rot, scale))
}

fn centroid(points: &[Pt3]) -> Vec3 {
    let mut c = Vec3::zeros();
    for p in points {
        c += p.coords;
    }
    c / points.len() as Real
}

fn all_finite(points: &[Pt3]) -> bool {
    points.iter().all(|p| p.coords.iter().all(|v| v.is_finite()))
}

fn max_abs_coord(points: &[Pt3]) -> Real {
    points.iter().map(|p| p.coords.amax()).fold(0.0, Real::max)
}

/// Coincident or collinear check on centered points.
fn is_degenerate(centered: &[Vec3], magnitude: Real) -> bool {
    let scatter = centered
        .iter()
        .fold(Mat3::zeros(), |acc, d| acc + d * d.transpose());
    let mut ev: Vec<Real> = scatter.symmetric_eigen().eigenvalues.iter().copied().collect();
    ev.sort_by(|a, b| b.total_cmp(a));

    let floor = COINCIDENT_TOL * (1.0 + magnitude);
    if ev[0] <= centered.len() as Real * floor * floor {
        return true;
    }
    ev[1] <= COLLINEAR_TOL * ev[0]
}
