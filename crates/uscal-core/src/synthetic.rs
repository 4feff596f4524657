//! The functions here avoid thread-local RNGs. Every sample is a pure
//! function of an explicit seed and index, so synthetic datasets are stable
//! across versions and platforms.
//!
//! # Example
//!
//! ```
//! use uscal_core::synthetic::{apply_similarity, random_points, random_similarity};
//!
//! let source = random_points(7, 6, 50.0);
//! let sim = random_similarity(7);
//! let target = apply_similarity(&sim, &source);
//! assert_eq!(target.len(), 6);
//! ```

use nalgebra::{Translation3, UnitQuaternion};

use crate::{Pt3, Real, Sim3, Vec3};

/// Deterministic point cloud inside the cube `[-half_extent, half_extent]^3`.
pub fn random_points(seed: u64, n: usize, half_extent: Real) -> Vec<Pt3> {
    (0..n)
        .map(|i| {
            let v = unit_vec3(seed, i) * 2.0 - Vec3::repeat(1.0);
            Pt3::from(v * half_extent)
        })
        .collect()
}

/// Deterministic similarity transform.
///
/// Rotation angle in `[0, π)` about a random axis, scale in `[0.5, 2.0)`,
/// translation components in `[-100, 100)`.
pub fn random_similarity(seed: u64) -> Sim3 {
    let mut axis = unit_vec3(seed ^ 0xA5A5_A5A5, 0) * 2.0 - Vec3::repeat(1.0);
    if axis.norm() < 1e-6 {
        axis = Vec3::z();
    }
    let angle = u64_to_unit_f64(splitmix64(seed ^ 0x1234_5678)) * std::f64::consts::PI;
    let rotation = UnitQuaternion::from_scaled_axis(axis.normalize() * angle);
    let scale = 0.5 + 1.5 * u64_to_unit_f64(splitmix64(seed ^ 0x0BAD_F00D));
    let translation = (unit_vec3(seed ^ 0x5EED, 1) * 2.0 - Vec3::repeat(1.0)) * 100.0;
    Sim3::from_parts(Translation3::from(translation), rotation, scale)
}

/// Apply `sim` to every point.
pub fn apply_similarity(sim: &Sim3, points: &[Pt3]) -> Vec<Pt3> {
    points.iter().map(|p| sim.transform_point(p)).collect()
}

/// Add deterministic uniform noise in `[-max_abs, +max_abs]` per axis.
pub fn jitter_points(seed: u64, points: &[Pt3], max_abs: Real) -> Vec<Pt3> {
    let max_abs = max_abs.abs();
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let d = (unit_vec3(seed ^ 0x94D0_49BB_1331_11EB, i) - Vec3::repeat(0.5)) * 2.0 * max_abs;
            p + d
        })
        .collect()
}

#[inline]
fn unit_vec3(seed: u64, idx: usize) -> Vec3 {
    let key = seed ^ (idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Vec3::new(
        u64_to_unit_f64(splitmix64(key)),
        u64_to_unit_f64(splitmix64(key ^ 0xBF58_476D_1CE4_E5B9)),
        u64_to_unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB)),
    )
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // Top 53 bits -> [0, 1).
    let mantissa = x >> 11;
    (mantissa as Real) * (1.0 / ((1u64 << 53) as Real))
}
