//! Mathematical utilities and type definitions.
//!
//! This module provides fundamental types used throughout the workspace
//! and a few helpers for working with homogeneous 4×4 transforms.

use nalgebra::{Matrix3, Matrix4, Point3, Similarity3, Vector3, Vector4};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3D similarity transform (rotation, translation, uniform scale).
pub type Sim3 = Similarity3<Real>;

/// Midpoint of the segment `a`–`b`.
pub fn midpoint(a: &Pt3, b: &Pt3) -> Pt3 {
    nalgebra::center(a, b)
}

/// Apply a homogeneous 4×4 transform to a point.
///
/// The result is divided by the homogeneous coordinate when it differs from
/// one, so projective matrices are handled too. Affine inputs (the common
/// case here) pass through unchanged.
pub fn transform_point(m: &Mat4, p: &Pt3) -> Pt3 {
    let h = m * Vector4::new(p.x, p.y, p.z, 1.0);
    if h.w != 0.0 && h.w != 1.0 {
        Pt3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    } else {
        Pt3::new(h.x, h.y, h.z)
    }
}

/// Translation part of a homogeneous 4×4 transform, as a point.
///
/// This is where the transform sends the origin of its source frame, e.g.
/// the stylus tip position for a `StylusTip → Probe` matrix.
pub fn origin_of(m: &Mat4) -> Pt3 {
    Pt3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Homogeneous uniform scaling matrix `diag(s, s, s, 1)`.
pub fn uniform_scaling(s: Real) -> Mat4 {
    Mat4::new_nonuniform_scaling(&Vec3::repeat(s))
}

/// Row-major nested array view of a 4×4 matrix (for reports and JSON).
pub fn mat4_to_rows(m: &Mat4) -> [[Real; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

/// Inverse of [`mat4_to_rows`].
pub fn mat4_from_rows(rows: &[[Real; 4]; 4]) -> Mat4 {
    Mat4::from_fn(|r, c| rows[r][c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_scaling_keeps_homogeneous_one() {
        let m = uniform_scaling(0.2);
        assert_eq!(m[(0, 0)], 0.2);
        assert_eq!(m[(1, 1)], 0.2);
        assert_eq!(m[(2, 2)], 0.2);
        assert_eq!(m[(3, 3)], 1.0);

        let p = transform_point(&m, &Pt3::new(400.0, 500.0, 0.0));
        assert!((p.x - 80.0).abs() < 1e-12);
        assert!((p.y - 100.0).abs() < 1e-12);
    }

    #[test]
    fn origin_of_reads_translation_column() {
        let mut m = Mat4::identity();
        m[(0, 3)] = 1.5;
        m[(1, 3)] = -2.0;
        m[(2, 3)] = 7.25;
        let o = origin_of(&m);
        assert_eq!(o, Pt3::new(1.5, -2.0, 7.25));
        assert_eq!(transform_point(&m, &Pt3::origin()), o);
    }

    #[test]
    fn rows_roundtrip() {
        let m = Mat4::from_fn(|r, c| (r * 4 + c) as Real);
        let rows = mat4_to_rows(&m);
        assert_eq!(rows[1][2], 6.0);
        assert_eq!(mat4_from_rows(&rows), m);
    }

    #[test]
    fn midpoint_is_centered() {
        let m = midpoint(&Pt3::new(0.0, 0.0, 0.0), &Pt3::new(2.0, 4.0, -6.0));
        assert_eq!(m, Pt3::new(1.0, 2.0, -3.0));
    }
}
