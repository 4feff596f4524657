//! Per-correspondence residuals of a fitted transform.

use serde::{Deserialize, Serialize};
use uscal_core::{Mat4, PointList, Real, transform_point};

use crate::MIN_CORRESPONDENCES;

/// Residual of one correspondence, in target units (millimetres).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    pub source_label: String,
    pub target_label: String,
    pub residual: Real,
}

/// Labeled residual table for two correspondence lists.
///
/// Returns an empty table when the lists differ in length or hold fewer
/// than three pairs; the residuals are simply not computable yet.
pub fn point_residuals(
    transform: &Mat4,
    source: &PointList,
    target: &PointList,
) -> Vec<ResidualRecord> {
    if source.len() != target.len() || source.len() < MIN_CORRESPONDENCES {
        return Vec::new();
    }

    source
        .iter()
        .zip(target.iter())
        .map(|(s, t)| ResidualRecord {
            source_label: s.label.clone(),
            target_label: t.label.clone(),
            residual: (transform_point(transform, &s.position) - t.position).norm(),
        })
        .collect()
}
