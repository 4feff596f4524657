//! The calibrated transform and where it is published.

use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uscal_core::Mat4;

use super::status::{CalibrationStatus, RecomputeOutcome};

/// Shared slot receiving the `ImageToProbe` transform.
///
/// Cloning yields another handle to the same slot. The session replaces the
/// whole matrix under the write lock, so readers on other threads never see
/// a half-written transform.
#[derive(Debug, Clone, Default)]
pub struct TransformHandle(Arc<RwLock<Option<Mat4>>>);

impl TransformHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current transform, if any has been published.
    pub fn get(&self) -> Option<Mat4> {
        *self.0.read()
    }

    /// Store `transform`, returning the previous value.
    pub fn replace(&self, transform: Mat4) -> Option<Mat4> {
        self.0.write().replace(transform)
    }
}

/// Last status and transform of a session, plus the optional publish target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationOutput {
    status: Option<CalibrationStatus>,
    image_to_probe: Option<Mat4>,
    #[serde(skip)]
    target: Option<TransformHandle>,
}

impl CalibrationOutput {
    pub fn status(&self) -> Option<&CalibrationStatus> {
        self.status.as_ref()
    }

    pub fn image_to_probe(&self) -> Option<Mat4> {
        self.image_to_probe
    }

    pub fn target(&self) -> Option<&TransformHandle> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<TransformHandle>) {
        self.target = target;
    }

    /// Record a solve result.
    ///
    /// A new transform replaces the stored one and is pushed to the target.
    /// A failure only updates the status.
    pub fn record(&mut self, result: Result<Mat4, CalibrationStatus>) -> RecomputeOutcome {
        match result {
            Ok(transform) => {
                self.image_to_probe = Some(transform);
                if let Some(target) = &self.target {
                    target.replace(transform);
                    debug!("published ImageToProbe to output target");
                }
                self.status = Some(CalibrationStatus::Success);
                RecomputeOutcome {
                    status: CalibrationStatus::Success,
                    transform: Some(transform),
                }
            }
            Err(status) => {
                info!("calibration not updated: {}", status.message());
                self.status = Some(status.clone());
                RecomputeOutcome {
                    status,
                    transform: None,
                }
            }
        }
    }
}
