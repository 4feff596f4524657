use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uscal_core::{
    CoordinateSpace, Mat4, PairSync, PointList, Pt3, Real, count_mismatch, delete_at_all,
    origin_of, undo_last_all,
};
use uscal_linear::{ResidualRecord, fit_similarity, point_residuals};

use crate::session::{
    CalibrationOutput, CalibrationStatus, LogEntry, RecomputeOutcome, SessionMetadata,
    TransformHandle,
};

use super::config::PointerConfig;

pub const METHOD_NAME: &str = "pointer";
pub const SCHEMA_VERSION: u32 = 1;

pub const IMAGE_LIST_NAME: &str = "Image_Points";
pub const PROBE_LIST_NAME: &str = "Probe_Points";

/// Why an image point could not be paired with the stylus tip.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairingError {
    #[error("no stylus tip transform is set")]
    NoStylusTransform,
    /// Lists must have equal length before a pair is added.
    #[error("image and probe points lists have become unsynchronized ({image} vs {probe})")]
    Unsynchronized { image: usize, probe: usize },
}

/// Pointer-based calibration from image/probe point pairs.
///
/// Each pair is one physical point located in the image (millimetres) and
/// touched with the tracked stylus (probe coordinates). Three or more pairs
/// determine `ImageToProbe` by a similarity fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerSession {
    pub metadata: SessionMetadata,
    config: PointerConfig,
    image_points: PointList,
    probe_points: PointList,
    stylus_tip_to_probe: Option<Mat4>,
    output: CalibrationOutput,
    pub log: Vec<LogEntry>,
}

impl Default for PointerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerSession {
    pub fn new() -> Self {
        Self::from_metadata(SessionMetadata::new(METHOD_NAME, SCHEMA_VERSION, None))
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        Self::from_metadata(SessionMetadata::new(
            METHOD_NAME,
            SCHEMA_VERSION,
            Some(description.into()),
        ))
    }

    /// Start from existing point lists and compute once.
    ///
    /// The lists may differ in length; the session then reports an
    /// incomplete pair (one entry apart) or a synchronization fault until
    /// the operator resolves it.
    pub fn from_lists(image_points: PointList, probe_points: PointList) -> Self {
        let mut session = Self::new();
        session.image_points = image_points;
        session.probe_points = probe_points;
        session.recompute_after("from_lists");
        session
    }

    fn from_metadata(metadata: SessionMetadata) -> Self {
        Self {
            metadata,
            config: PointerConfig::default(),
            image_points: PointList::new(IMAGE_LIST_NAME, CoordinateSpace::ImageMm),
            probe_points: PointList::new(PROBE_LIST_NAME, CoordinateSpace::Probe),
            stylus_tip_to_probe: None,
            output: CalibrationOutput::default(),
            log: Vec::new(),
        }
    }

    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    pub fn image_points(&self) -> &PointList {
        &self.image_points
    }

    pub fn probe_points(&self) -> &PointList {
        &self.probe_points
    }

    pub fn pair_count(&self) -> usize {
        self.image_points.len().min(self.probe_points.len())
    }

    pub fn stylus_tip_to_probe(&self) -> Option<Mat4> {
        self.stylus_tip_to_probe
    }

    pub fn status(&self) -> Option<&CalibrationStatus> {
        self.output.status()
    }

    pub fn image_to_probe(&self) -> Option<Mat4> {
        self.output.image_to_probe()
    }

    pub fn output_target(&self) -> Option<&TransformHandle> {
        self.output.target()
    }

    /// Length relation of the two lists.
    pub fn sync_state(&self) -> PairSync {
        count_mismatch(&self.image_points, &self.probe_points)
    }

    /// Auto-pairing is suspended while the lists differ in length.
    pub fn pairing_suspended(&self) -> bool {
        self.image_points.len() != self.probe_points.len()
    }

    pub fn set_config(&mut self, config: PointerConfig) -> Result<RecomputeOutcome> {
        config.validate()?;
        self.config = config;
        Ok(self.recompute_after("set_config"))
    }

    pub fn set_stylus_tip_to_probe(&mut self, stylus_tip_to_probe: Option<Mat4>) {
        self.stylus_tip_to_probe = stylus_tip_to_probe;
    }

    pub fn set_output_target(&mut self, target: Option<TransformHandle>) -> RecomputeOutcome {
        self.output.set_target(target);
        self.recompute_after("set_output_target")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pair editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Append one image point and its probe-space counterpart.
    pub fn append_correspondence_pair(&mut self, image: Pt3, probe: Pt3) -> RecomputeOutcome {
        self.image_points.append_auto(image);
        self.probe_points.append_auto(probe);
        self.recompute_after("append_correspondence_pair")
    }

    /// Append an image point paired with the current stylus tip.
    ///
    /// Nothing is appended without a stylus pose, or while the two lists
    /// differ in length.
    pub fn append_image_point(&mut self, image: Pt3) -> Result<RecomputeOutcome, PairingError> {
        let Some(stylus) = self.stylus_tip_to_probe else {
            warn!("no stylus tip transform set; image point not paired");
            return Err(PairingError::NoStylusTransform);
        };
        if self.pairing_suspended() {
            warn!("Image and probe points lists have become unsynchronized.");
            let err = PairingError::Unsynchronized {
                image: self.image_points.len(),
                probe: self.probe_points.len(),
            };
            self.log
                .push(LogEntry::refused("append_image_point", err.to_string()));
            return Err(err);
        }

        Ok(self.append_correspondence_pair(image, origin_of(&stylus)))
    }

    /// Remove the last entry of each list that has one.
    pub fn undo_last_pair(&mut self) -> RecomputeOutcome {
        undo_last_all(&mut [&mut self.image_points, &mut self.probe_points]);
        self.recompute_after("undo_last_pair")
    }

    /// Remove entry `index` from each list that has it.
    pub fn delete_pair_at(&mut self, index: usize) -> RecomputeOutcome {
        delete_at_all(&mut [&mut self.image_points, &mut self.probe_points], index);
        self.recompute_after("delete_pair_at")
    }

    pub fn reset_pairs(&mut self) -> RecomputeOutcome {
        self.image_points.clear();
        self.probe_points.clear();
        self.recompute_after("reset_pairs")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recomputation and errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Refit from the current pairs without journaling.
    pub fn recompute(&mut self) -> RecomputeOutcome {
        let result = self.solve();
        self.output.record(result)
    }

    fn recompute_after(&mut self, operation: &str) -> RecomputeOutcome {
        self.metadata.touch();
        let outcome = self.recompute();
        self.log.push(
            LogEntry::recorded(operation, &outcome)
                .with_note(format!("{} pairs", self.pair_count())),
        );
        outcome
    }

    fn solve(&self) -> Result<Mat4, CalibrationStatus> {
        let (image, probe) = (self.image_points.len(), self.probe_points.len());
        match self.sync_state() {
            PairSync::Aligned => {}
            PairSync::Pending { .. } => {
                return Err(CalibrationStatus::IncompletePair { image, probe });
            }
            PairSync::Desynchronized { .. } => {
                return Err(CalibrationStatus::Unsynchronized { image, probe });
            }
        }
        let count = self.image_points.len();
        if count < self.config.min_pairs {
            return Err(CalibrationStatus::NotEnoughPairs {
                count,
                required: self.config.min_pairs,
            });
        }

        let sim = fit_similarity(
            &self.image_points.positions(),
            &self.probe_points.positions(),
            self.config.registration,
        )?;
        debug!("pointer fit over {count} pairs, scale {:.4}", sim.scaling());
        Ok(sim.to_homogeneous())
    }

    /// Residual `|ImageToProbe · image[i] - probe[i]|` for each pair.
    ///
    /// Empty when no transform has been computed, when the lists differ in
    /// length, or when fewer than three pairs exist.
    pub fn compute_errors(&self) -> Vec<ResidualRecord> {
        match self.output.image_to_probe() {
            Some(m) => point_residuals(&m, &self.image_points, &self.probe_points),
            None => Vec::new(),
        }
    }

    /// Root mean square of [`Self::compute_errors`].
    pub fn rms_error(&self) -> Option<Real> {
        let errors = self.compute_errors();
        if errors.is_empty() {
            return None;
        }
        let sum: Real = errors.iter().map(|e| e.residual * e.residual).sum();
        Some((sum / errors.len() as Real).sqrt())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Restore a checkpoint written by [`Self::to_json`].
    ///
    /// Fails on another method's checkpoint, a newer schema, or a stored
    /// configuration that [`PointerConfig::validate`] rejects.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        session
            .metadata
            .ensure_compatible(METHOD_NAME, SCHEMA_VERSION)?;
        session.config.validate()?;
        Ok(session)
    }
}
