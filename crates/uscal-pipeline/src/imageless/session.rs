use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uscal_core::{CoordinateSpace, Mat4, PointList, Pt3, Real, origin_of};
use uscal_linear::{
    CORNERS_PER_SIDE, ImageDimensions, PixelToMm, ProbeCorners, fit_similarity,
    reconstruct_probe_landmarks,
};

use crate::session::{
    CalibrationOutput, CalibrationStatus, LogEntry, RecomputeOutcome, SessionMetadata,
    TransformHandle,
};

use super::config::ImagelessConfig;

pub const METHOD_NAME: &str = "imageless";
pub const SCHEMA_VERSION: u32 = 1;

pub const MARKED_LIST_NAME: &str = "Marked_Points";
pub const UNMARKED_LIST_NAME: &str = "Unmarked_Points";

/// Imageless probe calibration.
///
/// The operator touches two corners on the marked and two on the unmarked
/// side of the transducer face (in probe coordinates) and enters the imaging
/// depth. Together with the image size this fixes where the four image
/// corners sit relative to the probe, and a similarity fit yields
/// `ImageToProbe`.
///
/// Every setter recomputes immediately and returns the outcome.
///
/// # Example
///
/// ```
/// use uscal_core::Pt3;
/// use uscal_linear::ImageDimensions;
/// use uscal_pipeline::imageless::ImagelessSession;
///
/// let mut session = ImagelessSession::new();
/// session.set_image_dimensions(Some(ImageDimensions::new(400, 600)));
/// session.set_depth(60.0);
/// session.append_marked_point(Pt3::new(0.0, -5.0, 0.0));
/// session.append_marked_point(Pt3::new(0.0, 5.0, 0.0));
/// session.append_unmarked_point(Pt3::new(40.0, -5.0, 0.0));
/// let outcome = session.append_unmarked_point(Pt3::new(40.0, 5.0, 0.0));
///
/// assert!(outcome.is_success());
/// assert!(session.image_to_probe().is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagelessSession {
    pub metadata: SessionMetadata,
    config: ImagelessConfig,
    marked: PointList,
    unmarked: PointList,
    depth_mm: Option<Real>,
    image: Option<ImageDimensions>,
    stylus_tip_to_probe: Option<Mat4>,
    output: CalibrationOutput,
    pub log: Vec<LogEntry>,
}

impl Default for ImagelessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagelessSession {
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

    fn from_metadata(metadata: SessionMetadata) -> Self {
        Self {
            metadata,
            config: ImagelessConfig::default(),
            marked: PointList::new(MARKED_LIST_NAME, CoordinateSpace::Probe),
            unmarked: PointList::new(UNMARKED_LIST_NAME, CoordinateSpace::Probe),
            depth_mm: None,
            image: None,
            stylus_tip_to_probe: None,
            output: CalibrationOutput::default(),
            log: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &ImagelessConfig {
        &self.config
    }

    pub fn marked_points(&self) -> &PointList {
        &self.marked
    }

    pub fn unmarked_points(&self) -> &PointList {
        &self.unmarked
    }

    pub fn depth_mm(&self) -> Option<Real> {
        self.depth_mm
    }

    pub fn image_dimensions(&self) -> Option<ImageDimensions> {
        self.image
    }

    pub fn stylus_tip_to_probe(&self) -> Option<Mat4> {
        self.stylus_tip_to_probe
    }

    /// Status of the latest recomputation; `None` before the first one.
    pub fn status(&self) -> Option<&CalibrationStatus> {
        self.output.status()
    }

    /// Most recent successfully computed `ImageToProbe`.
    pub fn image_to_probe(&self) -> Option<Mat4> {
        self.output.image_to_probe()
    }

    pub fn output_target(&self) -> Option<&TransformHandle> {
        self.output.target()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the configuration after validating it.
    pub fn set_config(&mut self, config: ImagelessConfig) -> Result<RecomputeOutcome> {
        config.validate()?;
        self.config = config;
        Ok(self.recompute_after("set_config"))
    }

    pub fn set_depth(&mut self, depth_mm: Real) -> RecomputeOutcome {
        self.depth_mm = Some(depth_mm);
        self.recompute_after("set_depth")
    }

    /// Set the depth from operator text. Text that does not parse as a
    /// number clears the depth.
    pub fn set_depth_text(&mut self, text: &str) -> RecomputeOutcome {
        self.depth_mm = text.trim().parse::<Real>().ok();
        if self.depth_mm.is_none() {
            warn!("depth '{text}' is not a number");
        }
        self.recompute_after("set_depth")
    }

    pub fn clear_depth(&mut self) -> RecomputeOutcome {
        self.depth_mm = None;
        self.recompute_after("clear_depth")
    }

    /// Select the ultrasound image by its pixel size; `None` deselects it.
    pub fn set_image_dimensions(&mut self, image: Option<ImageDimensions>) -> RecomputeOutcome {
        self.image = image;
        self.recompute_after("set_image_dimensions")
    }

    /// Attach (or detach) the shared slot receiving `ImageToProbe`.
    ///
    /// Attaching recomputes so that the new target receives a current
    /// transform.
    pub fn set_output_target(&mut self, target: Option<TransformHandle>) -> RecomputeOutcome {
        self.output.set_target(target);
        self.recompute_after("set_output_target")
    }

    /// Current `StylusTip → Probe` pose used by the `*_from_stylus` helpers.
    pub fn set_stylus_tip_to_probe(&mut self, stylus_tip_to_probe: Option<Mat4>) {
        self.stylus_tip_to_probe = stylus_tip_to_probe;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Corner points
    // ─────────────────────────────────────────────────────────────────────────

    pub fn append_marked_point(&mut self, position: Pt3) -> RecomputeOutcome {
        warn_if_full(&self.marked);
        self.marked.append_auto(position);
        self.recompute_after("append_marked_point")
    }

    pub fn append_unmarked_point(&mut self, position: Pt3) -> RecomputeOutcome {
        warn_if_full(&self.unmarked);
        self.unmarked.append_auto(position);
        self.recompute_after("append_unmarked_point")
    }

    /// Append the current stylus tip as a marked corner.
    ///
    /// Returns `None` (and appends nothing) without a stylus pose.
    pub fn append_marked_from_stylus(&mut self) -> Option<RecomputeOutcome> {
        let tip = self.stylus_tip()?;
        Some(self.append_marked_point(tip))
    }

    /// Append the current stylus tip as an unmarked corner.
    pub fn append_unmarked_from_stylus(&mut self) -> Option<RecomputeOutcome> {
        let tip = self.stylus_tip()?;
        Some(self.append_unmarked_point(tip))
    }

    pub fn reset_marked_points(&mut self) -> RecomputeOutcome {
        self.marked.clear();
        self.recompute_after("reset_marked_points")
    }

    pub fn reset_unmarked_points(&mut self) -> RecomputeOutcome {
        self.unmarked.clear();
        self.recompute_after("reset_unmarked_points")
    }

    /// Clear both corner lists.
    pub fn reset(&mut self) -> RecomputeOutcome {
        self.marked.clear();
        self.unmarked.clear();
        self.recompute_after("reset")
    }

    fn stylus_tip(&self) -> Option<Pt3> {
        match &self.stylus_tip_to_probe {
            Some(m) => Some(origin_of(m)),
            None => {
                warn!("no stylus tip transform set; corner point not captured");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recomputation
    // ─────────────────────────────────────────────────────────────────────────

    /// Recompute `ImageToProbe` from the current state.
    ///
    /// On success the stored transform is replaced and published to the
    /// output target. On failure the previous transform is left in place.
    /// Nothing is journaled since the inputs are unchanged.
    pub fn recompute(&mut self) -> RecomputeOutcome {
        let result = self.solve();
        self.output.record(result)
    }

    fn recompute_after(&mut self, operation: &str) -> RecomputeOutcome {
        self.metadata.touch();
        let outcome = self.recompute();
        self.log.push(LogEntry::recorded(operation, &outcome));
        outcome
    }

    /// Composite `ImageToProbe = ImageMmToProbe · PixelToMm`.
    fn solve(&self) -> Result<Mat4, CalibrationStatus> {
        let corners = ProbeCorners::from_lists(&self.marked, &self.unmarked)?;
        let depth = self.depth_mm.ok_or(CalibrationStatus::InvalidDepth)?;
        if !self.config.accepts_depth(depth) {
            return Err(CalibrationStatus::InvalidDepth);
        }
        let landmarks = reconstruct_probe_landmarks(&corners, depth)?;
        let image = self.image.ok_or(CalibrationStatus::NoImage)?;
        let pixel_to_mm = PixelToMm::new(image, depth)?;

        let mm_to_probe = fit_similarity(
            &pixel_to_mm.image_corners_mm(),
            &landmarks.ordered(),
            self.config.registration,
        )?;
        debug!(
            "imageless fit: {:.4} mm/px, similarity scale {:.4}",
            pixel_to_mm.scale(),
            mm_to_probe.scaling()
        );

        Ok(mm_to_probe.to_homogeneous() * pixel_to_mm.matrix())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize the session to pretty JSON. The output target is not
    /// included.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Restore a session from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Deserialization fails
    /// - The session was written by another calibration method
    /// - Schema version is newer than supported
    /// - The stored configuration is invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        session
            .metadata
            .ensure_compatible(METHOD_NAME, SCHEMA_VERSION)?;
        session.config.validate()?;
        Ok(session)
    }
}

fn warn_if_full(list: &PointList) {
    if list.len() >= CORNERS_PER_SIDE {
        warn!(
            "Newly selected points not used. Points list already contains previously selected points. ({})",
            list.name()
        );
    }
}
