//! Imageless calibration from the probe footprint and imaging depth.
//!
//! ```text
//! marked / unmarked corners ──► probe landmarks ─┐
//!                                                 ├─► similarity fit ─► ImageMmToProbe
//! image size + depth ───────► image mm corners ──┘
//!
//! ImageToProbe = ImageMmToProbe · PixelToMm
//! ```

mod config;
mod session;

pub use config::{DEFAULT_MAX_DEPTH_MM, ImagelessConfig};
pub use session::{
    ImagelessSession, MARKED_LIST_NAME, METHOD_NAME, SCHEMA_VERSION, UNMARKED_LIST_NAME,
};
