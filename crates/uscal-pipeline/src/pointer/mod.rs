//! Pointer-based calibration from paired image and probe points.

mod config;
mod session;

pub use config::PointerConfig;
pub use session::{
    IMAGE_LIST_NAME, METHOD_NAME, PROBE_LIST_NAME, PairingError, PointerSession, SCHEMA_VERSION,
};
