//! Core math and bookkeeping primitives for `uscal-rs`.
//!
//! This crate provides the building blocks shared by the solver and session
//! crates of the workspace:
//!
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, `Mat4`, `Sim3`),
//! - labeled, index-aligned point lists in a named coordinate space,
//! - deterministic synthetic data helpers for tests.
//!
//! # Example
//!
//! ```
//! use uscal_core::{CoordinateSpace, PointList, Pt3};
//!
//! let mut image = PointList::new("Image_Points", CoordinateSpace::ImageMm);
//! image.append_auto(Pt3::new(10.0, 20.0, 0.0));
//! image.append_auto(Pt3::new(30.0, 20.0, 0.0));
//! assert_eq!(image.labels(), vec!["Image_Points-1", "Image_Points-2"]);
//!
//! image.undo_last();
//! assert_eq!(image.len(), 1);
//! ```

/// Linear algebra type aliases and helpers.
mod math;
/// Labeled point lists and pair-synchronization checks.
mod points;
/// Deterministic synthetic data generation helpers.
///
/// Small reusable pieces for building synthetic calibration problems
/// (point clouds and known similarity transforms). Used by workspace tests.
pub mod synthetic;

pub use math::*;
pub use points::*;
