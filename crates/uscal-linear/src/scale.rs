use serde::{Deserialize, Serialize};
use thiserror::Error;
use uscal_core::{Mat4, Pt3, Real, uniform_scaling};

/// Pixel dimensions of the ultrasound image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageDimensions {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("no ultrasound image is selected")]
    NoImage,
    #[error("depth improperly specified ({0})")]
    InvalidDepth(Real),
}

/// Uniform pixel → millimetre scaling derived from the imaging depth.
///
/// The image's vertical axis is assumed to span exactly the imaging depth
/// and pixels are assumed square, so one factor `depth / height_px` applies
/// to every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelToMm {
    dimensions: ImageDimensions,
    depth_mm: Real,
    scale: Real,
}

impl PixelToMm {
    pub fn new(dimensions: ImageDimensions, depth_mm: Real) -> Result<Self, ScaleError> {
        if dimensions.height_px == 0 {
            return Err(ScaleError::NoImage);
        }
        if !depth_mm.is_finite() || depth_mm < 0.0 {
            return Err(ScaleError::InvalidDepth(depth_mm));
        }
        Ok(Self {
            dimensions,
            depth_mm,
            scale: depth_mm / Real::from(dimensions.height_px),
        })
    }

    /// Millimetres per pixel.
    pub fn scale(&self) -> Real {
        self.scale
    }

    /// `ImagePixel → ImageMm` as a homogeneous matrix.
    pub fn matrix(&self) -> Mat4 {
        uniform_scaling(self.scale)
    }

    /// Image corners in millimetres, in pixel order `(0,0)`, `(w,0)`,
    /// `(0,h)`, `(w,h)`.
    ///
    /// The bottom edge is placed at exactly `depth_mm`.
    pub fn image_corners_mm(&self) -> [Pt3; 4] {
        let w = Real::from(self.dimensions.width_px) * self.scale;
        let d = self.depth_mm;
        [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(w, 0.0, 0.0),
            Pt3::new(0.0, d, 0.0),
            Pt3::new(w, d, 0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_from_depth_and_height() {
        let px = PixelToMm::new(ImageDimensions::new(400, 500), 100.0).unwrap();
        assert!((px.scale() - 0.2).abs() < 1e-15);

        let expected = [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(80.0, 0.0, 0.0),
            Pt3::new(0.0, 100.0, 0.0),
            Pt3::new(80.0, 100.0, 0.0),
        ];
        for (got, want) in px.image_corners_mm().iter().zip(expected.iter()) {
            assert!((got - want).norm() < 1e-12, "{got} vs {want}");
        }
    }

    #[test]
    fn mm_corners_match_scaled_pixel_corners() {
        let px = PixelToMm::new(ImageDimensions::new(640, 480), 55.0).unwrap();
        let pixels = [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(640.0, 0.0, 0.0),
            Pt3::new(0.0, 480.0, 0.0),
            Pt3::new(640.0, 480.0, 0.0),
        ];
        for (p, mm) in pixels.iter().zip(px.image_corners_mm().iter()) {
            let via_matrix = uscal_core::transform_point(&px.matrix(), p);
            assert!((via_matrix - mm).norm() < 1e-9);
        }
    }

    #[test]
    fn zero_height_means_no_image() {
        assert_eq!(
            PixelToMm::new(ImageDimensions::new(400, 0), 100.0),
            Err(ScaleError::NoImage)
        );
    }

    #[test]
    fn negative_depth_is_rejected() {
        assert_eq!(
            PixelToMm::new(ImageDimensions::new(400, 500), -3.0),
            Err(ScaleError::InvalidDepth(-3.0))
        );
    }
}
