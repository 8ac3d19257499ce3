//! Viewport geometry and spawn density
//!
//! Spawn rate scales with the physical size of the visible area, so a phone
//! and a desktop monitor get a similar dot density per square centimeter.

use serde::{Deserialize, Serialize};

use crate::consts::CM_PER_INCH;

/// Visible area of the page, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Device pixels per CSS pixel
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            // A zero or negative ratio would blow up the area computation
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Convert a pixel extent to centimeters
    #[inline]
    fn px_to_cm(&self, px: f32, dpi: f64) -> f64 {
        px as f64 / self.device_pixel_ratio / dpi * CM_PER_INCH
    }

    /// Width in centimeters at the given pixel density
    pub fn width_cm(&self, dpi: f64) -> f64 {
        self.px_to_cm(self.width, dpi)
    }

    /// Height in centimeters at the given pixel density
    pub fn height_cm(&self, dpi: f64) -> f64 {
        self.px_to_cm(self.height, dpi)
    }

    /// Visible area in square centimeters
    pub fn area_cm2(&self, dpi: f64) -> f64 {
        self.width_cm(dpi) * self.height_cm(dpi)
    }
}

/// Particles per batch for a visible area: `floor(area / unit * per_unit)`
pub fn batch_size(area_cm2: f64, area_unit_cm2: f32, particles_per_unit: f32) -> usize {
    if !(area_cm2 > 0.0) || !(area_unit_cm2 > 0.0) {
        return 0;
    }
    (area_cm2 / area_unit_cm2 as f64 * particles_per_unit as f64).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{AREA_UNIT_CM2, DEFAULT_DPI, PARTICLES_PER_UNIT};

    #[test]
    fn test_area_for_desktop_viewport() {
        let vp = Viewport::new(1000.0, 500.0, 1.0);
        assert!((vp.width_cm(DEFAULT_DPI) - 26.458).abs() < 0.01);
        assert!((vp.height_cm(DEFAULT_DPI) - 13.229).abs() < 0.01);
        let area = vp.area_cm2(DEFAULT_DPI);
        assert!((area - 350.0).abs() < 0.1, "area was {}", area);
        assert_eq!(batch_size(area, AREA_UNIT_CM2, PARTICLES_PER_UNIT), 140);
    }

    #[test]
    fn test_batch_size_examples() {
        assert_eq!(batch_size(500.0, AREA_UNIT_CM2, PARTICLES_PER_UNIT), 200);
        assert_eq!(batch_size(19.9, AREA_UNIT_CM2, PARTICLES_PER_UNIT), 7);
        assert_eq!(batch_size(0.0, AREA_UNIT_CM2, PARTICLES_PER_UNIT), 0);
        assert_eq!(batch_size(f64::NAN, AREA_UNIT_CM2, PARTICLES_PER_UNIT), 0);
    }

    #[test]
    fn test_pixel_ratio_shrinks_area() {
        let normal = Viewport::new(1000.0, 500.0, 1.0);
        let retina = Viewport::new(1000.0, 500.0, 2.0);
        let ratio = normal.area_cm2(DEFAULT_DPI) / retina.area_cm2(DEFAULT_DPI);
        assert!((ratio - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_pixel_ratio_defaults_to_one() {
        let vp = Viewport::new(800.0, 600.0, 0.0);
        assert_eq!(vp.device_pixel_ratio, 1.0);
    }
}
