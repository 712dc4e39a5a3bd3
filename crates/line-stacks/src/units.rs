//! Pixel to map unit conversion for one output view

use crate::{Result, StackError};
use geo::Rect;

/// Ground resolution of an output image covering a bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapUnits {
    /// Map units covered by one output pixel
    resolution: f64,
}

impl MapUnits {
    /// Derive the ground resolution of an image of `width_px` x `height_px` pixels showing `bbox`.
    ///
    /// The resolution is the mean of the horizontal and vertical resolutions, which are equal
    /// whenever the image keeps the aspect ratio of the box.
    pub fn new(bbox: Rect<f64>, width_px: u32, height_px: u32) -> Result<Self> {
        if width_px < 1 {
            return Err(StackError::InvalidParameter {
                name: "outputWidth",
                reason: format!("has to be at least 1 pixel, but currently is {width_px}"),
            });
        }
        if height_px < 1 {
            return Err(StackError::InvalidParameter {
                name: "outputHeight",
                reason: format!("has to be at least 1 pixel, but currently is {height_px}"),
            });
        }
        let (width, height) = (bbox.width(), bbox.height());
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(StackError::InvalidParameter {
                name: "outputBBOX",
                reason: format!("has to have a positive extent, but is {width} x {height}"),
            });
        }

        let x_resolution = width / width_px as f64;
        let y_resolution = height / height_px as f64;
        Ok(Self {
            resolution: (x_resolution + y_resolution) / 2.0,
        })
    }

    /// Map units per pixel
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Convert a distance in output pixels into map units
    #[inline(always)]
    pub fn pixel_distance_to_map_units(&self, distance_px: f64) -> f64 {
        distance_px * self.resolution
    }
}
