//! Viewport geometry - reconciling capture and display aspect ratios
//!
//! The primary constraint: relative horizontal motion maps 1:1 from capture
//! to display whenever the display is at least as wide as the capture.
//! Cropping direction is chosen to avoid horizontal distortion, at the cost
//! of vertical field-of-view loss.

use palm_core::{PipelineError, PipelineResult, Vec2};

/// Integer pixel dimensions of a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Dimensions { width, height }
    }

    /// Width over height.
    #[inline]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    #[inline]
    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A crop rectangle in normalized capture coordinates.
///
/// INVARIANT: fully contained within [0, 1] x [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    /// The identity crop covering the full capture.
    pub const FULL: CropRect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    /// True when the rect lies fully inside capture bounds.
    pub fn in_bounds(self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.right() <= 1.0 + f32::EPSILON
            && self.bottom() <= 1.0 + f32::EPSILON
    }

    /// Clamp a perception-space point into this rect.
    pub fn clamp_point(self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.x, self.right()),
            p.y.clamp(self.y, self.bottom()),
        )
    }
}

/// The reconciliation of a capture aspect with a display aspect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportGeometry {
    pub capture_aspect: f32,
    pub display_aspect: f32,
    pub crop: CropRect,
}

impl ViewportGeometry {
    /// Compute the crop for a capture/display pair.
    ///
    /// Wider display crops vertically (full capture width, horizontal 1:1);
    /// narrower display crops horizontally. Deterministic: identical inputs
    /// produce identical geometry. Degenerate dimensions are rejected so the
    /// caller can retain its previous valid geometry.
    pub fn compute(capture: Dimensions, display: Dimensions) -> PipelineResult<Self> {
        if capture.is_degenerate() {
            return Err(PipelineError::GeometryInvalid {
                width: capture.width,
                height: capture.height,
            });
        }
        if display.is_degenerate() {
            return Err(PipelineError::GeometryInvalid {
                width: display.width,
                height: display.height,
            });
        }

        let capture_aspect = capture.aspect();
        let display_aspect = display.aspect();

        let crop = if display_aspect > capture_aspect {
            // Wider display: full width, vertically centered band.
            let height = capture_aspect / display_aspect;
            CropRect {
                x: 0.0,
                y: (1.0 - height) / 2.0,
                width: 1.0,
                height,
            }
        } else if display_aspect < capture_aspect {
            // Narrower display: full height, horizontally centered band.
            let width = display_aspect / capture_aspect;
            CropRect {
                x: (1.0 - width) / 2.0,
                y: 0.0,
                width,
                height: 1.0,
            }
        } else {
            CropRect::FULL
        };

        Ok(ViewportGeometry {
            capture_aspect,
            display_aspect,
            crop,
        })
    }

    /// Horizontal motion scale from capture space to game space.
    ///
    /// Equals 1.0 exactly in the vertical-crop case (display at least as
    /// wide as capture).
    #[inline]
    pub fn horizontal_scale(&self) -> f32 {
        1.0 / self.crop.width
    }

    /// Vertical motion scale from capture space to game space.
    #[inline]
    pub fn vertical_scale(&self) -> f32 {
        1.0 / self.crop.height
    }
}
