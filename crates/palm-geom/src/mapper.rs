//! Coordinate mapping from perception space into game space
//!
//! Pure functions; all state lives in the caller.

use palm_core::Vec2;

use crate::ViewportGeometry;

/// Standard linear interpolation with `t` clamped to [0, 1].
///
/// Used for coordinate smoothing and for scalar game-state easing.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Map a perception-space point into normalized game space.
///
/// Affine transform confined to the crop rectangle; points outside the crop
/// are clamped, not rejected.
pub fn map_to_game_space(point: Vec2, viewport: &ViewportGeometry) -> Vec2 {
    let crop = viewport.crop;
    let clamped = crop.clamp_point(point);

    Vec2::new(
        (clamped.x - crop.x) / crop.width,
        (clamped.y - crop.y) / crop.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dimensions;

    fn wide_viewport() -> ViewportGeometry {
        // 4:3 capture onto 16:9 display -> vertical crop
        ViewportGeometry::compute(Dimensions::new(640, 480), Dimensions::new(1920, 1080)).unwrap()
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
    }

    #[test]
    fn test_lerp_clamps_t() {
        assert_eq!(lerp(2.0, 6.0, -1.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 3.0), 6.0);
    }

    #[test]
    fn test_lerp_monotonic_in_t() {
        let mut last = lerp(0.0, 1.0, 0.0);
        for i in 1..=100 {
            let v = lerp(0.0, 1.0, i as f32 / 100.0);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn test_horizontal_mapping_is_identity_when_full_width() {
        let vp = wide_viewport();
        let p = map_to_game_space(Vec2::new(0.25, 0.5), &vp);

        assert!((p.x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_crop_center_maps_to_center() {
        let vp = wide_viewport();
        let center = Vec2::new(0.5, 0.5);
        let mapped = map_to_game_space(center, &vp);

        assert!((mapped.x - 0.5).abs() < 1e-6);
        assert!((mapped.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_points_outside_crop_clamp() {
        let vp = wide_viewport();
        // Above the vertical crop band
        let mapped = map_to_game_space(Vec2::new(0.5, 0.0), &vp);

        assert_eq!(mapped.y, 0.0);

        let below = map_to_game_space(Vec2::new(0.5, 1.0), &vp);
        assert!((below.y - 1.0).abs() < 1e-6);
    }
}
