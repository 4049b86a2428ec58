//! Interpolation helpers for playback.

use std::f32::consts::{PI, TAU};

/// Ease-in/ease-out curve `u²(3 - 2u)`, with `u` clamped to [0, 1].
#[inline]
pub fn smoothstep(u: f32) -> f32 {
    let u = u.clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Blend between two angles along the shorter arc.
///
/// The delta is wrapped once into [-π, π] before scaling, so inputs are
/// expected to be within one turn of each other (as recorded headings are).
#[inline]
pub fn interpolate_rotation(from: f32, to: f32, t: f32) -> f32 {
    let mut delta = to - from;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    from + delta * t
}

/// Normalized position of `t` between two frame times, clamped to [0, 1].
///
/// `None` when the later frame does not come strictly after the earlier one.
pub fn blend_factor(t: i64, earlier_ms: i64, later_ms: i64) -> Option<f32> {
    if later_ms <= earlier_ms {
        return None;
    }
    let span = (later_ms - earlier_ms) as f64;
    Some((((t - earlier_ms) as f64) / span).clamp(0.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_smoothstep_fixed_points() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(-3.0), 0.0);
        assert_eq!(smoothstep(7.0), 1.0);
        assert!(smoothstep(0.25) < 0.25);
        assert!(smoothstep(0.75) > 0.75);
    }

    #[test]
    fn test_rotation_takes_short_arc() {
        assert!((interpolate_rotation(0.0, 3.0, 0.5) - 1.5).abs() < EPS);
        assert!((interpolate_rotation(0.0, -3.0, 0.5) + 1.5).abs() < EPS);
    }

    #[test]
    fn test_rotation_wraps_through_pi() {
        // 3.1 -> -3.1 is 0.083 rad through π, not 6.2 rad through 0
        let mid = interpolate_rotation(3.1, -3.1, 0.5);
        let expected = 3.1 + (TAU - 6.2) / 2.0;
        assert!((mid - expected).abs() < 1e-4, "mid = {mid}");
        assert!(mid.abs() > 3.0);

        let back = interpolate_rotation(-3.1, 3.1, 0.5);
        assert!(back.abs() > 3.0);
    }

    #[test]
    fn test_blend_factor() {
        assert_eq!(blend_factor(50, 0, 100), Some(0.5));
        assert_eq!(blend_factor(-10, 0, 100), Some(0.0));
        assert_eq!(blend_factor(500, 0, 100), Some(1.0));
        assert_eq!(blend_factor(50, 100, 100), None);
        assert_eq!(blend_factor(50, 100, 0), None);
    }

    proptest! {
        #[test]
        fn prop_rotation_step_within_half_turn(
            from in -PI..PI,
            to in -PI..PI,
            t in 0.0f32..=1.0,
        ) {
            let end = interpolate_rotation(from, to, 1.0);
            prop_assert!((end - from).abs() <= PI + 1e-4);

            let mid = interpolate_rotation(from, to, t);
            prop_assert!((mid - from).abs() <= (end - from).abs() + 1e-4);
        }

        #[test]
        fn prop_smoothstep_monotonic(a in 0.0f32..1.0, b in 0.0f32..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(smoothstep(lo) <= smoothstep(hi) + 1e-6);
        }
    }
}
