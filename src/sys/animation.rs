//! Easing curves used by the simulated surfaces to interpolate a transition.

use std::f64::consts::PI;

use crate::common::config::AnimationEasing;

/// Maps linear progress `t` in `[0, 1]` onto the easing curve.
pub fn ease(easing: AnimationEasing, t: f64) -> f64 {
    use AnimationEasing::*;
    let t = t.clamp(0.0, 1.0);
    match easing {
        Linear => t,
        // https://notes.yvt.jp/Graphics/Easing-Functions/
        EaseInOut => {
            if t < 0.5 {
                (1.0 - f64::sqrt(1.0 - f64::powi(2.0 * t, 2))) / 2.0
            } else {
                (f64::sqrt(1.0 - f64::powi(-2.0 * t + 2.0, 2)) + 1.0) / 2.0
            }
        }
        EaseInSine => 1.0 - f64::cos(t * PI / 2.0),
        EaseOutSine => f64::sin(t * PI / 2.0),
        EaseInOutSine => -(f64::cos(PI * t) - 1.0) / 2.0,
        EaseInQuad => ease_in_pow(t, 2),
        EaseOutQuad => ease_out_pow(t, 2),
        EaseInOutQuad => ease_in_out_pow(t, 2),
        EaseInCubic => ease_in_pow(t, 3),
        EaseOutCubic => ease_out_pow(t, 3),
        EaseInOutCubic => ease_in_out_pow(t, 3),
        EaseInQuart => ease_in_pow(t, 4),
        EaseOutQuart => ease_out_pow(t, 4),
        EaseInOutQuart => ease_in_out_pow(t, 4),
        EaseInQuint => ease_in_pow(t, 5),
        EaseOutQuint => ease_out_pow(t, 5),
        EaseInOutQuint => ease_in_out_pow(t, 5),
        EaseInExpo => {
            if t == 0.0 {
                0.0
            } else {
                f64::powf(2.0, 10.0 * t - 10.0)
            }
        }
        EaseOutExpo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - f64::powf(2.0, -10.0 * t)
            }
        }
        EaseInOutExpo => {
            if t == 0.0 || t == 1.0 {
                t
            } else if t < 0.5 {
                f64::powf(2.0, 20.0 * t - 10.0) / 2.0
            } else {
                (2.0 - f64::powf(2.0, -20.0 * t + 10.0)) / 2.0
            }
        }
        EaseInCirc => 1.0 - f64::sqrt(1.0 - t * t),
        EaseOutCirc => f64::sqrt(1.0 - f64::powi(t - 1.0, 2)),
        EaseInOutCirc => ease(EaseInOut, t),
    }
}

fn ease_in_pow(t: f64, n: i32) -> f64 { f64::powi(t, n) }

fn ease_out_pow(t: f64, n: i32) -> f64 { 1.0 - f64::powi(1.0 - t, n) }

fn ease_in_out_pow(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        f64::powi(2.0, n - 1) * f64::powi(t, n)
    } else {
        1.0 - f64::powi(-2.0 * t + 2.0, n) / 2.0
    }
}

pub fn blend(a: f64, b: f64, s: f64) -> f64 { (1.0 - s) * a + s * b }

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_curve_starts_at_zero_and_ends_at_one() {
        for easing in AnimationEasing::iter() {
            assert!(ease(easing, 0.0).abs() < 1e-9, "{easing:?} does not start at 0");
            assert!((ease(easing, 1.0) - 1.0).abs() < 1e-9, "{easing:?} does not end at 1");
        }
    }

    #[test]
    fn ease_out_quad_leads_linear() {
        assert!(ease(AnimationEasing::EaseOutQuad, 0.5) > 0.5);
        assert!(ease(AnimationEasing::EaseInQuad, 0.5) < 0.5);
    }

    #[test]
    fn blend_interpolates() {
        assert_eq!(blend(0.0, 10.0, 0.0), 0.0);
        assert_eq!(blend(0.0, 10.0, 1.0), 10.0);
        assert_eq!(blend(-4.0, 4.0, 0.5), 0.0);
    }
}
