//! Volume normalization
//!
//! The store keeps volume as a linear gain in 0.0..=1.0. Backends speak
//! their own scale: native audio takes the linear value as-is, the embedded
//! video player takes a 0-100 percentage.

use crate::backend::BackendKind;

/// Clamp a requested volume into `0.0..=1.0`
///
/// NaN clamps to 0 so the invariant holds for any input.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Convert a linear volume to the scale `kind` expects
pub fn to_backend_scale(kind: BackendKind, volume: f64) -> f64 {
    let volume = clamp_volume(volume);
    match kind {
        BackendKind::NativeAudio => volume,
        BackendKind::EmbeddedVideo => volume * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_examples() {
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(1.7), 1.0);
        assert_eq!(clamp_volume(0.3), 0.3);
        assert_eq!(clamp_volume(f64::NAN), 0.0);
        assert_eq!(clamp_volume(f64::INFINITY), 1.0);
        assert_eq!(clamp_volume(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_backend_scales() {
        assert_eq!(to_backend_scale(BackendKind::NativeAudio, 0.7), 0.7);
        assert!((to_backend_scale(BackendKind::EmbeddedVideo, 0.7) - 70.0).abs() < 1e-9);
        assert_eq!(to_backend_scale(BackendKind::EmbeddedVideo, 3.0), 100.0);
    }

    proptest! {
        #[test]
        fn clamp_stays_in_unit_range(v in proptest::num::f64::ANY) {
            let c = clamp_volume(v);
            prop_assert!((0.0..=1.0).contains(&c));
            if (0.0..=1.0).contains(&v) {
                prop_assert_eq!(c, v);
            }
        }
    }
}
