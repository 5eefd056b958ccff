use crate::calibration::CameraIntrinsics;
use crate::depth::{DistanceMap, UnitDepthMap};
use crate::DEFAULT_BASELINE_M;

/// Substituted for an exact zero depth before conversion.
pub const ZERO_DEPTH_FLOOR: f32 = 0.0001;

/// Converts unit depth to metres with `distance = baseline * fx * depth`.
///
/// A single-camera approximation borrowed from stereo triangulation: `fy`,
/// the principal point and distortion are not used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceConverter {
    pub baseline_m: f32,
    /// Upper clamp in metres. `None` leaves distances unbounded.
    pub max_distance_m: Option<f32>,
}

impl Default for DistanceConverter {
    fn default() -> Self {
        Self {
            baseline_m: DEFAULT_BASELINE_M,
            max_distance_m: None,
        }
    }
}

impl DistanceConverter {
    pub fn new(baseline_m: f32) -> Self {
        Self {
            baseline_m,
            max_distance_m: None,
        }
    }

    /// Enable the upper clamp.
    pub fn with_max_distance(mut self, max_distance_m: f32) -> Self {
        self.max_distance_m = Some(max_distance_m);
        self
    }

    pub fn to_distance(&self, depth: &UnitDepthMap, intrinsics: &CameraIntrinsics) -> DistanceMap {
        let fx = intrinsics.fx() as f32;
        let scale = self.baseline_m * fx;
        let clamp = self.max_distance_m;
        depth.mapv(|d| {
            let d = if d == 0.0 { ZERO_DEPTH_FLOOR } else { d };
            let distance = scale * d;
            match clamp {
                Some(max) if distance > max => max,
                _ => distance,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn intrinsics(fx: f64) -> CameraIntrinsics {
        CameraIntrinsics::pinhole(fx, fx * 2.0, 320.0, 240.0)
    }

    #[test]
    fn zero_depth_is_floored_before_scaling() {
        let conv = DistanceConverter::new(0.016);
        let depth = array![[0.0f32, 0.5], [1.0, 0.25]];
        let dist = conv.to_distance(&depth, &intrinsics(500.0));

        let scale = 0.016f32 * 500.0;
        assert_eq!(dist[[0, 0]], scale * ZERO_DEPTH_FLOOR);
        assert_eq!(dist[[0, 1]], scale * 0.5);
        assert_eq!(dist[[1, 0]], scale);
        assert!(dist.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn only_fx_matters() {
        let conv = DistanceConverter::default();
        let depth = array![[0.75f32]];
        let a = conv.to_distance(&depth, &CameraIntrinsics::pinhole(600.0, 1.0, 0.0, 0.0));
        let b = conv.to_distance(&depth, &CameraIntrinsics::pinhole(600.0, 900.0, 300.0, 200.0));
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_is_off_by_default() {
        let conv = DistanceConverter::new(10.0);
        let depth = array![[1.0f32]];
        let dist = conv.to_distance(&depth, &intrinsics(2000.0));
        assert_eq!(dist[[0, 0]], 20000.0);

        let clamped = conv.with_max_distance(10000.0).to_distance(&depth, &intrinsics(2000.0));
        assert_eq!(clamped[[0, 0]], 10000.0);
    }
}
