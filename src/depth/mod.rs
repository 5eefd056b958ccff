//! Depth maps and their conversion to metric distance.
//!
//! All maps are row-major `ndarray::Array2` values shaped `(rows, cols)`,
//! i.e. `(frame height, frame width)`.

mod distance;
mod normalize;
mod resample;

pub use distance::{DistanceConverter, ZERO_DEPTH_FLOOR};
pub use normalize::{invert_unit, scale_to_u16, DegenerateFrame};
pub use resample::resize_bicubic;

use ndarray::Array2;

/// Row-major 2D map of per-pixel values.
pub type DepthMap<T> = Array2<T>;

/// Unscaled model output. No unit, no fixed range.
pub type RawDepthMap = DepthMap<f32>;

/// Stage A output: raw depth rescaled onto `0..=65535`.
pub type NormalizedDepthMap = DepthMap<u16>;

/// Stage B output: `[0, 1]`, inverted so that larger means farther.
pub type UnitDepthMap = DepthMap<f32>;

/// Metric distance, in metres.
pub type DistanceMap = DepthMap<f32>;
