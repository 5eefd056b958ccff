use std::fmt;

use crate::depth::{NormalizedDepthMap, RawDepthMap, UnitDepthMap};
use crate::NORMALIZED_MAX;

/// Stage B could not rescale because the 16-bit map is all zeros.
///
/// Happens when the raw prediction has no dynamic range. Callers decide how
/// to continue; the pipeline substitutes a zero-filled unit map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DegenerateFrame {
    pub rows: usize,
    pub cols: usize,
}

impl fmt::Display for DegenerateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "degenerate depth frame ({}x{}): normalized maximum is zero",
            self.cols, self.rows
        )
    }
}

impl std::error::Error for DegenerateFrame {}

/// Stage A: stretch the raw prediction onto the full 16-bit range.
///
/// A map whose range does not exceed `f64::EPSILON` becomes all zeros.
/// Non-finite inputs are treated as the minimum.
pub fn scale_to_u16(raw: &RawDepthMap) -> NormalizedDepthMap {
    let (min, max) = finite_range(raw);
    let range = max - min;
    if (range as f64) <= f64::EPSILON {
        return NormalizedDepthMap::zeros(raw.dim());
    }

    let full_scale = NORMALIZED_MAX as f32;
    raw.mapv(|v| {
        if !v.is_finite() {
            return 0;
        }
        let scaled = full_scale * (v - min) / range;
        // `as` truncates toward zero and saturates.
        scaled as u16
    })
}

/// Stage B: rescale to `[0, 1]` by the map maximum, then invert.
///
/// The model reports closer surfaces with larger values; the distance formula
/// wants larger values to mean farther, hence `max - v`.
pub fn invert_unit(scaled: &NormalizedDepthMap) -> Result<UnitDepthMap, DegenerateFrame> {
    let peak = scaled.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        let (rows, cols) = scaled.dim();
        return Err(DegenerateFrame { rows, cols });
    }

    // Rescale and invert in f64; narrow to f32 only for the result.
    let peak = peak as f64;
    let unit_max = scaled
        .iter()
        .map(|&v| v as f64 / peak)
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(scaled.mapv(|v| (unit_max - v as f64 / peak) as f32))
}

fn finite_range(raw: &RawDepthMap) -> (f32, f32) {
    raw.iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f32, f32)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn stage_a_spans_full_range_and_preserves_order() {
        let raw = array![[3.0f32, -1.0, 7.5], [0.25, 2.0, 7.0]];
        let scaled = scale_to_u16(&raw);

        assert_eq!(scaled[[0, 1]], 0);
        assert_eq!(scaled[[0, 2]], u16::MAX);

        let mut pairs: Vec<(f32, u16)> = raw.iter().copied().zip(scaled.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1, "order broken at {:?}", w);
        }
    }

    #[test]
    fn stage_a_constant_map_is_zero() {
        let raw = RawDepthMap::from_elem((4, 5), 12.5);
        let scaled = scale_to_u16(&raw);
        assert!(scaled.iter().all(|&v| v == 0));
        assert_eq!(scaled.dim(), (4, 5));
    }

    #[test]
    fn stage_a_ignores_non_finite_values() {
        let raw = array![[0.0f32, f32::NAN], [10.0, f32::INFINITY]];
        let scaled = scale_to_u16(&raw);
        assert_eq!(scaled[[0, 0]], 0);
        assert_eq!(scaled[[0, 1]], 0);
        assert_eq!(scaled[[1, 0]], u16::MAX);
        assert_eq!(scaled[[1, 1]], 0);
    }

    #[test]
    fn stage_b_inverts_polarity() {
        let scaled = array![[0u16, 32768, 65535]];
        let unit = invert_unit(&scaled).unwrap();
        assert_eq!(unit[[0, 0]], 1.0);
        assert_eq!(unit[[0, 2]], 0.0);
        assert!(unit[[0, 1]] > 0.49 && unit[[0, 1]] < 0.51);
    }

    #[test]
    fn stage_b_rounds_once_from_double_precision() {
        let scaled = NormalizedDepthMap::from_shape_fn((256, 256), |(r, c)| (r * 256 + c) as u16);
        let unit = invert_unit(&scaled).unwrap();

        let peak = u16::MAX as f64;
        let mismatches: Vec<u16> = scaled
            .iter()
            .zip(unit.iter())
            .filter(|(&v, &u)| u.to_bits() != ((1.0 - v as f64 / peak) as f32).to_bits())
            .map(|(&v, _)| v)
            .collect();
        assert!(mismatches.is_empty(), "{} values differ, first {:?}", mismatches.len(), mismatches.first());
        assert_eq!(unit[[0, 128]], (1.0 - 128.0 / peak) as f32);
    }

    #[test]
    fn stage_b_signals_degenerate_frame() {
        let scaled = NormalizedDepthMap::zeros((2, 3));
        let err = invert_unit(&scaled).unwrap_err();
        assert_eq!(err, DegenerateFrame { rows: 2, cols: 3 });
        assert!(err.to_string().contains("3x2"));
    }
}
