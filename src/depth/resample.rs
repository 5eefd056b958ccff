use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

use crate::depth::DepthMap;

/// Bicubic resize of an `f32` map to `(rows, cols)`.
///
/// Used to bring model output back to frame resolution. Sample positions
/// follow pixel centres (no corner alignment).
///
/// `imageops` clamps float pixels to `[0, 1]`, so values are min-max scaled
/// into that range for the resize and mapped back afterwards. Overshoot from
/// the cubic kernel is clipped at the original extremes.
pub fn resize_bicubic(map: &DepthMap<f32>, rows: usize, cols: usize) -> Result<DepthMap<f32>> {
    if rows == 0 || cols == 0 {
        return Err(anyhow!("cannot resize depth map to {}x{}", cols, rows));
    }
    if map.dim() == (rows, cols) {
        return Ok(map.clone());
    }
    if map.is_empty() {
        return Err(anyhow!("cannot resize an empty depth map"));
    }

    let lo = map.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = map.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = hi - lo;
    if !range.is_finite() || range <= 0.0 {
        return Ok(DepthMap::from_elem((rows, cols), if lo.is_finite() { lo } else { 0.0 }));
    }

    let (src_rows, src_cols) = map.dim();
    let src: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(src_cols as u32, src_rows as u32, |x, y| {
            Luma([(map[[y as usize, x as usize]] - lo) / range])
        });
    let resized = imageops::resize(&src, cols as u32, rows as u32, FilterType::CatmullRom);

    let unit = DepthMap::from_shape_vec((rows, cols), resized.into_raw())
        .map_err(|e| anyhow!("resized depth map has wrong shape: {}", e))?;
    Ok(unit.mapv(|v| lo + v * range))
}
