use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;

/// Min-max stretch to `0..=255`, truncating. A flat map becomes all zeros.
pub fn minmax_to_u8(map: &Array2<f32>) -> Array2<u8> {
    let lo = map.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = map.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = hi - lo;
    if !range.is_finite() || range <= 0.0 {
        return Array2::zeros(map.dim());
    }
    map.mapv(|v| (255.0 * (v - lo) / range) as u8)
}

/// JET colormap entry for an 8-bit level (blue = 0, red = 255).
pub fn jet(level: u8) -> Rgb<u8> {
    let v = level as f32 / 255.0;
    let channel = |centre: f32| {
        let c = (1.5 - (4.0 * v - centre).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Min-max stretch then JET color a map shaped `(rows, cols)`.
pub fn jet_minmax(map: &Array2<f32>) -> RgbImage {
    let levels = minmax_to_u8(map);
    let (rows, cols) = levels.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        jet(levels[[y as usize, x as usize]])
    })
}

/// Render a `[0, 1]` map as grayscale.
pub fn gray_unit(map: &Array2<f32>) -> GrayImage {
    let (rows, cols) = map.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = map[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(v * 255.0).round() as u8])
    })
}
