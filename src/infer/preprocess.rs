use anyhow::Result;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::frame::Frame;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Build the `1x3xSxS` model input for a frame.
///
/// The frame is resized bicubically to `size x size` (aspect ratio not kept),
/// scaled to `[0, 1]`, then normalized with ImageNet mean and std.
pub fn to_model_input(frame: &Frame, size: u32) -> Result<Array4<f32>> {
    let rgb = frame.to_rgb_image()?;
    let resized = if rgb.dimensions() == (size, size) {
        rgb
    } else {
        imageops::resize(&rgb, size, size, FilterType::CatmullRom)
    };

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            input[[0, c, y as usize, x as usize]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    Ok(input)
}
