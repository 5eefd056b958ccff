use ab_glyph::{FontRef, PxScale};
use anyhow::{anyhow, Result};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use serde::Serialize;

use super::colormap::{gray_unit, jet_minmax};
use crate::depth::{DistanceMap, UnitDepthMap};
use crate::frame::Frame;
use crate::grid::GridSummary;

const GRID_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const POINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const POINT_RADIUS: i32 = 5;
const MAP_TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_SCALE: f32 = 14.0;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Text anchored at a pixel, in `(x, y)` = (column, row). The anchor is the
/// bottom-left corner of the rendered text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label {
    pub x: u32,
    pub y: u32,
    pub text: String,
}

/// The four per-frame views plus their labels.
pub struct FrameViews {
    pub depth: GrayImage,
    pub map: RgbImage,
    pub distance: RgbImage,
    pub image: RgbImage,
    /// Point-sample distances, also drawn on `image`.
    pub image_labels: Vec<Label>,
    /// Cell means, also drawn on `map`.
    pub map_labels: Vec<Label>,
}

pub fn compose_views(
    frame: &Frame,
    depth: &UnitDepthMap,
    distance: &DistanceMap,
    grid: &GridSummary,
) -> Result<FrameViews> {
    let font = FontRef::try_from_slice(LABEL_FONT)
        .map_err(|e| anyhow!("label font failed to load: {}", e))?;
    let mut image = frame.to_rgb_image()?;

    for i in 0..grid.size {
        for j in 0..grid.size {
            let b = grid.bounds(i, j);
            // cv-style inclusive corners: one pixel wider than the cell.
            let rect = Rect::at(b.col_start as i32, b.row_start as i32)
                .of_size(grid.col_step as u32 + 1, grid.row_step as u32 + 1);
            draw_hollow_rect_mut(&mut image, rect, GRID_COLOR);
        }
    }

    let mut image_labels = Vec::with_capacity(grid.samples.len());
    for sample in &grid.samples {
        draw_filled_circle_mut(
            &mut image,
            (sample.x as i32, sample.y as i32),
            POINT_RADIUS,
            POINT_COLOR,
        );
        image_labels.push(Label {
            x: sample.x as u32,
            y: sample.y as u32,
            text: format!("{:.2} m", sample.distance_m),
        });
    }

    for label in &image_labels {
        draw_label(&mut image, label, POINT_COLOR, &font);
    }

    let region = grid.region_map(distance.dim());
    let mut map = jet_minmax(&region);
    let mut map_labels = Vec::with_capacity(grid.size * grid.size);
    for (i, row) in grid.cells.iter().enumerate() {
        for (j, mean) in row.iter().enumerate() {
            map_labels.push(Label {
                x: (j * grid.col_step + grid.col_step / 2) as u32,
                y: (i * grid.row_step + grid.row_step / 2) as u32,
                text: format!("{:.2} m", mean),
            });
        }
    }

    for label in &map_labels {
        draw_label(&mut map, label, MAP_TEXT_COLOR, &font);
    }

    Ok(FrameViews {
        depth: gray_unit(depth),
        map,
        distance: jet_minmax(distance),
        image,
        image_labels,
        map_labels,
    })
}

fn draw_label(canvas: &mut RgbImage, label: &Label, color: Rgb<u8>, font: &FontRef<'_>) {
    let scale = PxScale::from(LABEL_SCALE);
    let (_, height) = text_size(scale, font, &label.text);
    draw_text_mut(
        canvas,
        color,
        label.x as i32,
        label.y as i32 - height as i32,
        scale,
        font,
        &label.text,
    );
}
