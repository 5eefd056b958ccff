//! Spatial grid aggregation.
//!
//! The distance map is cut into `size x size` equal cells. With
//! `(width, height) = map.dim()` (note: `width` is the *row* count here),
//! `w_n = width / size` and `h_n = height / size`:
//!
//! - cell `(i, j)` covers rows `[i*w_n, (i+1)*w_n)` and columns
//!   `[j*h_n, (j+1)*h_n)`;
//! - rows and columns left over by the integer division belong to no cell;
//! - the sample for cell `(i, j)` is the single pixel at
//!   `x = j*h_n + h_n/2`, `y = i*w_n + w_n/2` (column, row).
//!
//! Downstream consumers depend on this exact slicing, remainder loss included.
//!
//! Cell means accumulate in `f64` and round to `f32` once. This can differ in
//! the last bit from a mean accumulated in `f32` (pairwise or sequential),
//! but it does not depend on summation order and is exact for uniform cells.

use anyhow::{anyhow, Result};
use ndarray::s;
use serde::Serialize;

use crate::depth::DistanceMap;
use crate::DEFAULT_GRID_SIZE;

/// Distance read at a cell's centre pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SamplePoint {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    pub distance_m: f32,
}

/// Rows/columns spanned by one cell. End bounds are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CellBounds {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

/// Output of one aggregation pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridSummary {
    pub size: usize,
    /// Samples in row-major cell order.
    pub samples: Vec<SamplePoint>,
    /// Mean distance per cell, `cells[i][j]`.
    pub cells: Vec<Vec<f32>>,
    /// Row step (`w_n`).
    pub row_step: usize,
    /// Column step (`h_n`).
    pub col_step: usize,
}

impl GridSummary {
    pub fn bounds(&self, i: usize, j: usize) -> CellBounds {
        CellBounds {
            row_start: i * self.row_step,
            row_end: (i + 1) * self.row_step,
            col_start: j * self.col_step,
            col_end: (j + 1) * self.col_step,
        }
    }

    /// Smallest cell mean and its `(i, j)`.
    pub fn nearest_cell(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, usize, f32)> = None;
        for (i, row) in self.cells.iter().enumerate() {
            for (j, &d) in row.iter().enumerate() {
                if best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((i, j, d));
                }
            }
        }
        best
    }

    /// A map of `shape` where every cell's pixels hold its mean. Pixels
    /// outside every cell are zero.
    pub fn region_map(&self, shape: (usize, usize)) -> DistanceMap {
        let mut map = DistanceMap::zeros(shape);
        for i in 0..self.size {
            for j in 0..self.size {
                let b = self.bounds(i, j);
                map.slice_mut(s![b.row_start..b.row_end, b.col_start..b.col_end])
                    .fill(self.cells[i][j]);
            }
        }
        map
    }
}

/// Partitions distance maps into a fixed grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridAggregator {
    size: usize,
}

impl Default for GridAggregator {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
        }
    }
}

impl GridAggregator {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(anyhow!("grid size must be > 0"));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute cell means and centre samples.
    ///
    /// Fails when the map is too small to give every cell at least one pixel.
    pub fn aggregate(&self, distance: &DistanceMap) -> Result<GridSummary> {
        let (width, height) = distance.dim();
        let w_n = width / self.size;
        let h_n = height / self.size;
        if w_n == 0 || h_n == 0 {
            return Err(anyhow!(
                "distance map {}x{} is too small for a {}x{} grid",
                height,
                width,
                self.size,
                self.size
            ));
        }

        let mut samples = Vec::with_capacity(self.size * self.size);
        let mut cells = Vec::with_capacity(self.size);
        for i in 0..self.size {
            let mut row = Vec::with_capacity(self.size);
            for j in 0..self.size {
                let x = j * h_n + h_n / 2;
                let y = i * w_n + w_n / 2;
                samples.push(SamplePoint {
                    x,
                    y,
                    distance_m: distance[[y, x]],
                });

                let cell = distance.slice(s![i * w_n..(i + 1) * w_n, j * h_n..(j + 1) * h_n]);
                let sum: f64 = cell.iter().map(|&v| v as f64).sum();
                row.push((sum / cell.len() as f64) as f32);
            }
            cells.push(row);
        }

        Ok(GridSummary {
            size: self.size,
            samples,
            cells,
            row_step: w_n,
            col_step: h_n,
        })
    }
}
