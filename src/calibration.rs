//! Camera intrinsics loader.
//!
//! The calibration file is plain text:
//!
//! ```text
//! <header, ignored>
//! fx  0  cx
//! 0   fy cy
//! 0   0  1
//! <ignored>
//! k1 k2 p1 p2 k3
//! ```
//!
//! Any deviation is fatal: the caller is expected to abort at startup.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

const MATRIX_ROWS: std::ops::Range<usize> = 1..4;
const DISTORTION_LINE: usize = 5;
const MIN_LINES: usize = DISTORTION_LINE + 1;

/// 3x3 camera matrix plus distortion coefficients.
///
/// Only `fx` participates in distance conversion. The rest is kept so the
/// calibration artifact round-trips into logs intact.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub matrix: [[f64; 3]; 3],
    pub distortion: Vec<f64>,
}

impl CameraIntrinsics {
    pub fn new(matrix: [[f64; 3]; 3], distortion: Vec<f64>) -> Self {
        Self { matrix, distortion }
    }

    /// Pinhole intrinsics with no skew and no distortion.
    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self::new([[fx, 0.0, cx], [0.0, fy, cy], [0.0, 0.0, 1.0]], Vec::new())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid calibration file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let lines: Vec<&str> = raw.lines().map(str::trim).collect();
        if lines.len() < MIN_LINES {
            return Err(anyhow!(
                "expected at least {} lines, found {}",
                MIN_LINES,
                lines.len()
            ));
        }

        let mut matrix = [[0.0f64; 3]; 3];
        for (row, line_no) in MATRIX_ROWS.enumerate() {
            let values = parse_floats(lines[line_no], line_no)?;
            if values.len() != 3 {
                return Err(anyhow!(
                    "line {}: camera matrix row needs 3 values, found {}",
                    line_no + 1,
                    values.len()
                ));
            }
            matrix[row].copy_from_slice(&values);
        }

        let distortion = parse_floats(lines[DISTORTION_LINE], DISTORTION_LINE)?;

        Ok(Self { matrix, distortion })
    }

    pub fn fx(&self) -> f64 {
        self.matrix[0][0]
    }

    pub fn fy(&self) -> f64 {
        self.matrix[1][1]
    }

    pub fn cx(&self) -> f64 {
        self.matrix[0][2]
    }

    pub fn cy(&self) -> f64 {
        self.matrix[1][2]
    }
}

fn parse_floats(line: &str, line_no: usize) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                anyhow!("line {}: '{}' is not a number", line_no + 1, token)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
camera matrix
612.5 0.0 320.1
0.0 610.25 241.7
0.0 0.0 1.0
distortion
0.11 -0.23 0.001 0.002 0.05
";

    #[test]
    fn parses_matrix_and_distortion() -> Result<()> {
        let intr = CameraIntrinsics::parse(SAMPLE)?;
        assert_eq!(intr.fx(), 612.5);
        assert_eq!(intr.fy(), 610.25);
        assert_eq!(intr.cx(), 320.1);
        assert_eq!(intr.cy(), 241.7);
        assert_eq!(intr.distortion, vec![0.11, -0.23, 0.001, 0.002, 0.05]);
        Ok(())
    }

    #[test]
    fn rejects_truncated_file() {
        let err = CameraIntrinsics::parse("header\n1 0 0\n0 1 0\n").unwrap_err();
        assert!(err.to_string().contains("at least 6 lines"));
    }

    #[test]
    fn rejects_non_numeric_field() {
        let bad = SAMPLE.replace("610.25", "f_y");
        let err = CameraIntrinsics::parse(&bad).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn rejects_short_matrix_row() {
        let bad = SAMPLE.replace("0.0 0.0 1.0", "0.0 1.0");
        assert!(CameraIntrinsics::parse(&bad).is_err());
    }

    #[test]
    fn load_reports_path() {
        let err = CameraIntrinsics::load("/nonexistent/calibration.txt").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/calibration.txt"));
    }
}
