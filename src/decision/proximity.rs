use anyhow::{anyhow, Result};

use super::policy::{Decision, DecisionPolicy};

/// Cells whose mean distance falls below this are considered blocked.
pub const DEFAULT_CLEARANCE_M: f32 = 1.0;

/// Steering hint from column clearance.
///
/// Each grid column is `blocked` when any of its cells is closer than the
/// clearance. The label is `clear` when the centre column is open, otherwise
/// the open side with more room (`steer_left` / `steer_right`), or `stop`
/// when every column is blocked.
pub struct ProximityPolicy {
    clearance_m: f32,
}

impl ProximityPolicy {
    pub fn new(clearance_m: f32) -> Self {
        Self { clearance_m }
    }

    pub fn clearance_m(&self) -> f32 {
        self.clearance_m
    }
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CLEARANCE_M)
    }
}

impl DecisionPolicy for ProximityPolicy {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn decide(&mut self, grid: &[Vec<f32>]) -> Result<Decision> {
        let cols = grid.first().map(Vec::len).unwrap_or(0);
        if cols == 0 || grid.iter().any(|row| row.len() != cols) {
            return Err(anyhow!("decision grid must be a non-empty rectangle"));
        }
        if grid.iter().flatten().any(|d| !d.is_finite()) {
            return Err(anyhow!("decision grid contains non-finite distances"));
        }

        let column_min: Vec<f32> = (0..cols)
            .map(|j| {
                grid.iter()
                    .map(|row| row[j])
                    .fold(f32::INFINITY, f32::min)
            })
            .collect();
        let blocked: Vec<bool> = column_min.iter().map(|&d| d < self.clearance_m).collect();

        let centre = cols / 2;
        let left = &column_min[..centre];
        let right = &column_min[centre + 1..];
        let room = |side: &[f32], open: &[bool]| {
            side.iter()
                .zip(open)
                .filter(|(_, b)| !**b)
                .map(|(d, _)| *d)
                .fold(None, |acc: Option<f32>, d| Some(acc.map_or(d, |a| a.max(d))))
        };

        let label = if !blocked[centre] {
            "clear"
        } else {
            match (
                room(left, &blocked[..centre]),
                room(right, &blocked[centre + 1..]),
            ) {
                (None, None) => "stop",
                (Some(_), None) => "steer_left",
                (None, Some(_)) => "steer_right",
                (Some(l), Some(r)) if l >= r => "steer_left",
                (Some(_), Some(_)) => "steer_right",
            }
        };

        let detail = column_min
            .iter()
            .zip(&blocked)
            .map(|(d, b)| format!("{:.2}m{}", d, if *b { "!" } else { "" }))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Decision::new(label, detail))
    }
}
