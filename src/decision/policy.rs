use anyhow::Result;
use serde::Serialize;

/// Result of a decision policy. Only logged and reported; nothing in the
/// pipeline reads it back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub label: String,
    pub detail: String,
}

impl Decision {
    pub fn new(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
        }
    }
}

/// Consumer of the per-cell mean distance grid.
///
/// `grid` is row-major, `grid[i][j]` in metres. Implementations may keep
/// state between calls; the trigger invokes them in strictly increasing frame
/// order.
pub trait DecisionPolicy: Send {
    /// Policy identifier.
    fn name(&self) -> &'static str;

    fn decide(&mut self, grid: &[Vec<f32>]) -> Result<Decision>;
}
