use anyhow::Result;

use crate::depth::RawDepthMap;
use crate::frame::Frame;
use crate::infer::backend::DepthBackend;

/// Weight of the vertical ground-plane prior relative to luminance.
const GROUND_WEIGHT: f32 = 64.0;

/// Stub backend for testing and demos.
///
/// Pretends brighter pixels are closer, plus a ground-plane prior that makes
/// lower rows closer than upper rows. Output is in the same "larger = closer"
/// convention as real relative-depth models.
#[derive(Default)]
pub struct StubBackend {
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DepthBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<RawDepthMap> {
        self.frames_seen += 1;
        let rows = frame.height as usize;
        let cols = frame.width as usize;
        let denom = rows.max(1) as f32;
        Ok(RawDepthMap::from_shape_fn((rows, cols), |(y, x)| {
            let [r, g, b] = frame.pixel(x as u32, y as u32);
            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            luma + GROUND_WEIGHT * (y as f32 / denom)
        }))
    }
}
