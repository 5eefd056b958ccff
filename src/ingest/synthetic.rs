//! Synthetic frame source (`stub://`).
//!
//! Produces a deterministic scene: a dark upper half fading to a brighter
//! floor, plus a bright vertical band that sweeps left to right and wraps.
//! With the stub backend the band reads as a near obstacle crossing the
//! view.

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceConfig, SourceStats};
use crate::frame::Frame;

/// Band width as a fraction of frame width.
const BAND_FRACTION: u32 = 6;

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "synthetic source needs non-zero dimensions, got {}x{}",
                config.width,
                config.height
            ));
        }
        Ok(Self {
            config,
            frame_count: 0,
            connected: false,
        })
    }

    fn render(&self) -> Vec<u8> {
        let w = self.config.width;
        let h = self.config.height;
        let band_w = (w / BAND_FRACTION).max(1);
        let band_start = ((self.frame_count.saturating_sub(1) * 4) % w as u64) as u32;

        let mut pixels = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            let floor = (40 + 120 * y / h.max(1)) as u8;
            for x in 0..w {
                let offset = (x + w - band_start) % w;
                if offset < band_w {
                    pixels.extend_from_slice(&[250, 240, 230]);
                } else {
                    pixels.extend_from_slice(&[floor / 2, floor, floor / 3]);
                }
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.uri,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source {} not connected", self.config.uri));
        }
        if let Some(limit) = self.config.max_frames {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;
        let pixels = self.render();
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )
        .map(Some)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.config.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_frames: Option<u64>) -> SourceConfig {
        SourceConfig {
            uri: "stub://test".to_string(),
            target_fps: 10,
            width: 60,
            height: 30,
            max_frames,
        }
    }

    #[test]
    fn produces_numbered_frames_until_limit() -> Result<()> {
        let mut source = SyntheticSource::new(config(Some(3)))?;
        source.connect()?;
        let seqs: Vec<u64> = std::iter::from_fn(|| source.next_frame().ok().flatten())
            .map(|f| f.sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 3);
        Ok(())
    }

    #[test]
    fn band_moves_between_frames() -> Result<()> {
        let mut source = SyntheticSource::new(config(None))?;
        source.connect()?;
        let a = source.next_frame()?.expect("frame");
        let b = source.next_frame()?.expect("frame");
        assert_eq!(a.pixel(0, 0), [250, 240, 230]);
        assert_ne!(b.pixel(0, 0), [250, 240, 230]);
        assert_eq!(b.pixel(4, 0), [250, 240, 230]);
        Ok(())
    }

    #[test]
    fn requires_connect() -> Result<()> {
        let mut source = SyntheticSource::new(config(None))?;
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
        Ok(())
    }

    #[test]
    fn rejects_zero_dimensions() {
        let mut cfg = config(None);
        cfg.width = 0;
        assert!(SyntheticSource::new(cfg).is_err());
    }
}
