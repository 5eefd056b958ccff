use anyhow::Result;

use crate::depth::RawDepthMap;
use crate::frame::Frame;

/// Depth backend trait.
///
/// Output must be shaped `(frame.height, frame.width)`. Values are unscaled;
/// larger values mean closer surfaces, the convention of relative-depth
/// models. The pipeline normalizes them.
pub trait DepthBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Predict raw depth for one frame.
    fn infer(&mut self, frame: &Frame) -> Result<RawDepthMap>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
