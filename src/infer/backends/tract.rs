#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::depth::{resize_bicubic, RawDepthMap};
use crate::frame::Frame;
use crate::infer::backend::DepthBackend;
use crate::infer::device::ExecutionDevice;
use crate::infer::preprocess::to_model_input;

/// Tract-based backend for ONNX monocular depth models.
///
/// Expects a `1x3xSxS` float input and a single depth output of shape
/// `[1, S, S]`, `[1, 1, S, S]` or `[S, S]`.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    input_size: u32,
    device: ExecutionDevice,
}

impl TractBackend {
    /// Devices tract can run on, most preferred first.
    pub const SUPPORTED_DEVICES: &'static [ExecutionDevice] = &[ExecutionDevice::Cpu];

    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        device: ExecutionDevice,
    ) -> Result<Self> {
        let device = device.resolve(Self::SUPPORTED_DEVICES)?;
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} ({}x{} input, device={})",
            model_path.display(),
            input_size,
            input_size,
            device
        );

        Ok(Self {
            model,
            input_size,
            device,
        })
    }

    pub fn device(&self) -> ExecutionDevice {
        self.device
    }

    fn extract_depth(&self, outputs: TVec<TValue>) -> Result<RawDepthMap> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() < 2 || shape[..shape.len() - 2].iter().any(|&d| d != 1) {
            return Err(anyhow!("unexpected depth output shape {:?}", shape));
        }
        let rows = shape[shape.len() - 2];
        let cols = shape[shape.len() - 1];
        let data: Vec<f32> = view.iter().copied().collect();
        RawDepthMap::from_shape_vec((rows, cols), data)
            .map_err(|e| anyhow!("depth output reshape failed: {}", e))
    }
}

impl DepthBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<RawDepthMap> {
        let input = to_model_input(frame, self.input_size)?;
        let side = self.input_size as usize;
        let data = input
            .as_slice()
            .ok_or_else(|| anyhow!("model input is not contiguous"))?;
        let tensor = Tensor::from_shape(&[1, 3, side, side], data)
            .context("failed to build input tensor")?;

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let depth = self.extract_depth(outputs)?;

        resize_bicubic(&depth, frame.height as usize, frame.width as usize)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size as usize;
        let tensor = Tensor::zero::<f32>(&[1, 3, side, side])?;
        self.model
            .run(tvec!(tensor.into()))
            .context("ONNX warm-up failed")?;
        Ok(())
    }
}
