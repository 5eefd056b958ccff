//! Per-frame orchestration.
//!
//! `DistancePipeline::process` runs one frame through inference,
//! normalization, distance conversion, grid aggregation and the periodic
//! decision trigger. The only state carried between frames is the
//! `FrameContext` counter.

use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::calibration::CameraIntrinsics;
use crate::decision::{DecisionOutcome, DecisionPolicy, DecisionTrigger};
use crate::depth::{
    invert_unit, scale_to_u16, DistanceConverter, DistanceMap, UnitDepthMap,
};
use crate::frame::Frame;
use crate::grid::{GridAggregator, GridSummary};
use crate::infer::DepthBackend;
use crate::{DEFAULT_BASELINE_M, DEFAULT_DECISION_PERIOD, DEFAULT_GRID_SIZE};

/// Numeric knobs of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    pub baseline_m: f32,
    /// Distance clamp. `None` disables it.
    pub max_distance_m: Option<f32>,
    pub grid_size: usize,
    pub decision_period: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            baseline_m: DEFAULT_BASELINE_M,
            max_distance_m: None,
            grid_size: DEFAULT_GRID_SIZE,
            decision_period: DEFAULT_DECISION_PERIOD,
        }
    }
}

/// Cross-frame state: the processed-frame counter.
///
/// Starts at zero and is incremented exactly once per successfully processed
/// frame, before the decision trigger looks at it. Never reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameContext {
    frame_counter: u64,
}

impl FrameContext {
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    fn advance(&mut self) -> u64 {
        self.frame_counter += 1;
        self.frame_counter
    }
}

/// Serializable per-frame record.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub counter: u64,
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// The raw prediction had no dynamic range; a zero unit map was used.
    pub degenerate: bool,
    pub grid: GridSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionOutcome>,
    pub elapsed_ms: f64,
}

/// Everything one frame produced. Dropped at the end of its iteration.
pub struct ProcessedFrame {
    pub report: FrameReport,
    pub unit_depth: UnitDepthMap,
    pub distance: DistanceMap,
}

pub struct DistancePipeline {
    backend: Box<dyn DepthBackend>,
    policy: Box<dyn DecisionPolicy>,
    intrinsics: CameraIntrinsics,
    converter: DistanceConverter,
    aggregator: GridAggregator,
    trigger: DecisionTrigger,
    context: FrameContext,
}

impl DistancePipeline {
    pub fn new(
        backend: Box<dyn DepthBackend>,
        policy: Box<dyn DecisionPolicy>,
        intrinsics: CameraIntrinsics,
        settings: PipelineSettings,
    ) -> Result<Self> {
        if !(settings.baseline_m.is_finite() && settings.baseline_m > 0.0) {
            return Err(anyhow!("baseline must be a positive number of metres"));
        }
        if !(intrinsics.fx().is_finite() && intrinsics.fx() > 0.0) {
            return Err(anyhow!("camera matrix fx must be positive, got {}", intrinsics.fx()));
        }
        let mut converter = DistanceConverter::new(settings.baseline_m);
        if let Some(max) = settings.max_distance_m {
            converter = converter.with_max_distance(max);
        }
        Ok(Self {
            backend,
            policy,
            intrinsics,
            converter,
            aggregator: GridAggregator::new(settings.grid_size)?,
            trigger: DecisionTrigger::new(settings.decision_period)?,
            context: FrameContext::default(),
        })
    }

    pub fn context(&self) -> FrameContext {
        self.context
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.backend.warm_up()
    }

    pub fn process(&mut self, frame: &Frame) -> Result<ProcessedFrame> {
        let started = Instant::now();

        let raw = self.backend.infer(frame)?;
        let expected = (frame.height as usize, frame.width as usize);
        if raw.dim() != expected {
            return Err(anyhow!(
                "backend '{}' returned a {}x{} depth map for a {}x{} frame",
                self.backend.name(),
                raw.ncols(),
                raw.nrows(),
                frame.width,
                frame.height
            ));
        }

        let scaled = scale_to_u16(&raw);
        drop(raw);
        let (unit_depth, degenerate) = match invert_unit(&scaled) {
            Ok(unit) => (unit, false),
            Err(e) => {
                log::warn!("frame seq={}: {}; using zero depth", frame.sequence, e);
                (UnitDepthMap::zeros(scaled.dim()), true)
            }
        };

        let distance = self.converter.to_distance(&unit_depth, &self.intrinsics);
        let grid = self.aggregator.aggregate(&distance)?;

        let counter = self.context.advance();
        let decision = self
            .trigger
            .on_frame(counter, &grid.cells, self.policy.as_mut());

        let report = FrameReport {
            counter,
            sequence: frame.sequence,
            width: frame.width,
            height: frame.height,
            degenerate,
            grid,
            decision,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        log::debug!(
            "frame #{} seq={} processed in {:.1}ms",
            report.counter,
            report.sequence,
            report.elapsed_ms
        );

        Ok(ProcessedFrame {
            report,
            unit_depth,
            distance,
        })
    }
}
