//! Depth Ranger
//!
//! Distance sensing from a single camera: a monocular depth model's output is
//! rescaled, converted to metres with the camera's focal length, and summarised
//! over a coarse grid of image regions.
//!
//! # Per-frame pipeline
//!
//! 1. **Inference**: a `DepthBackend` turns a `Frame` into a `RawDepthMap`.
//! 2. **Normalization**: the raw map is rescaled to 16 bits, then to `[0, 1]`
//!    and inverted so that larger values mean farther away.
//! 3. **Distance**: `distance = baseline * fx * depth`, zero depth clamped to
//!    `0.0001` first.
//! 4. **Aggregation**: the distance map is cut into a `grid_size x grid_size`
//!    grid (3x3 by default), yielding per-cell means and centre samples.
//! 5. **Decision**: every Nth frame the mean grid is handed to a
//!    `DecisionPolicy` and the outcome is logged.
//!
//! This is a demo/prototype. Distances are approximate and must not be used for
//! safety decisions.
//!
//! # Module Structure
//!
//! - `frame`: RGB frames handed from ingest to inference
//! - `ingest`: frame sources (synthetic, V4L2)
//! - `calibration`: camera intrinsics loader
//! - `infer`: depth backends and their registry
//! - `depth`: depth maps, normalization, distance conversion
//! - `grid`: spatial grid aggregation
//! - `decision`: decision policies and the periodic trigger
//! - `render`: colormaps, overlays, display sinks
//! - `pipeline`: per-frame orchestration
//! - `runner`: capture loop with shutdown handling

pub mod calibration;
pub mod config;
pub mod decision;
pub mod depth;
pub mod frame;
pub mod grid;
pub mod infer;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod runner;
pub mod ui;

pub use calibration::CameraIntrinsics;
pub use config::RangerConfig;
pub use decision::{Decision, DecisionPolicy, DecisionTrigger, ProximityPolicy};
pub use depth::{
    DegenerateFrame, DepthMap, DistanceConverter, DistanceMap, NormalizedDepthMap, RawDepthMap,
    UnitDepthMap,
};
pub use frame::Frame;
pub use grid::{GridAggregator, GridSummary, SamplePoint};
pub use infer::{BackendRegistry, DepthBackend, ExecutionDevice, StubBackend};
pub use ingest::{open_source, FrameSource, SourceConfig, SyntheticSource};
pub use pipeline::{DistancePipeline, FrameContext, FrameReport, PipelineSettings};
pub use runner::{Runner, RunSummary};

/// Stereo-style scale factor, in metres, applied with `fx` to unit depth.
pub const DEFAULT_BASELINE_M: f32 = 0.016;

/// Cells per grid side.
pub const DEFAULT_GRID_SIZE: usize = 3;

/// The decision policy runs on every Nth processed frame.
pub const DEFAULT_DECISION_PERIOD: u64 = 5;

/// Square model input edge, in pixels.
pub const DEFAULT_MODEL_INPUT: u32 = 256;

/// Full scale of the 16-bit normalization stage.
pub const NORMALIZED_MAX: u16 = u16::MAX;
