//! depth_rangerd - monocular distance sensing daemon
//!
//! This daemon:
//! 1. Loads configuration (file, environment, then command line)
//! 2. Loads the camera calibration; startup fails without it
//! 3. Builds the depth backend and the frame source
//! 4. Runs the capture loop until the stream ends or Ctrl-C

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use depth_ranger::config::RangerConfig;
use depth_ranger::render::{DisplaySink, NullSink, SnapshotSink};
use depth_ranger::ui::Ui;
use depth_ranger::{
    open_source, BackendRegistry, CameraIntrinsics, DistancePipeline, ExecutionDevice,
    ProximityPolicy, Runner, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monocular depth to distance daemon")]
struct Args {
    /// Frame source: stub://<name> or a V4L2 device path.
    #[arg(long)]
    source: Option<String>,

    /// Camera calibration file (3x3 matrix + distortion row).
    #[arg(long, value_name = "PATH")]
    calibration: Option<PathBuf>,

    /// Depth backend: stub or tract.
    #[arg(long)]
    backend: Option<String>,

    /// ONNX depth model (tract backend).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Execution device: auto or cpu.
    #[arg(long)]
    device: Option<ExecutionDevice>,

    /// Baseline scale in metres.
    #[arg(long)]
    baseline: Option<f32>,

    /// Clamp distances to this many metres.
    #[arg(long, value_name = "METRES")]
    max_distance: Option<f32>,

    /// Run the decision policy every N frames.
    #[arg(long)]
    decision_period: Option<u64>,

    /// Stop after N frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write view snapshots to this directory.
    #[arg(long, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,

    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::from_flag(&args.ui);

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = RangerConfig::load()?;
        apply_args(&mut cfg, &args);
        cfg.validate()?;
        cfg
    };

    let intrinsics = {
        let _stage = ui.stage("Load camera calibration");
        let path = cfg.calibration_path.as_ref().ok_or_else(|| {
            anyhow!("a calibration file is required (--calibration or DEPTH_RANGER_CALIBRATION)")
        })?;
        CameraIntrinsics::load(path)?
    };
    log::info!(
        "camera fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        intrinsics.fx(),
        intrinsics.fy(),
        intrinsics.cx(),
        intrinsics.cy()
    );

    let backend = {
        let _stage = ui.stage("Prepare depth backend");
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        register_tract(&mut registry, &cfg)?;
        registry.set_default(&cfg.backend.name)?;
        registry.take_default()?
    };

    let mut pipeline = DistancePipeline::new(
        backend,
        Box::new(ProximityPolicy::new(cfg.clearance_m)),
        intrinsics,
        cfg.pipeline_settings(),
    )?;
    {
        let _stage = ui.stage("Warm up backend");
        pipeline.warm_up()?;
    }
    log::info!(
        "pipeline ready: backend={} policy={} grid={}x{} decision every {} frames",
        pipeline.backend_name(),
        pipeline.policy_name(),
        cfg.grid_size,
        cfg.grid_size,
        cfg.decision_period
    );

    let source = {
        let _stage = ui.stage("Open frame source");
        open_source(cfg.source_config())?
    };

    let sink: Box<dyn DisplaySink> = match &cfg.snapshot {
        Some(snapshot) => {
            log::info!(
                "writing snapshots every {} frames to {}",
                snapshot.every,
                snapshot.dir.display()
            );
            Box::new(SnapshotSink::new(&snapshot.dir, snapshot.every)?)
        }
        None => Box::new(NullSink),
    };

    let mut runner = Runner::new(source, pipeline, sink).with_max_frames(args.max_frames);
    let shutdown = runner.shutdown_handle();
    ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    log::info!("depth_rangerd running (Ctrl-C to stop)");
    let summary = runner.run(|report| {
        if let Some(nearest) = report.grid.nearest_cell() {
            log::debug!(
                "frame #{}: nearest cell ({}, {}) at {:.2} m",
                report.counter,
                nearest.0,
                nearest.1,
                nearest.2
            );
        }
    })?;
    log::info!(
        "done: {} frames ({} degenerate, {} dropped), {} decisions ({} failed), stopped: {:?}",
        summary.frames_processed,
        summary.degenerate_frames,
        summary.frames_failed,
        summary.decisions,
        summary.decision_failures,
        summary.stop_reason
    );
    Ok(())
}

fn apply_args(cfg: &mut RangerConfig, args: &Args) {
    if let Some(source) = &args.source {
        cfg.source.uri = source.clone();
    }
    if let Some(path) = &args.calibration {
        cfg.calibration_path = Some(path.clone());
    }
    if let Some(name) = &args.backend {
        cfg.backend.name = name.clone();
    }
    if let Some(model) = &args.model {
        cfg.backend.model_path = Some(model.clone());
    }
    if let Some(device) = args.device {
        cfg.backend.device = device;
    }
    if let Some(baseline) = args.baseline {
        cfg.baseline_m = baseline;
    }
    if let Some(max) = args.max_distance {
        cfg.clamp.enabled = true;
        cfg.clamp.max_m = max;
    }
    if let Some(period) = args.decision_period {
        cfg.decision_period = period;
    }
    if let Some(dir) = &args.snapshot_dir {
        cfg.set_snapshot_dir(dir.clone());
    }
}

#[cfg(feature = "backend-tract")]
fn register_tract(registry: &mut BackendRegistry, cfg: &RangerConfig) -> Result<()> {
    use depth_ranger::infer::TractBackend;

    let Some(model) = &cfg.backend.model_path else {
        if cfg.backend.name == "tract" {
            return Err(anyhow!("tract backend needs a model (--model or DEPTH_RANGER_MODEL)"));
        }
        return Ok(());
    };
    let backend = TractBackend::new(model, cfg.backend.input_size, cfg.backend.device)
        .with_context(|| format!("load depth model {}", model.display()))?;
    log::info!("tract backend on {} ({}px input)", backend.device(), cfg.backend.input_size);
    registry.register(backend);
    Ok(())
}

#[cfg(not(feature = "backend-tract"))]
fn register_tract(_registry: &mut BackendRegistry, cfg: &RangerConfig) -> Result<()> {
    if cfg.backend.name == "tract" {
        return Err(anyhow!("backend 'tract' requires building with --features backend-tract"))
            .context("prepare depth backend");
    }
    Ok(())
}
