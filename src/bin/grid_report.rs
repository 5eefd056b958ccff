//! grid_report - run the pipeline on a synthetic scene and print one JSON
//! report per frame on stdout.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use depth_ranger::render::{DisplaySink, NullSink, SnapshotSink};
use depth_ranger::{
    CameraIntrinsics, DistancePipeline, PipelineSettings, ProximityPolicy, Runner, SourceConfig,
    StubBackend, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print per-frame grid reports for a synthetic scene")]
struct Args {
    /// Number of frames to process.
    #[arg(long, default_value_t = 10)]
    frames: u64,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Focal length in pixels when no calibration file is given.
    #[arg(long, default_value_t = 500.0)]
    fx: f64,

    /// Camera calibration file. Overrides --fx.
    #[arg(long, value_name = "PATH")]
    calibration: Option<PathBuf>,

    #[arg(long, default_value_t = depth_ranger::DEFAULT_GRID_SIZE)]
    grid_size: usize,

    #[arg(long, default_value_t = depth_ranger::DEFAULT_DECISION_PERIOD)]
    decision_period: u64,

    /// Also write view snapshots to this directory.
    #[arg(long, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let intrinsics = match &args.calibration {
        Some(path) => CameraIntrinsics::load(path)?,
        None => CameraIntrinsics::pinhole(
            args.fx,
            args.fx,
            args.width as f64 / 2.0,
            args.height as f64 / 2.0,
        ),
    };

    let pipeline = DistancePipeline::new(
        Box::new(StubBackend::new()),
        Box::new(ProximityPolicy::default()),
        intrinsics,
        PipelineSettings {
            grid_size: args.grid_size,
            decision_period: args.decision_period,
            ..PipelineSettings::default()
        },
    )?;
    let source = SyntheticSource::new(SourceConfig {
        uri: "stub://grid_report".to_string(),
        width: args.width,
        height: args.height,
        max_frames: Some(args.frames),
        ..SourceConfig::default()
    })?;
    let sink: Box<dyn DisplaySink> = match &args.snapshot_dir {
        Some(dir) => Box::new(SnapshotSink::new(dir, 1)?),
        None => Box::new(NullSink),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    let mut runner = Runner::new(Box::new(source), pipeline, sink);
    let summary = runner.run(|report| {
        if write_error.is_some() {
            return;
        }
        let line = serde_json::to_string(report).map_err(anyhow::Error::from);
        if let Err(e) = line.and_then(|line| writeln!(out, "{}", line).map_err(Into::into)) {
            write_error = Some(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e);
    }

    // stdout carries only frame reports
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
