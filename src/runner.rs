//! Capture loop.
//!
//! acquire -> process -> compose views -> display -> check shutdown, one
//! frame at a time on the calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::decision::DecisionOutcome;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::pipeline::{DistancePipeline, FrameReport};
use crate::render::{compose_views, DisplaySink};

/// Why the loop stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    CaptureFailed(String),
    FrameLimit,
    Shutdown,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub frames_processed: u64,
    /// Frames dropped because processing them failed.
    pub frames_failed: u64,
    pub degenerate_frames: u64,
    pub decisions: u64,
    pub decision_failures: u64,
    pub stop_reason: StopReason,
}

pub struct Runner {
    source: Box<dyn FrameSource>,
    pipeline: DistancePipeline,
    sink: Box<dyn DisplaySink>,
    shutdown: Arc<AtomicBool>,
    max_frames: Option<u64>,
}

impl Runner {
    pub fn new(
        source: Box<dyn FrameSource>,
        pipeline: DistancePipeline,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            source,
            pipeline,
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
            max_frames: None,
        }
    }

    /// Stop after this many processed frames.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Flag that stops the loop at the next frame boundary when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn pipeline(&self) -> &DistancePipeline {
        &self.pipeline
    }

    /// Run until the stream ends, the frame limit is hit or shutdown is
    /// requested. `on_report` sees every frame's report in order.
    ///
    /// A frame that fails to process is logged and skipped; it does not
    /// advance the frame counter. Display errors end the run.
    pub fn run<F: FnMut(&FrameReport)>(&mut self, mut on_report: F) -> Result<RunSummary> {
        self.source.connect()?;

        let mut summary = RunSummary {
            frames_processed: 0,
            frames_failed: 0,
            degenerate_frames: 0,
            decisions: 0,
            decision_failures: 0,
            stop_reason: StopReason::EndOfStream,
        };

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
            if self
                .max_frames
                .is_some_and(|limit| summary.frames_processed >= limit)
            {
                summary.stop_reason = StopReason::FrameLimit;
                break;
            }

            let frame = match self.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    summary.stop_reason = StopReason::EndOfStream;
                    break;
                }
                Err(e) => {
                    log::warn!("frame capture failed, treating as end of stream: {:#}", e);
                    summary.stop_reason = StopReason::CaptureFailed(format!("{:#}", e));
                    break;
                }
            };

            let processed = match self.pipeline.process(&frame) {
                Ok(processed) => processed,
                Err(e) => {
                    log::warn!("frame seq={} dropped: {:#}", frame.sequence, e);
                    summary.frames_failed += 1;
                    continue;
                }
            };
            let report = &processed.report;

            let views = compose_views(&frame, &processed.unit_depth, &processed.distance, &report.grid)?;
            self.sink.show(report.counter, &views)?;

            summary.frames_processed += 1;
            if report.degenerate {
                summary.degenerate_frames += 1;
            }
            match &report.decision {
                Some(DecisionOutcome::Decided { .. }) => summary.decisions += 1,
                Some(DecisionOutcome::Failed { .. }) => {
                    summary.decisions += 1;
                    summary.decision_failures += 1;
                }
                None => {}
            }
            on_report(report);
        }

        let stats = self.source.stats();
        log::info!(
            "runner stopped ({:?}): {} frames processed, {} dropped, {} captured from {}",
            summary.stop_reason,
            summary.frames_processed,
            summary.frames_failed,
            stats.frames_captured,
            stats.uri
        );
        Ok(summary)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.source.is_healthy() {
            log::warn!("frame source {} reports unhealthy", self.source.stats().uri);
        }
        self.source.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CameraIntrinsics;
    use crate::decision::ProximityPolicy;
    use crate::depth::RawDepthMap;
    use crate::infer::{DepthBackend, StubBackend};
    use crate::ingest::{SourceConfig, SourceStats, SyntheticSource};
    use crate::pipeline::PipelineSettings;
    use crate::render::NullSink;
    use anyhow::anyhow;

    fn pipeline() -> DistancePipeline {
        DistancePipeline::new(
            Box::new(StubBackend::new()),
            Box::new(ProximityPolicy::default()),
            CameraIntrinsics::pinhole(500.0, 500.0, 16.0, 12.0),
            PipelineSettings::default(),
        )
        .unwrap()
    }

    fn synthetic(max_frames: Option<u64>) -> Box<dyn FrameSource> {
        Box::new(
            SyntheticSource::new(SourceConfig {
                uri: "stub://runner".to_string(),
                width: 32,
                height: 24,
                max_frames,
                ..SourceConfig::default()
            })
            .unwrap(),
        )
    }

    struct Broken {
        delivered: u64,
    }

    impl FrameSource for Broken {
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.delivered == 2 {
                return Err(anyhow!("cable unplugged"));
            }
            self.delivered += 1;
            Frame::new(vec![90u8; 12 * 12 * 3], 12, 12, self.delivered).map(Some)
        }

        fn is_healthy(&self) -> bool {
            true
        }

        fn stats(&self) -> SourceStats {
            SourceStats {
                frames_captured: self.delivered,
                uri: "broken".to_string(),
            }
        }
    }

    /// Fails on every second call, like a model that chokes on some inputs.
    struct Flaky {
        calls: u64,
    }

    impl DepthBackend for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn infer(&mut self, frame: &Frame) -> Result<RawDepthMap> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(anyhow!("inference failed"));
            }
            Ok(RawDepthMap::from_shape_fn(
                (frame.height as usize, frame.width as usize),
                |(r, c)| (r + c) as f32,
            ))
        }
    }

    #[test]
    fn failed_frames_are_skipped_and_the_run_continues() -> Result<()> {
        let pipeline = DistancePipeline::new(
            Box::new(Flaky { calls: 0 }),
            Box::new(ProximityPolicy::default()),
            CameraIntrinsics::pinhole(500.0, 500.0, 16.0, 12.0),
            PipelineSettings::default(),
        )?;
        let mut runner = Runner::new(synthetic(Some(6)), pipeline, Box::new(NullSink));
        let mut counters = Vec::new();
        let summary = runner.run(|r| counters.push(r.counter))?;

        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.frames_failed, 3);
        assert_eq!(counters, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn frame_too_small_for_the_grid_is_dropped() -> Result<()> {
        let mut runner = Runner::new(
            Box::new(SyntheticSource::new(SourceConfig {
                uri: "stub://tiny".to_string(),
                width: 2,
                height: 2,
                max_frames: Some(2),
                ..SourceConfig::default()
            })?),
            pipeline(),
            Box::new(NullSink),
        );
        let summary = runner.run(|_| {})?;
        assert_eq!(summary.frames_processed, 0);
        assert_eq!(summary.frames_failed, 2);
        assert_eq!(runner.pipeline().context().frame_counter(), 0);
        Ok(())
    }

    #[test]
    fn runs_to_end_of_stream_in_order() -> Result<()> {
        let mut runner = Runner::new(synthetic(Some(12)), pipeline(), Box::new(NullSink));
        let mut counters = Vec::new();
        let summary = runner.run(|r| counters.push(r.counter))?;

        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(summary.frames_processed, 12);
        assert_eq!(counters, (1..=12).collect::<Vec<_>>());
        assert_eq!(summary.decisions, 2);
        Ok(())
    }

    #[test]
    fn capture_error_ends_the_stream_gracefully() -> Result<()> {
        let mut runner = Runner::new(Box::new(Broken { delivered: 0 }), pipeline(), Box::new(NullSink));
        let summary = runner.run(|_| {})?;
        assert_eq!(summary.frames_processed, 2);
        assert!(matches!(summary.stop_reason, StopReason::CaptureFailed(ref e) if e.contains("cable")));
        Ok(())
    }

    #[test]
    fn frame_limit_and_shutdown_stop_the_loop() -> Result<()> {
        let mut runner =
            Runner::new(synthetic(None), pipeline(), Box::new(NullSink)).with_max_frames(Some(3));
        let summary = runner.run(|_| {})?;
        assert_eq!(summary.stop_reason, StopReason::FrameLimit);
        assert_eq!(summary.frames_processed, 3);

        let mut runner = Runner::new(synthetic(None), pipeline(), Box::new(NullSink));
        let handle = runner.shutdown_handle();
        let summary = runner.run(|r| {
            if r.counter == 4 {
                handle.store(true, Ordering::SeqCst);
            }
        })?;
        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert_eq!(summary.frames_processed, 4);
        Ok(())
    }
}
