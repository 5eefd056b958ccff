use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::overlay::FrameViews;

/// Named display views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Depth,
    Map,
    Distance,
    Image,
}

impl View {
    pub const ALL: [View; 4] = [View::Depth, View::Map, View::Distance, View::Image];

    pub fn name(self) -> &'static str {
        match self {
            View::Depth => "depth",
            View::Map => "map",
            View::Distance => "distance",
            View::Image => "image",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where composed views go.
pub trait DisplaySink {
    fn show(&mut self, counter: u64, views: &FrameViews) -> Result<()>;
}

/// Discards everything.
#[derive(Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn show(&mut self, _counter: u64, _views: &FrameViews) -> Result<()> {
        Ok(())
    }
}

/// Writes every view as PNG on every `every`th frame.
///
/// Files are named `<counter>_<view>.png` with the counter zero-padded to six
/// digits, plus `<counter>_labels.json` holding the distance labels.
pub struct SnapshotSink {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl SnapshotSink {
    pub fn new<P: AsRef<Path>>(dir: P, every: u64) -> Result<Self> {
        if every == 0 {
            return Err(anyhow!("snapshot interval must be > 0"));
        }
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create snapshot directory {}", dir.display()))?;
        Ok(Self {
            dir,
            every,
            written: 0,
        })
    }

    /// Frames written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn path(&self, counter: u64, suffix: &str) -> PathBuf {
        self.dir.join(format!("{:06}_{}", counter, suffix))
    }
}

impl DisplaySink for SnapshotSink {
    fn show(&mut self, counter: u64, views: &FrameViews) -> Result<()> {
        if counter % self.every != 0 {
            return Ok(());
        }

        for view in View::ALL {
            let path = self.path(counter, &format!("{}.png", view));
            let saved = match view {
                View::Depth => views.depth.save(&path),
                View::Map => views.map.save(&path),
                View::Distance => views.distance.save(&path),
                View::Image => views.image.save(&path),
            };
            saved.with_context(|| format!("write {} view to {}", view, path.display()))?;
        }

        let labels = serde_json::json!({
            "image": views.image_labels,
            "map": views.map_labels,
        });
        let path = self.path(counter, "labels.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&labels)?)
            .with_context(|| format!("write labels to {}", path.display()))?;

        self.written += 1;
        log::debug!("snapshot #{} written to {}", counter, self.dir.display());
        Ok(())
    }
}
