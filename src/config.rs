use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::decision::DEFAULT_CLEARANCE_M;
use crate::infer::ExecutionDevice;
use crate::ingest::SourceConfig;
use crate::pipeline::PipelineSettings;
use crate::{DEFAULT_BASELINE_M, DEFAULT_DECISION_PERIOD, DEFAULT_GRID_SIZE, DEFAULT_MODEL_INPUT};

const DEFAULT_SOURCE_URI: &str = "stub://camera";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MAX_DISTANCE_M: f32 = 10_000.0;
/// Snapshot interval, in frames, when only a directory is given.
pub const DEFAULT_SNAPSHOT_EVERY: u64 = 1;

/// Backend names the binaries know how to build.
pub const KNOWN_BACKENDS: &[&str] = &["stub", "tract"];

#[derive(Debug, Deserialize, Default)]
struct RangerConfigFile {
    source: Option<SourceConfigFile>,
    calibration_path: Option<PathBuf>,
    backend: Option<BackendConfigFile>,
    baseline_m: Option<f32>,
    grid_size: Option<usize>,
    decision_period: Option<u64>,
    clamp: Option<ClampConfigFile>,
    proximity: Option<ProximityConfigFile>,
    snapshot: Option<SnapshotConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    name: Option<String>,
    model_path: Option<PathBuf>,
    device: Option<String>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClampConfigFile {
    enabled: Option<bool>,
    max_m: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ProximityConfigFile {
    clearance_m: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    dir: Option<PathBuf>,
    every: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RangerConfig {
    pub source: SourceConfig,
    pub calibration_path: Option<PathBuf>,
    pub backend: BackendSettings,
    pub baseline_m: f32,
    pub grid_size: usize,
    pub decision_period: u64,
    pub clamp: ClampSettings,
    pub clearance_m: f32,
    pub snapshot: Option<SnapshotSettings>,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub name: String,
    pub model_path: Option<PathBuf>,
    pub device: ExecutionDevice,
    pub input_size: u32,
}

/// Optional upper bound on converted distances. Off unless enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampSettings {
    pub enabled: bool,
    pub max_m: f32,
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub dir: PathBuf,
    pub every: u64,
}

impl Default for RangerConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                uri: DEFAULT_SOURCE_URI.to_string(),
                target_fps: DEFAULT_SOURCE_FPS,
                width: DEFAULT_SOURCE_WIDTH,
                height: DEFAULT_SOURCE_HEIGHT,
                max_frames: None,
            },
            calibration_path: None,
            backend: BackendSettings {
                name: DEFAULT_BACKEND.to_string(),
                model_path: None,
                device: ExecutionDevice::default(),
                input_size: DEFAULT_MODEL_INPUT,
            },
            baseline_m: DEFAULT_BASELINE_M,
            grid_size: DEFAULT_GRID_SIZE,
            decision_period: DEFAULT_DECISION_PERIOD,
            clamp: ClampSettings {
                enabled: false,
                max_m: DEFAULT_MAX_DISTANCE_M,
            },
            clearance_m: DEFAULT_CLEARANCE_M,
            snapshot: None,
        }
    }
}

impl RangerConfig {
    /// Load from `DEPTH_RANGER_CONFIG` (if set), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DEPTH_RANGER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Settings for `DistancePipeline::new`.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            baseline_m: self.baseline_m,
            max_distance_m: self.clamp.enabled.then_some(self.clamp.max_m),
            grid_size: self.grid_size,
            decision_period: self.decision_period,
        }
    }

    pub fn source_config(&self) -> SourceConfig {
        self.source.clone()
    }

    /// Enable snapshots into `dir`, keeping a configured interval.
    pub fn set_snapshot_dir(&mut self, dir: PathBuf) {
        let every = self
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.every)
            .unwrap_or(DEFAULT_SNAPSHOT_EVERY);
        self.snapshot = Some(SnapshotSettings { dir, every });
    }

    fn from_file(file: RangerConfigFile) -> Result<Self> {
        let source = file.source.unwrap_or_default();
        let source = SourceConfig {
            uri: source.uri.unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
            target_fps: source.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
            max_frames: source.max_frames,
        };
        let backend = file.backend.unwrap_or_default();
        let backend = BackendSettings {
            name: backend
                .name
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: backend.model_path,
            device: match backend.device.as_deref() {
                Some(device) => device.parse()?,
                None => ExecutionDevice::default(),
            },
            input_size: backend.input_size.unwrap_or(DEFAULT_MODEL_INPUT),
        };
        let clamp = ClampSettings {
            enabled: file
                .clamp
                .as_ref()
                .and_then(|clamp| clamp.enabled)
                .unwrap_or(false),
            max_m: file
                .clamp
                .and_then(|clamp| clamp.max_m)
                .unwrap_or(DEFAULT_MAX_DISTANCE_M),
        };
        let snapshot = file.snapshot.and_then(|snapshot| {
            snapshot.dir.map(|dir| SnapshotSettings {
                dir,
                every: snapshot.every.unwrap_or(DEFAULT_SNAPSHOT_EVERY),
            })
        });
        Ok(Self {
            source,
            calibration_path: file.calibration_path,
            backend,
            baseline_m: file.baseline_m.unwrap_or(DEFAULT_BASELINE_M),
            grid_size: file.grid_size.unwrap_or(DEFAULT_GRID_SIZE),
            decision_period: file.decision_period.unwrap_or(DEFAULT_DECISION_PERIOD),
            clamp,
            clearance_m: file
                .proximity
                .and_then(|proximity| proximity.clearance_m)
                .unwrap_or(DEFAULT_CLEARANCE_M),
            snapshot,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("DEPTH_RANGER_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(path) = std::env::var("DEPTH_RANGER_CALIBRATION") {
            if !path.trim().is_empty() {
                self.calibration_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("DEPTH_RANGER_MODEL") {
            if !path.trim().is_empty() {
                self.backend.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(name) = std::env::var("DEPTH_RANGER_BACKEND") {
            if !name.trim().is_empty() {
                self.backend.name = name.trim().to_string();
            }
        }
        if let Ok(baseline) = std::env::var("DEPTH_RANGER_BASELINE") {
            self.baseline_m = baseline
                .trim()
                .parse()
                .map_err(|_| anyhow!("DEPTH_RANGER_BASELINE must be a number of metres"))?;
        }
        if let Ok(period) = std::env::var("DEPTH_RANGER_DECISION_PERIOD") {
            self.decision_period = period
                .trim()
                .parse()
                .map_err(|_| anyhow!("DEPTH_RANGER_DECISION_PERIOD must be an integer frame count"))?;
        }
        if let Ok(dir) = std::env::var("DEPTH_RANGER_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                self.set_snapshot_dir(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// Check every knob. Also run by the binaries after CLI overrides.
    pub fn validate(&mut self) -> Result<()> {
        if !(self.baseline_m.is_finite() && self.baseline_m > 0.0) {
            return Err(anyhow!("baseline must be a positive number of metres"));
        }
        if self.grid_size == 0 {
            return Err(anyhow!("grid size must be greater than zero"));
        }
        if self.decision_period == 0 {
            return Err(anyhow!("decision period must be greater than zero"));
        }
        if self.backend.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if self.clamp.enabled && !(self.clamp.max_m.is_finite() && self.clamp.max_m > 0.0) {
            return Err(anyhow!("clamp maximum must be positive when the clamp is enabled"));
        }
        if !self.clearance_m.is_finite() || self.clearance_m < 0.0 {
            return Err(anyhow!("proximity clearance must be a non-negative number of metres"));
        }
        self.backend.name = self.backend.name.to_ascii_lowercase();
        if !KNOWN_BACKENDS.contains(&self.backend.name.as_str()) {
            return Err(anyhow!(
                "unknown backend '{}' (expected one of: {})",
                self.backend.name,
                KNOWN_BACKENDS.join(", ")
            ));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source frame rate must be greater than zero"));
        }
        if let Some(snapshot) = &self.snapshot {
            if snapshot.every == 0 {
                return Err(anyhow!("snapshot interval must be greater than zero"));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<RangerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let mut cfg = RangerConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.source.uri, DEFAULT_SOURCE_URI);
        assert_eq!(cfg.backend.name, "stub");
        assert_eq!(cfg.pipeline_settings(), PipelineSettings::default());
        assert!(cfg.snapshot.is_none());
        Ok(())
    }

    #[test]
    fn snapshot_dir_keeps_configured_interval() {
        let mut cfg = RangerConfig::default();
        cfg.set_snapshot_dir(PathBuf::from("/tmp/a"));
        let snapshot = cfg.snapshot.clone().unwrap();
        assert_eq!(snapshot.every, DEFAULT_SNAPSHOT_EVERY);

        cfg.snapshot = Some(SnapshotSettings {
            dir: PathBuf::from("/tmp/a"),
            every: 7,
        });
        cfg.set_snapshot_dir(PathBuf::from("/tmp/b"));
        let snapshot = cfg.snapshot.unwrap();
        assert_eq!(snapshot.dir, PathBuf::from("/tmp/b"));
        assert_eq!(snapshot.every, 7);
    }

    #[test]
    fn clamp_only_applies_when_enabled() {
        let mut cfg = RangerConfig::default();
        assert_eq!(cfg.pipeline_settings().max_distance_m, None);
        cfg.clamp.enabled = true;
        assert_eq!(cfg.pipeline_settings().max_distance_m, Some(DEFAULT_MAX_DISTANCE_M));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases: [fn(&mut RangerConfig); 8] = [
            |c| c.baseline_m = 0.0,
            |c| c.baseline_m = f32::NAN,
            |c| c.grid_size = 0,
            |c| c.decision_period = 0,
            |c| c.backend.input_size = 0,
            |c| {
                c.clamp.enabled = true;
                c.clamp.max_m = -1.0;
            },
            |c| c.backend.name = "cuda-magic".to_string(),
            |c| c.source.width = 0,
        ];
        for mutate in cases {
            let mut cfg = RangerConfig::default();
            mutate(&mut cfg);
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn empty_file_matches_defaults() -> Result<()> {
        let cfg = RangerConfig::from_file(RangerConfigFile::default())?;
        let defaults = RangerConfig::default();
        assert_eq!(cfg.source, defaults.source);
        assert_eq!(cfg.pipeline_settings(), defaults.pipeline_settings());
        assert_eq!(cfg.backend.device, defaults.backend.device);
        Ok(())
    }

    #[test]
    fn unknown_device_fails_to_resolve() {
        let file = RangerConfigFile {
            backend: Some(BackendConfigFile {
                device: Some("tpu".to_string()),
                ..BackendConfigFile::default()
            }),
            ..RangerConfigFile::default()
        };
        assert!(RangerConfig::from_file(file).is_err());
    }
}
