use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_SOURCE: &str = "stub://camera";
const DEFAULT_OUTPUT_DIR: &str = "frames";
const DEFAULT_PREFIX: &str = "frame";
const DEFAULT_INTERVAL_SECS: f64 = 0.0;

#[derive(Debug, Deserialize, Default)]
struct GrabConfigFile {
    capture: Option<CaptureConfigFile>,
    recorder: Option<RecorderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<f64>,
    convert_to_rgb: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RecorderConfigFile {
    output_dir: Option<PathBuf>,
    interval_secs: Option<f64>,
    prefix: Option<String>,
}

/// Requested capture parameters for one session.
///
/// Immutable once a `Session` is opened; changing a config after open has no
/// effect until a new session is created from it. `width`, `height` and `fps`
/// are requests, not guarantees: backends apply them best-effort and may
/// silently ignore unsupported values.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Backend-defined source identifier: a device node, a numeric device
    /// index, or a `stub://` URL. Passed through opaquely.
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    /// Convert frames from the backend's BGR ordering to RGB on read.
    pub convert_to_rgb: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            width: None,
            height: None,
            fps: None,
            convert_to_rgb: false,
        }
    }
}

impl CaptureConfig {
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }
}

/// Settings for the interval recorder.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub output_dir: PathBuf,
    /// Minimum seconds between two persisted frames. 0 saves every frame.
    pub interval_secs: f64,
    pub prefix: String,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            interval_secs: DEFAULT_INTERVAL_SECS,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Full configuration for the capture binary.
#[derive(Debug, Clone, Default)]
pub struct GrabConfig {
    pub capture: CaptureConfig,
    pub recorder: RecorderSettings,
}

impl GrabConfig {
    /// Load configuration from the JSON file named by `FRAMEGRAB_CONFIG` (if
    /// set), then apply environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FRAMEGRAB_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => GrabConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GrabConfigFile) -> Self {
        let capture_file = file.capture.unwrap_or_default();
        let recorder_file = file.recorder.unwrap_or_default();
        let capture = CaptureConfig {
            source: capture_file
                .source
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            width: capture_file.width,
            height: capture_file.height,
            fps: capture_file.fps,
            convert_to_rgb: capture_file.convert_to_rgb.unwrap_or(false),
        };
        let recorder = RecorderSettings {
            output_dir: recorder_file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            interval_secs: recorder_file.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS),
            prefix: recorder_file
                .prefix
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        };
        Self { capture, recorder }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("FRAMEGRAB_SOURCE") {
            if !source.trim().is_empty() {
                self.capture.source = source;
            }
        }
        if let Ok(dir) = std::env::var("FRAMEGRAB_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.recorder.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(prefix) = std::env::var("FRAMEGRAB_PREFIX") {
            if !prefix.trim().is_empty() {
                self.recorder.prefix = prefix;
            }
        }
        if let Ok(interval) = std::env::var("FRAMEGRAB_INTERVAL_SECS") {
            let secs: f64 = interval
                .parse()
                .map_err(|_| anyhow!("FRAMEGRAB_INTERVAL_SECS must be a number of seconds"))?;
            self.recorder.interval_secs = secs;
        }
        Ok(())
    }

    /// Reject configurations the capture pipeline cannot run with. Called by
    /// `load`, and again by callers that mutate a loaded config afterwards.
    pub fn validate(&self) -> Result<()> {
        if self.capture.source.trim().is_empty() {
            return Err(anyhow!("capture source must not be empty"));
        }
        if matches!(self.capture.width, Some(0)) || matches!(self.capture.height, Some(0)) {
            return Err(anyhow!("requested frame dimensions must be positive"));
        }
        if let Some(fps) = self.capture.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(anyhow!("requested fps must be positive"));
            }
        }
        if !self.recorder.interval_secs.is_finite() || self.recorder.interval_secs < 0.0 {
            return Err(anyhow!("recorder interval must be zero or positive"));
        }
        if self.recorder.prefix.trim().is_empty() {
            return Err(anyhow!("filename prefix must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GrabConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
