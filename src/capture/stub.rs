//! Synthetic stub backend.
//!
//! Sources of the form `stub://<name>?key=value&...` produce deterministic
//! synthetic frames without touching any hardware. Query knobs:
//!
//! - `frames=N`: produce exactly N frames, then report exhaustion
//! - `fail_after=N`: produce N frames, then report a backend read fault
//! - `fail_open=1`: fail at open time
//! - `fail_release=1`: report a fault from `release` (the handle still ends
//!   up released)
//! - `width=N` / `height=N`: fixed native dimensions; requested values from
//!   the config are ignored (models a device that rejects the request)
//! - `fps=F`: reported frame rate (unset means unavailable, reported as 0)

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::{ChannelOrder, Frame};

use super::backend::CaptureBackend;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

pub(crate) struct StubBackend {
    source: String,
    width: u32,
    height: u32,
    fps: f64,
    /// Frames remaining before exhaustion, None for an unbounded stream.
    remaining: Option<u64>,
    /// Successful grabs remaining before an injected read fault.
    fail_after: Option<u64>,
    frame_count: u64,
    scene_state: u8,
    fail_release: bool,
    released: bool,
}

impl StubBackend {
    pub(crate) fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let knobs = StubKnobs::parse(&config.source)?;
        if knobs.fail_open {
            return Err(CaptureError::open(
                &config.source,
                "stub configured to fail open",
            ));
        }

        // Native query dimensions win over requested ones, like a device
        // ignoring an unsupported format request.
        let width = knobs
            .width
            .or(config.width)
            .unwrap_or(DEFAULT_WIDTH);
        let height = knobs
            .height
            .or(config.height)
            .unwrap_or(DEFAULT_HEIGHT);
        let fps = knobs.fps.or(config.fps).unwrap_or(0.0);

        log::info!("StubBackend: opened {} ({}x{})", config.source, width, height);
        Ok(Self {
            source: config.source.clone(),
            width,
            height,
            fps,
            remaining: knobs.frames,
            fail_after: knobs.fail_after,
            frame_count: 0,
            scene_state: 0,
            fail_release: knobs.fail_release,
            released: false,
        })
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width * self.height * 3) as usize;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl CaptureBackend for StubBackend {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::read("stub backend already released"));
        }
        if let Some(0) = self.remaining {
            return Err(CaptureError::read("source exhausted"));
        }
        if let Some(0) = self.fail_after {
            return Err(CaptureError::read("injected backend read fault"));
        }
        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }
        if let Some(fail_after) = &mut self.fail_after {
            *fail_after -= 1;
        }

        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Ok(Frame::new(
            pixels,
            self.width,
            self.height,
            3,
            ChannelOrder::Bgr,
        ))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.released = true;
        log::debug!("StubBackend: released {}", self.source);
        if self.fail_release {
            return Err(CaptureError::read("injected backend release fault"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StubKnobs {
    frames: Option<u64>,
    fail_after: Option<u64>,
    fail_open: bool,
    fail_release: bool,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<f64>,
}

impl StubKnobs {
    fn parse(source: &str) -> Result<Self, CaptureError> {
        let mut knobs = Self::default();
        let Some((_, query)) = source.split_once('?') else {
            return Ok(knobs);
        };
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let bad = |what: &str| {
                CaptureError::open(source, format!("invalid stub knob {key}: expected {what}"))
            };
            match key {
                "frames" => knobs.frames = Some(value.parse().map_err(|_| bad("a count"))?),
                "fail_after" => {
                    knobs.fail_after = Some(value.parse().map_err(|_| bad("a count"))?)
                }
                "fail_open" => knobs.fail_open = value == "1" || value == "true",
                "fail_release" => knobs.fail_release = value == "1" || value == "true",
                "width" => knobs.width = Some(value.parse().map_err(|_| bad("a dimension"))?),
                "height" => knobs.height = Some(value.parse().map_err(|_| bad("a dimension"))?),
                "fps" => knobs.fps = Some(value.parse().map_err(|_| bad("a frame rate"))?),
                // Unknown knobs pass through opaquely.
                _ => {}
            }
        }
        Ok(knobs)
    }
}
