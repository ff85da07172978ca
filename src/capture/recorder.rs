//! Interval-gated frame persistence.
//!
//! `IntervalRecorder` drives a session's frame stream and writes a gated
//! subset of frames to sequentially numbered JPEG files. Encoding is delegated
//! to a `FrameEncoder` collaborator so tests can inject failures and callers
//! can swap codecs.

use image::ImageEncoder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CaptureError;
use crate::frame::{ChannelOrder, Frame};

use super::session::Session;

/// Upper bound on one clock-gate wait. Keeps cancellation responsive without
/// changing observable save timing.
const GATE_POLL: Duration = Duration::from_millis(5);

/// Cooperative cancellation signal, checked between loop iterations.
///
/// Clones share the same flag, so one clone can live in a signal handler while
/// the recorder polls another.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Encodes an in-memory frame to a file path.
///
/// Collaborator seam: the recorder maps any failure here to
/// `CaptureError::Save` and does not retry.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame, path: &Path) -> anyhow::Result<()>;
}

/// JPEG encoder built on the `image` crate.
///
/// Encodes into memory first and writes the file in one step, so a failed
/// encode leaves no partial file behind.
pub struct JpegWriter {
    quality: u8,
}

impl JpegWriter {
    pub fn new() -> Self {
        Self { quality: 90 }
    }

    pub fn with_quality(quality: u8) -> Self {
        Self { quality }
    }
}

impl Default for JpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for JpegWriter {
    fn encode(&self, frame: &Frame, path: &Path) -> anyhow::Result<()> {
        let color = match frame.channels() {
            1 => image::ExtendedColorType::L8,
            3 => image::ExtendedColorType::Rgb8,
            other => anyhow::bail!("unsupported channel count: {other}"),
        };

        // The JPEG encoder expects RGB ordering; flip storage-ordered frames.
        let mut pixels;
        let data: &[u8] = if frame.channels() == 3 && frame.order() == ChannelOrder::Bgr {
            pixels = frame.data().to_vec();
            for pixel in pixels.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
            &pixels
        } else {
            frame.data()
        };

        let mut encoded = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, self.quality);
        encoder.write_image(data, frame.width(), frame.height(), color)?;
        std::fs::write(path, &encoded)?;
        Ok(())
    }
}

/// Save a single frame, creating parent directories as needed.
///
/// Returns the resolved path on success; encoder or filesystem failures map to
/// `CaptureError::Save` carrying the destination path.
pub fn save_frame(
    frame: &Frame,
    path: impl Into<PathBuf>,
    encoder: &dyn FrameEncoder,
) -> Result<PathBuf, CaptureError> {
    let path = path.into();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CaptureError::save(&path, e.to_string()))?;
        }
    }
    encoder
        .encode(frame, &path)
        .map_err(|e| CaptureError::save(&path, e.to_string()))?;
    Ok(path)
}

/// Outcome of one recording run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceResult {
    pub directory: PathBuf,
    pub saved_count: u64,
}

/// Persists a gated subset of a live stream to disk.
///
/// Frames are written as `<prefix>_<count:06>.jpg` under the target directory,
/// zero-indexed and gapless. A minimum inter-save interval of zero saves every
/// frame.
pub struct IntervalRecorder {
    directory: PathBuf,
    interval: Duration,
    prefix: String,
    encoder: Box<dyn FrameEncoder>,
    observer: Option<Box<dyn FnMut(&Frame) + Send>>,
}

impl IntervalRecorder {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            interval: Duration::ZERO,
            prefix: "frame".to_string(),
            encoder: Box::new(JpegWriter::new()),
            observer: None,
        }
    }

    /// Minimum elapsed time between two persisted frames.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_encoder(mut self, encoder: Box<dyn FrameEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Best-effort preview hook, invoked with every frame that gets saved.
    pub fn with_observer(mut self, observer: Box<dyn FnMut(&Frame) + Send>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Record until cancelled or the stream ends.
    ///
    /// Termination:
    /// - cancellation: clean return with the partial result
    /// - read error from the stream: treated as end-of-stream, clean return
    /// - open error or save error: propagates and aborts the run
    pub fn run(
        &mut self,
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<PersistenceResult, CaptureError> {
        std::fs::create_dir_all(&self.directory)
            .map_err(|e| CaptureError::save(&self.directory, e.to_string()))?;

        let mut last_save: Option<Instant> = None;
        let mut saved_count = 0u64;

        while !cancel.is_cancelled() {
            let now = Instant::now();
            if let Some(last) = last_save {
                let elapsed = now.duration_since(last);
                if elapsed < self.interval {
                    std::thread::sleep((self.interval - elapsed).min(GATE_POLL));
                    continue;
                }
            }

            let frame = match session.read() {
                Ok(frame) => frame,
                Err(CaptureError::Read { reason }) => {
                    log::info!("stream ended after {saved_count} frames: {reason}");
                    break;
                }
                Err(err) => return Err(err),
            };
            if let Some(observer) = &mut self.observer {
                observer(&frame);
            }

            let filename = format!("{}_{:06}.jpg", self.prefix, saved_count);
            save_frame(&frame, self.directory.join(filename), self.encoder.as_ref())?;
            last_save = Some(now);
            saved_count += 1;
        }

        Ok(PersistenceResult {
            directory: self.directory.clone(),
            saved_count,
        })
    }
}
