//! Capture backend seam.
//!
//! `CaptureBackend` is the narrow interface between a `Session` and whatever
//! actually produces pixels. A backend is exclusively owned by one session and
//! is never shared; the trait is object-safe so sessions can hold any backend
//! behind a box and tests can inject fixtures.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::Frame;

use super::stub::StubBackend;
#[cfg(feature = "backend-v4l2")]
use super::v4l2::V4l2Backend;

/// One opened capture handle.
///
/// A backend is created already-open by `open_backend`; construction failure
/// means no handle exists. `grab` failures are read faults, never open faults.
pub trait CaptureBackend {
    /// Pull the next frame. Blocks until the backend responds.
    fn grab(&mut self) -> Result<Frame, CaptureError>;

    /// Backend-reported frame width, 0 when unavailable.
    fn width(&self) -> u32;

    /// Backend-reported frame height, 0 when unavailable.
    fn height(&self) -> u32;

    /// Backend-reported frame rate, 0.0 when unavailable.
    fn fps(&self) -> f64;

    /// Release the underlying handle. `Session::close` treats failures as
    /// best-effort and never propagates them.
    fn release(&mut self) -> Result<(), CaptureError>;
}

/// Resolve a source identifier to an opened backend.
///
/// Requested width/height/fps from the config are applied best-effort during
/// open; the backend may silently ignore unsupported values. On failure any
/// partially acquired handle has already been released.
pub(crate) fn open_backend(config: &CaptureConfig) -> Result<Box<dyn CaptureBackend>, CaptureError> {
    let source = config.source.trim();
    if source.is_empty() {
        return Err(CaptureError::open(source, "empty source identifier"));
    }
    if source.starts_with("stub://") {
        return Ok(Box::new(StubBackend::open(config)?));
    }
    if is_device_source(source) {
        #[cfg(feature = "backend-v4l2")]
        {
            return Ok(Box::new(V4l2Backend::open(config)?));
        }
        #[cfg(not(feature = "backend-v4l2"))]
        {
            return Err(CaptureError::open(
                source,
                "device capture requires the backend-v4l2 feature",
            ));
        }
    }
    Err(CaptureError::open(
        source,
        "unsupported source; expected stub:// or a local device",
    ))
}

/// A source names a local device when it is a device node path or a bare
/// numeric device index.
fn is_device_source(source: &str) -> bool {
    source.starts_with("/dev/") || source.parse::<u32>().is_ok()
}

/// Map a numeric device index to its V4L2 device node.
#[cfg(feature = "backend-v4l2")]
pub(crate) fn device_node(source: &str) -> String {
    match source.parse::<u32>() {
        Ok(index) => format!("/dev/video{index}"),
        Err(_) => source.to_string(),
    }
}
