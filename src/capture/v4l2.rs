//! V4L2 device backend (feature `backend-v4l2`).
//!
//! Opens a local device node (or a bare numeric index, mapped to
//! `/dev/videoN`), negotiates an RGB3 format, and captures through a
//! memory-mapped buffer stream. Requested width, height and fps are applied
//! best-effort: a rejected request falls back to whatever the device reports,
//! with a warning, and is not an error.

use ouroboros::self_referencing;

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::{ChannelOrder, Frame};

use super::backend::{device_node, CaptureBackend};

pub(crate) struct V4l2Backend {
    node: String,
    state: Option<V4l2State>,
    active_width: u32,
    active_height: u32,
    active_fps: f64,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Backend {
    pub(crate) fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let node = device_node(&config.source);
        let open_err =
            |reason: String| CaptureError::open(&config.source, reason);

        let mut device =
            v4l::Device::with_path(&node).map_err(|e| open_err(format!("open {node}: {e}")))?;

        let mut format = device
            .format()
            .map_err(|e| open_err(format!("read device format: {e}")))?;
        if let Some(width) = config.width {
            format.width = width;
        }
        if let Some(height) = config.height {
            format.height = height;
        }
        format.fourcc = v4l::FourCC::new(b"RGB3");

        // Best-effort: a device that rejects the requested format keeps its
        // current one.
        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2Backend: failed to set format on {node}: {err}");
                device
                    .format()
                    .map_err(|e| open_err(format!("read device format: {e}")))?
            }
        };
        if format.fourcc != v4l::FourCC::new(b"RGB3") {
            return Err(open_err(format!(
                "device does not support RGB3 capture (got {})",
                format.fourcc
            )));
        }

        if let Some(fps) = config.fps {
            let params = v4l::video::capture::Parameters::with_fps(fps.round() as u32);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Backend: failed to set fps on {node}: {err}");
            }
        }
        let active_fps = match device.params() {
            Ok(params) if params.interval.numerator > 0 => {
                f64::from(params.interval.denominator) / f64::from(params.interval.numerator)
            }
            _ => 0.0,
        };

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| open_err(format!("create buffer stream: {e}")))?;

        log::info!(
            "V4l2Backend: opened {node} ({}x{} @ {active_fps} fps)",
            format.width,
            format.height
        );
        Ok(Self {
            node,
            state: Some(state),
            active_width: format.width,
            active_height: format.height,
            active_fps,
        })
    }
}

impl CaptureBackend for V4l2Backend {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CaptureError::read("device already released"))?;
        let expected = self.active_width as usize * self.active_height as usize * 3;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|e| CaptureError::read(format!("capture from {}: {e}", self.node)))?;
        if buf.len() < expected {
            return Err(CaptureError::read(format!(
                "short frame from {}: {} of {expected} bytes",
                self.node,
                buf.len()
            )));
        }
        Ok(Frame::new(
            buf[..expected].to_vec(),
            self.active_width,
            self.active_height,
            3,
            ChannelOrder::Rgb,
        ))
    }

    fn width(&self) -> u32 {
        self.active_width
    }

    fn height(&self) -> u32 {
        self.active_height
    }

    fn fps(&self) -> f64 {
        self.active_fps
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        // Dropping the state closes the stream and the device node.
        self.state = None;
        log::debug!("V4l2Backend: released {}", self.node);
        Ok(())
    }
}
