//! Frame acquisition and streaming capture.
//!
//! This module owns the capture lifecycle:
//! - `Session`: open/closed state machine around a single capture backend
//! - `Frames`: lazy pull-based frame sequence over an open session
//! - `IntervalRecorder`: interval-gated persistence of a live stream to disk
//!
//! Backends sit behind the `CaptureBackend` trait. The `stub://` synthetic
//! backend is always available; real V4L2 devices are feature-gated behind
//! `backend-v4l2`.
//!
//! Everything here is single-threaded and blocking: each open, read and save
//! blocks the calling thread until the backend responds. Cancellation is
//! cooperative via `CancelToken`, checked between loop iterations.

pub mod backend;
pub mod recorder;
pub mod session;
mod stub;
#[cfg(feature = "backend-v4l2")]
mod v4l2;

pub use backend::CaptureBackend;
pub use recorder::{
    save_frame, CancelToken, FrameEncoder, IntervalRecorder, JpegWriter, PersistenceResult,
};
pub use session::{Frames, Session};
