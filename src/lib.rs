//! framegrab
//!
//! Frame acquisition from video sources, interval-gated recording to disk,
//! and dataset hygiene tools for the captured images.
//!
//! # Module Structure
//!
//! - `capture`: session lifecycle, frame stream, interval recorder
//! - `frame`: the in-memory frame container
//! - `dataset`: corrupted-image cleanup and visual deduplication
//! - `config`: file/env configuration for the capture binary
//!
//! The capture model is single-threaded and blocking: one session exclusively
//! owns one backend handle, reads block until the backend responds, and
//! long-running loops stop through a cooperative `CancelToken`.

pub mod capture;
pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod ui;

pub use capture::{
    save_frame, CancelToken, CaptureBackend, FrameEncoder, Frames, IntervalRecorder, JpegWriter,
    PersistenceResult, Session,
};
pub use config::{CaptureConfig, GrabConfig, RecorderSettings};
pub use dataset::{CleanupResult, Deduplicator, DhashScorer, ImageValidator, SimilarityScorer};
pub use error::CaptureError;
pub use frame::{ChannelOrder, Frame};
