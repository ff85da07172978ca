//! Capture session lifecycle.
//!
//! A `Session` owns at most one capture backend and tracks its state as an
//! explicit enum, so "open with no handle" is unrepresentable. Reads and
//! property queries on a closed session transparently open it first.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::frame::{ChannelOrder, Frame};

use super::backend::{open_backend, CaptureBackend};

enum SessionState {
    Closed,
    Open(Box<dyn CaptureBackend>),
}

/// The live connection to a video source.
///
/// Exclusively owns its backend; not meant to be shared across concurrent
/// callers. Dropping a session closes it, so bounded uses release the device
/// on every exit path.
pub struct Session {
    config: CaptureConfig,
    state: SessionState,
}

impl Session {
    /// Create a closed session. No backend is acquired until `open` (or the
    /// first read / property query).
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: SessionState::Closed,
        }
    }

    /// Create a closed session for a source with default parameters.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self::new(CaptureConfig::for_source(source))
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Connect to the video source. No-op when already open.
    ///
    /// Requested width/height/fps are applied to the backend best-effort
    /// during open; unsupported values are ignored by the backend. On failure
    /// the session stays closed and no handle is retained.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        if self.is_open() {
            return Ok(());
        }
        let backend = open_backend(&self.config)?;
        self.state = SessionState::Open(backend);
        Ok(())
    }

    /// Disconnect from the video source.
    ///
    /// Release failures are swallowed by design: close never raises, is safe
    /// to call repeatedly, and is safe on a never-opened session.
    pub fn close(&mut self) {
        if let SessionState::Open(mut backend) =
            std::mem::replace(&mut self.state, SessionState::Closed)
        {
            if let Err(err) = backend.release() {
                log::debug!("ignoring backend release failure: {err}");
            }
        }
    }

    /// Read one frame from the stream, opening the session first if needed.
    ///
    /// An open failure surfaces as `CaptureError::Open`, not as a read error.
    /// When `convert_to_rgb` is set the frame is flipped to RGB ordering
    /// before it is returned. Ownership of the frame moves to the caller.
    pub fn read(&mut self) -> Result<Frame, CaptureError> {
        self.open()?;
        let SessionState::Open(backend) = &mut self.state else {
            unreachable!("open() succeeded");
        };
        let mut frame = backend.grab()?;
        if self.config.convert_to_rgb {
            frame.convert_to(ChannelOrder::Rgb);
        }
        Ok(frame)
    }

    /// Backend-reported (width, height, fps), opening the session if needed.
    ///
    /// Unavailable or non-positive values are reported as 0 / 0.0.
    pub fn actual_properties(&mut self) -> Result<(u32, u32, f64), CaptureError> {
        self.open()?;
        let SessionState::Open(backend) = &self.state else {
            unreachable!("open() succeeded");
        };
        let fps = backend.fps();
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 0.0 };
        Ok((backend.width(), backend.height(), fps))
    }

    /// Lazy sequence of frames from this session.
    ///
    /// The sequence is conceptually infinite; it only stops on a read error,
    /// after which the iterator is fused. Termination is otherwise the
    /// caller's decision.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            session: self,
            done: false,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pull-based frame iterator over a session. Fused after the first error.
pub struct Frames<'a> {
    session: &'a mut Session,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.read() {
            Ok(frame) => Some(Ok(frame)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_idempotent() {
        // One frame only: a second open would re-acquire a fresh backend and
        // make the second read succeed again.
        let mut session = Session::from_source("stub://cam?frames=1");
        session.open().expect("open");
        assert!(session.is_open());
        session.open().expect("reopen");
        assert!(session.is_open());

        assert!(session.read().is_ok());
        assert!(matches!(session.read(), Err(CaptureError::Read { .. })));
    }

    #[test]
    fn close_is_idempotent_and_safe_on_never_opened() {
        let mut session = Session::from_source("stub://cam");
        session.close();
        session.close();
        assert!(!session.is_open());

        session.open().expect("open");
        session.close();
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn close_swallows_backend_release_failure() {
        let mut session = Session::from_source("stub://cam?fail_release=1");
        session.open().expect("open");
        session.close();
        assert!(!session.is_open());
        // Still usable afterwards: reopen acquires a fresh backend.
        assert!(session.read().is_ok());
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn read_on_closed_session_opens_first() {
        let mut session = Session::from_source("stub://cam");
        assert!(!session.is_open());
        assert!(session.read().is_ok());
        assert!(session.is_open());
    }

    #[test]
    fn read_on_unopenable_source_fails_with_open_error() {
        let mut session = Session::from_source("stub://cam?fail_open=1");
        match session.read() {
            Err(CaptureError::Open { source_id, .. }) => {
                assert!(source_id.contains("fail_open"));
            }
            other => panic!("expected open error, got {other:?}"),
        }
        assert!(!session.is_open());
    }

    #[test]
    fn read_after_close_reopens_transparently() {
        let mut session = Session::from_source("stub://cam");
        assert!(session.read().is_ok());
        session.close();
        assert!(session.read().is_ok());
        assert!(session.is_open());
    }

    #[test]
    fn read_converts_to_rgb_when_configured() {
        let mut config = CaptureConfig::for_source("stub://cam");
        config.convert_to_rgb = true;
        let mut session = Session::new(config);
        let frame = session.read().expect("read");
        assert_eq!(frame.order(), ChannelOrder::Rgb);
    }

    #[test]
    fn actual_properties_substitute_zero_for_unavailable() {
        let mut session = Session::from_source("stub://cam?width=640&height=480");
        let (width, height, fps) = session.actual_properties().expect("properties");
        assert_eq!((width, height), (640, 480));
        assert_eq!(fps, 0.0);
    }

    #[test]
    fn actual_properties_report_configured_fps() {
        let mut session = Session::from_source("stub://cam?fps=12.5");
        let (_, _, fps) = session.actual_properties().expect("properties");
        assert_eq!(fps, 12.5);
    }

    #[test]
    fn frames_iterator_is_fused_after_error() {
        let mut session = Session::from_source("stub://cam?frames=2");
        let mut stream = session.frames();
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn frames_before_a_read_fault_are_usable() {
        let mut session = Session::from_source("stub://cam?fail_after=2");
        let first = session.read().expect("first frame");
        let second = session.read().expect("second frame");
        assert_eq!(first.data().len(), 640 * 480 * 3);
        assert_eq!(second.data().len(), 640 * 480 * 3);
        assert_ne!(first.data(), second.data());
        assert!(matches!(session.read(), Err(CaptureError::Read { .. })));
    }
}
