//! Recording session lifecycle.
//!
//! One controller owns at most one active session: the capture handle, the
//! pause ledger, the chunk cutter and the monitor tap live and die
//! together. Guards reject out-of-order transitions instead of papering
//! over them.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{EncodingUnsupported, SessionError};
use crate::monitor::{ChannelLevels, LevelMonitor};
use crate::quality::{QualityProfile, QualityTier};
use crate::session::capture::{CaptureBackend, CaptureHandle};
use crate::session::chunks::{ChunkBuffer, UploadPayload};
use crate::session::clock::{SessionClock, Ticker};

const DISPLAY_REFRESH: Duration = Duration::from_secs(1);

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    /// Teardown in progress inside `stop`. Observers see `Idle` again by
    /// the time `stop` returns.
    Stopped,
}

/// Which controls are live for a given state. The UI renders this directly
/// instead of keeping its own flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSurface {
    pub can_record: bool,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_stop: bool,
}

impl ControlSurface {
    pub fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::Idle | SessionState::Stopped => Self {
                can_record: true,
                can_pause: false,
                can_resume: false,
                can_stop: false,
            },
            SessionState::Recording => Self {
                can_record: false,
                can_pause: true,
                can_resume: false,
                can_stop: true,
            },
            SessionState::Paused => Self {
                can_record: false,
                can_pause: false,
                can_resume: true,
                can_stop: true,
            },
        }
    }
}

/// Everything `stop` hands back: the encoded payload plus the elapsed time
/// the session displayed last.
#[derive(Debug)]
pub struct FinishedSession {
    pub payload: UploadPayload,
    pub elapsed: Duration,
}

struct ActiveSession {
    profile: &'static QualityProfile,
    capture: Box<dyn CaptureHandle>,
    clock: SessionClock,
    chunks: ChunkBuffer,
    chunk_ticker: Ticker,
    display_ticker: Ticker,
    encoding_fallback: Option<EncodingUnsupported>,
}

pub struct RecordingController {
    backend: Box<dyn CaptureBackend>,
    device: String,
    chunk_interval: Duration,
    monitor: LevelMonitor,
    state: SessionState,
    active: Option<ActiveSession>,
}

impl RecordingController {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        device: String,
        chunk_interval: Duration,
        peak_threshold: u8,
    ) -> Self {
        Self {
            backend,
            device,
            chunk_interval,
            monitor: LevelMonitor::new(peak_threshold),
            state: SessionState::Idle,
            active: None,
        }
    }

    /// Acquires the capture device and starts a session.
    ///
    /// # Errors
    ///
    /// `SessionError::AlreadyActive` when a session exists, or a device
    /// error when acquisition fails. On failure nothing is armed and the
    /// record control stays available.
    pub fn start(&mut self, tier: QualityTier, now: Instant) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyActive);
        }
        let profile = tier.profile();
        info!(
            "Starting capture: {} ({} Hz, {} ch, {}-bit)",
            profile.tier, profile.sample_rate, profile.channels, profile.bit_depth
        );

        let capture = self.backend.open(profile, &self.device)?;
        let (chunks, encoding_fallback) = ChunkBuffer::new(profile, capture.native_bits());
        if let Some(note) = encoding_fallback {
            warn!("{}", note);
        }

        self.monitor.attach(capture.tap());
        let mut chunk_ticker = Ticker::new(self.chunk_interval);
        chunk_ticker.arm(now);
        let mut display_ticker = Ticker::new(DISPLAY_REFRESH);
        display_ticker.arm(now);

        self.active = Some(ActiveSession {
            profile,
            capture,
            clock: SessionClock::start(now),
            chunks,
            chunk_ticker,
            display_ticker,
            encoding_fallback,
        });
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Suspends capture. The elapsed clock freezes and the chunk cutter
    /// stops until `resume`.
    pub fn pause(&mut self, now: Instant) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording => {}
            SessionState::Paused => return Err(SessionError::AlreadyPaused),
            _ => return Err(SessionError::NotRecording),
        }
        let session = self.active.as_mut().ok_or(SessionError::NotRecording)?;
        // Cut what is pending so the pause boundary lands between chunks.
        let pending = session.capture.take_pending();
        session.chunks.push_slice(&pending);
        session.capture.set_paused(true);
        session.clock.pause(now);
        session.chunk_ticker.cancel();
        self.state = SessionState::Paused;
        debug!("Paused at {:?}", session.clock.elapsed(now));
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<(), SessionError> {
        match self.state {
            SessionState::Paused => {}
            SessionState::Recording => return Err(SessionError::NotPaused),
            _ => return Err(SessionError::NotRecording),
        }
        let session = self.active.as_mut().ok_or(SessionError::NotRecording)?;
        session.capture.set_paused(false);
        session.clock.resume(now);
        session.chunk_ticker.arm(now);
        self.state = SessionState::Recording;
        debug!("Resumed at {:?}", session.clock.elapsed(now));
        Ok(())
    }

    /// Stops the session and assembles the upload payload. The device, the
    /// monitor tap and every timer are released before this returns,
    /// whatever happens to the payload afterwards.
    pub fn stop(&mut self, now: Instant) -> Result<FinishedSession, SessionError> {
        if !matches!(self.state, SessionState::Recording | SessionState::Paused) {
            return Err(SessionError::NotRecording);
        }
        let session = self.active.take().ok_or(SessionError::NotRecording)?;
        self.state = SessionState::Stopped;

        let ActiveSession {
            mut capture,
            clock,
            mut chunks,
            mut chunk_ticker,
            mut display_ticker,
            ..
        } = session;

        let pending = capture.take_pending();
        chunks.push_slice(&pending);

        self.monitor.cancel();
        chunk_ticker.cancel();
        display_ticker.cancel();
        drop(capture);

        let elapsed = clock.elapsed(now);
        let chunk_count = chunks.chunk_count();
        let payload = chunks.finalize();
        info!(
            "Stopped after {:.1} s: {} chunks, {} bytes at {}",
            elapsed.as_secs_f32(),
            chunk_count,
            payload.bytes.len(),
            payload.tier
        );

        self.state = SessionState::Idle;
        Ok(FinishedSession { payload, elapsed })
    }

    /// Abandons the session without producing a payload. Same teardown as
    /// `stop`, nothing uploaded.
    pub fn abort(&mut self) {
        if self.active.take().is_some() {
            info!("Recording discarded");
        }
        self.monitor.cancel();
        self.state = SessionState::Idle;
    }

    /// Cuts pending samples into a chunk when the slice timer fires.
    pub fn tick(&mut self, now: Instant) {
        if self.state != SessionState::Recording {
            return;
        }
        if let Some(session) = self.active.as_mut() {
            if session.chunk_ticker.fire(now) {
                let pending = session.capture.take_pending();
                session.chunks.push_slice(&pending);
            }
        }
    }

    /// True when the once-a-second elapsed refresh is due. Quiet outside an
    /// active session.
    pub fn display_due(&mut self, now: Instant) -> bool {
        if !matches!(self.state, SessionState::Recording | SessionState::Paused) {
            return false;
        }
        match self.active.as_mut() {
            Some(session) => session.display_ticker.fire(now),
            None => false,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.active
            .as_ref()
            .map(|session| session.clock.elapsed(now))
            .unwrap_or_default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn controls(&self) -> ControlSurface {
        ControlSurface::for_state(self.state)
    }

    /// Runs one monitor iteration and returns the frame's levels.
    pub fn meter_frame(&mut self) -> Option<ChannelLevels> {
        self.monitor.frame()
    }

    pub fn is_peaking(&self) -> bool {
        self.monitor.is_peaking()
    }

    pub fn monitor_attached(&self) -> bool {
        self.monitor.is_attached()
    }

    pub fn encoding_fallback(&self) -> Option<EncodingUnsupported> {
        self.active
            .as_ref()
            .and_then(|session| session.encoding_fallback)
    }

    pub fn chunk_count(&self) -> usize {
        self.active
            .as_ref()
            .map(|session| session.chunks.chunk_count())
            .unwrap_or(0)
    }

    pub fn profile(&self) -> Option<&'static QualityProfile> {
        self.active.as_ref().map(|session| session.profile)
    }
}
