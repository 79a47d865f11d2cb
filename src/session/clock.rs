//! Elapsed-time accounting for recording sessions.
//!
//! The clock is pure arithmetic over a start instant and a pause ledger.
//! Callers pass "now" in, which keeps every path deterministic under test.

use std::time::{Duration, Instant};

/// One pause interval. `end` stays open while the session is paused.
#[derive(Debug, Clone, Copy)]
struct PauseSpan {
    start: Instant,
    end: Option<Instant>,
}

/// Tracks wall-clock start and cumulative paused time for one session.
///
/// Elapsed is wall time minus every pause, clamped at zero. The value is
/// non-decreasing while recording and frozen while paused.
#[derive(Debug, Clone)]
pub struct SessionClock {
    started_at: Instant,
    pauses: Vec<PauseSpan>,
}

impl SessionClock {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            pauses: Vec::new(),
        }
    }

    /// Opens a pause interval. Ignored when one is already open.
    pub fn pause(&mut self, now: Instant) {
        if self.is_paused() {
            return;
        }
        self.pauses.push(PauseSpan {
            start: now,
            end: None,
        });
    }

    /// Closes the open pause interval. Ignored when none is open.
    pub fn resume(&mut self, now: Instant) {
        if let Some(span) = self.pauses.last_mut() {
            if span.end.is_none() {
                span.end = Some(now);
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.pauses.last(), Some(span) if span.end.is_none())
    }

    /// Time spent actually recording: wall time minus every pause, the open
    /// one included. Never negative.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let wall = now.saturating_duration_since(self.started_at);
        let paused: Duration = self
            .pauses
            .iter()
            .map(|span| {
                span.end
                    .unwrap_or(now)
                    .saturating_duration_since(span.start)
            })
            .sum();
        wall.saturating_sub(paused)
    }
}

/// Cancellable fixed-cadence deadline.
///
/// Drives the chunk cutter and the elapsed display refresh. The controller
/// that armed it cancels it on every exit path, so a fire can never outlive
/// the operation it belongs to.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// True when the deadline has passed. Skipped periods are collapsed, so
    /// a stalled frame produces one fire instead of one per missed period.
    pub fn fire(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.period;
        while next <= now {
            next += self.period;
        }
        self.next_due = Some(next);
        true
    }
}
