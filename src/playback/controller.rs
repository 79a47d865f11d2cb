//! Playback lifecycle across the recording library.
//!
//! Every library row owns an entry whose state drives its badge, and that
//! state is the single source of truth: play, stop, deadlines and media
//! completions all funnel through this controller on the UI loop, so
//! transitions within an entry are totally ordered and at most one entry is
//! ever audible.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::playback::sink::{AudioOutput, PlaybackHandle};
use crate::remote::is_valid_filename;

/// Bounded wait for a load to become ready.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Rendered state of one library row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    Loading,
    Playing,
    Paused,
    /// Failure badge. The entry holds no resources and behaves like `Idle`
    /// for every operation; the badge clears on the next touch.
    Error,
}

/// What the caller should do after `play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Fetch the recording's bytes and hand them back through
    /// `media_ready` or `media_failed` with this attempt id.
    FetchStarted { attempt: u64 },
    Paused,
    Resumed,
    /// The entry is mid-load; the request was dropped.
    AlreadyLoading,
}

/// State changes the UI surfaces on its status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackNote {
    Loading(String),
    Playing(String),
    Finished(String),
    TimedOut(String),
    Failed { filename: String, detail: String },
}

struct Entry {
    state: UiState,
    handle: Option<Box<dyn PlaybackHandle>>,
    /// Load attempt currently in flight. Completions carrying any other id
    /// are stale and dropped.
    attempt: u64,
    deadline: Option<Instant>,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: UiState::Idle,
            handle: None,
            attempt: 0,
            deadline: None,
        }
    }

    /// Stops and drops the handle, clears the deadline. Leaves `state`
    /// alone; callers decide what the row shows next.
    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.deadline = None;
    }
}

enum Advance {
    Promote,
    Timeout,
    Finish,
    StreamError(String),
}

pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    entries: BTreeMap<String, Entry>,
    known: BTreeSet<String>,
    now_playing: Option<String>,
    attempts: u64,
    load_timeout: Duration,
    notes: Vec<PlaybackNote>,
}

impl PlaybackController {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            entries: BTreeMap::new(),
            known: BTreeSet::new(),
            now_playing: None,
            attempts: 0,
            load_timeout: LOAD_TIMEOUT,
            notes: Vec::new(),
        }
    }

    /// Replaces the set of filenames `play` and `stop` accept, normally
    /// after every listing refresh.
    pub fn set_known<I>(&mut self, filenames: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.known = filenames.into_iter().collect();
    }

    /// Toggles or starts playback for one entry.
    ///
    /// A fresh start silences whatever is playing and cancels every other
    /// in-flight load before arming its own deadline, so the one-audible
    /// invariant holds from the moment of the request.
    ///
    /// # Errors
    ///
    /// Unknown or malformed names are rejected before any state changes.
    /// A failed resume releases the entry and reports the stream error.
    pub fn play(&mut self, filename: &str, now: Instant) -> Result<PlayOutcome, PlaybackError> {
        self.check_reference(filename)?;

        match self.state_of(filename) {
            UiState::Playing => {
                if let Some(entry) = self.entries.get_mut(filename) {
                    if let Some(handle) = entry.handle.as_mut() {
                        handle.pause();
                    }
                    entry.state = UiState::Paused;
                }
                self.now_playing = None;
                debug!("Paused '{}'", filename);
                Ok(PlayOutcome::Paused)
            }
            UiState::Paused => {
                // Taking the audible slot back, so anything else playing
                // goes quiet first.
                self.silence_current();
                let entry = self
                    .entries
                    .get_mut(filename)
                    .ok_or_else(|| unknown(filename))?;
                let Some(handle) = entry.handle.as_mut() else {
                    entry.state = UiState::Idle;
                    return Err(media(filename, "paused entry lost its audio resource"));
                };
                match handle.resume() {
                    Ok(()) => {
                        entry.state = UiState::Playing;
                        self.now_playing = Some(filename.to_string());
                        debug!("Resumed '{}'", filename);
                        Ok(PlayOutcome::Resumed)
                    }
                    Err(err) => {
                        entry.release();
                        entry.state = UiState::Error;
                        warn!("Resume failed for '{}': {}", filename, err);
                        Err(err)
                    }
                }
            }
            UiState::Loading => {
                debug!("'{}' is still loading, request dropped", filename);
                Ok(PlayOutcome::AlreadyLoading)
            }
            UiState::Idle | UiState::Error => {
                self.silence_current();
                self.abort_loads();
                let attempt = self.next_attempt();
                let deadline = now + self.load_timeout;
                let entry = self
                    .entries
                    .entry(filename.to_string())
                    .or_insert_with(Entry::new);
                entry.release();
                entry.state = UiState::Loading;
                entry.attempt = attempt;
                entry.deadline = Some(deadline);
                info!("Loading '{}' (attempt {})", filename, attempt);
                self.note(PlaybackNote::Loading(filename.to_string()));
                Ok(PlayOutcome::FetchStarted { attempt })
            }
        }
    }

    /// Hands fetched bytes to the entry's load attempt. Stale attempts,
    /// where the entry has since moved on, are dropped without effect.
    pub fn media_ready(&mut self, filename: &str, attempt: u64, bytes: Vec<u8>) {
        let Some(entry) = self.entries.get_mut(filename) else {
            return;
        };
        if entry.state != UiState::Loading || entry.attempt != attempt {
            debug!("Dropping stale media for '{}' (attempt {})", filename, attempt);
            return;
        }
        match self.output.open(filename, bytes) {
            Ok(handle) => {
                // Stays in Loading until the next tick observes readiness.
                entry.handle = Some(handle);
            }
            Err(err) => {
                let detail = err.to_string();
                self.fail_entry(filename, detail);
            }
        }
    }

    /// Reports a failed fetch for the entry's load attempt. Stale attempts
    /// are dropped.
    pub fn media_failed(&mut self, filename: &str, attempt: u64, detail: &str) {
        let stale = match self.entries.get(filename) {
            Some(entry) => entry.state != UiState::Loading || entry.attempt != attempt,
            None => true,
        };
        if stale {
            debug!(
                "Dropping stale fetch failure for '{}' (attempt {})",
                filename, attempt
            );
            return;
        }
        self.fail_entry(filename, detail.to_string());
    }

    /// One cooperative step: promotes ready loads, fires load deadlines,
    /// reaps finished playback and surfaces stream errors. Every transition
    /// happens here on the caller's loop, never on an audio thread.
    pub fn tick(&mut self, now: Instant) {
        let filenames: Vec<String> = self.entries.keys().cloned().collect();
        for filename in filenames {
            let advance = self.inspect(&filename, now);
            match advance {
                None => {}
                Some(Advance::Promote) => self.promote(&filename),
                Some(Advance::Timeout) => self.expire(&filename),
                Some(Advance::Finish) => self.finish(&filename),
                Some(Advance::StreamError(detail)) => self.fail_entry(&filename, detail),
            }
        }
    }

    /// Stops one entry from any state: handle released, position reset,
    /// row back to `Idle`.
    ///
    /// # Errors
    ///
    /// Unknown or malformed names are rejected.
    pub fn stop(&mut self, filename: &str) -> Result<(), PlaybackError> {
        self.check_reference(filename)?;
        if let Some(entry) = self.entries.get_mut(filename) {
            if entry.state != UiState::Idle {
                debug!("Stopped '{}'", filename);
            }
            entry.release();
            entry.state = UiState::Idle;
        }
        if self.now_playing.as_deref() == Some(filename) {
            self.now_playing = None;
        }
        Ok(())
    }

    /// Tears down every entry: nothing playing, nothing loading, zero owned
    /// handles. Runs on command exit and Ctrl+C.
    pub fn stop_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.release();
            entry.state = UiState::Idle;
        }
        self.now_playing = None;
        info!("All playback stopped");
    }

    pub fn state_of(&self, filename: &str) -> UiState {
        self.entries
            .get(filename)
            .map(|entry| entry.state)
            .unwrap_or(UiState::Idle)
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    pub fn playing_count(&self) -> usize {
        self.count_state(UiState::Playing)
    }

    pub fn loading_count(&self) -> usize {
        self.count_state(UiState::Loading)
    }

    /// Entries still holding an audio resource.
    pub fn handle_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.handle.is_some())
            .count()
    }

    pub fn take_notes(&mut self) -> Vec<PlaybackNote> {
        std::mem::take(&mut self.notes)
    }

    fn count_state(&self, state: UiState) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.state == state)
            .count()
    }

    fn inspect(&mut self, filename: &str, now: Instant) -> Option<Advance> {
        let entry = self.entries.get_mut(filename)?;
        match entry.state {
            UiState::Loading => {
                if entry
                    .handle
                    .as_ref()
                    .map(|handle| handle.is_ready())
                    .unwrap_or(false)
                {
                    return Some(Advance::Promote);
                }
                if entry.deadline.map(|due| now >= due).unwrap_or(false) {
                    return Some(Advance::Timeout);
                }
                None
            }
            UiState::Playing => {
                if let Some(handle) = entry.handle.as_mut() {
                    if let Some(detail) = handle.take_error() {
                        return Some(Advance::StreamError(detail));
                    }
                    if handle.is_finished() {
                        return Some(Advance::Finish);
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn promote(&mut self, filename: &str) {
        // The slot owner changes here, never on the audio thread.
        self.silence_current();
        let Some(entry) = self.entries.get_mut(filename) else {
            return;
        };
        let Some(handle) = entry.handle.as_mut() else {
            return;
        };
        match handle.begin() {
            Ok(()) => {
                entry.state = UiState::Playing;
                entry.deadline = None;
                self.now_playing = Some(filename.to_string());
                info!("Playing '{}'", filename);
                self.note(PlaybackNote::Playing(filename.to_string()));
            }
            Err(err) => {
                let detail = err.to_string();
                self.fail_entry(filename, detail);
            }
        }
    }

    /// Fires a load deadline exactly once. The deadline is consumed and the
    /// entry leaves `Loading`, so neither a second fire nor a late fetch
    /// can resurrect the attempt.
    fn expire(&mut self, filename: &str) {
        if let Some(entry) = self.entries.get_mut(filename) {
            entry.release();
            entry.state = UiState::Idle;
        }
        warn!(
            "'{}' did not become ready within {:?}",
            filename, self.load_timeout
        );
        self.note(PlaybackNote::TimedOut(filename.to_string()));
    }

    fn finish(&mut self, filename: &str) {
        if let Some(entry) = self.entries.get_mut(filename) {
            entry.release();
            entry.state = UiState::Idle;
        }
        if self.now_playing.as_deref() == Some(filename) {
            self.now_playing = None;
        }
        debug!("'{}' finished", filename);
        self.note(PlaybackNote::Finished(filename.to_string()));
    }

    fn fail_entry(&mut self, filename: &str, detail: String) {
        if let Some(entry) = self.entries.get_mut(filename) {
            entry.release();
            entry.state = UiState::Error;
        }
        if self.now_playing.as_deref() == Some(filename) {
            self.now_playing = None;
        }
        warn!("Playback failed for '{}': {}", filename, detail);
        self.note(PlaybackNote::Failed {
            filename: filename.to_string(),
            detail,
        });
    }

    /// Returns the audible entry to `Idle`, releasing its handle. The row
    /// itself stays for reuse.
    fn silence_current(&mut self) {
        if let Some(current) = self.now_playing.take() {
            if let Some(entry) = self.entries.get_mut(&current) {
                entry.release();
                entry.state = UiState::Idle;
                debug!("Silenced '{}'", current);
            }
        }
    }

    /// Cancels every in-flight load. Their pending completions become stale
    /// the moment the entries leave `Loading`.
    fn abort_loads(&mut self) {
        for (filename, entry) in self.entries.iter_mut() {
            if entry.state == UiState::Loading {
                entry.release();
                entry.state = UiState::Idle;
                debug!("Superseded load of '{}'", filename);
            }
        }
    }

    fn check_reference(&self, filename: &str) -> Result<(), PlaybackError> {
        if !is_valid_filename(filename) {
            return Err(PlaybackError::InvalidName {
                filename: filename.to_string(),
            });
        }
        if !self.known.contains(filename) {
            return Err(unknown(filename));
        }
        Ok(())
    }

    fn next_attempt(&mut self) -> u64 {
        self.attempts = self.attempts.wrapping_add(1);
        self.attempts
    }

    fn note(&mut self, note: PlaybackNote) {
        self.notes.push(note);
    }
}

fn unknown(filename: &str) -> PlaybackError {
    PlaybackError::UnknownRecording {
        filename: filename.to_string(),
    }
}

fn media(filename: &str, detail: &str) -> PlaybackError {
    PlaybackError::Media {
        filename: filename.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakePlan {
        fail_open: Option<String>,
        ready_immediately: bool,
        fail_resume: bool,
    }

    #[derive(Default)]
    struct HandleFlags {
        ready: bool,
        finished: bool,
        playing: bool,
        stopped: bool,
        error: Option<String>,
    }

    struct FakeHandle {
        flags: Arc<Mutex<HandleFlags>>,
        fail_resume: bool,
    }

    impl PlaybackHandle for FakeHandle {
        fn is_ready(&self) -> bool {
            self.flags.lock().unwrap().ready
        }
        fn is_finished(&self) -> bool {
            self.flags.lock().unwrap().finished
        }
        fn begin(&mut self) -> Result<(), PlaybackError> {
            self.flags.lock().unwrap().playing = true;
            Ok(())
        }
        fn pause(&mut self) {
            self.flags.lock().unwrap().playing = false;
        }
        fn resume(&mut self) -> Result<(), PlaybackError> {
            if self.fail_resume {
                return Err(media("fake", "stream went away"));
            }
            self.flags.lock().unwrap().playing = true;
            Ok(())
        }
        fn stop(&mut self) {
            let mut flags = self.flags.lock().unwrap();
            flags.playing = false;
            flags.stopped = true;
        }
        fn take_error(&mut self) -> Option<String> {
            self.flags.lock().unwrap().error.take()
        }
    }

    #[derive(Clone, Default)]
    struct FakeOutput {
        plan: Arc<Mutex<FakePlan>>,
        handles: Arc<Mutex<Vec<Arc<Mutex<HandleFlags>>>>>,
    }

    impl FakeOutput {
        fn ready() -> Self {
            let output = Self::default();
            output.plan.lock().unwrap().ready_immediately = true;
            output
        }

        fn last_handle(&self) -> Arc<Mutex<HandleFlags>> {
            Arc::clone(self.handles.lock().unwrap().last().unwrap())
        }
    }

    impl AudioOutput for FakeOutput {
        fn open(
            &self,
            filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
            let plan = self.plan.lock().unwrap();
            if let Some(detail) = plan.fail_open.clone() {
                return Err(media(filename, &detail));
            }
            let flags = Arc::new(Mutex::new(HandleFlags {
                ready: plan.ready_immediately,
                ..HandleFlags::default()
            }));
            self.handles.lock().unwrap().push(Arc::clone(&flags));
            Ok(Box::new(FakeHandle {
                flags,
                fail_resume: plan.fail_resume,
            }))
        }
    }

    fn controller_with(output: FakeOutput) -> PlaybackController {
        let mut controller = PlaybackController::new(Box::new(output));
        controller.set_known(["a.wav".to_string(), "b.wav".to_string()]);
        controller
    }

    fn start_playing(
        controller: &mut PlaybackController,
        filename: &str,
        now: Instant,
    ) -> u64 {
        let outcome = controller.play(filename, now).unwrap();
        let PlayOutcome::FetchStarted { attempt } = outcome else {
            panic!("expected a fetch, got {outcome:?}");
        };
        controller.media_ready(filename, attempt, vec![1, 2, 3]);
        controller.tick(now);
        assert_eq!(controller.state_of(filename), UiState::Playing);
        attempt
    }

    #[test]
    fn test_load_then_ready_promotes_to_playing() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let outcome = controller.play("a.wav", t0).unwrap();
        assert!(matches!(outcome, PlayOutcome::FetchStarted { .. }));
        assert_eq!(controller.state_of("a.wav"), UiState::Loading);

        start_playing(&mut controller, "a.wav", t0); // replays the same path
    }

    #[test]
    fn test_at_most_one_playing() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        // Starting b silences a synchronously, before any fetch returns.
        let outcome = controller.play("b.wav", t0).unwrap();
        assert!(matches!(outcome, PlayOutcome::FetchStarted { .. }));
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert_eq!(controller.playing_count(), 0);

        let PlayOutcome::FetchStarted { attempt } = outcome else {
            unreachable!()
        };
        controller.media_ready("b.wav", attempt, vec![9]);
        controller.tick(t0);
        assert_eq!(controller.state_of("b.wav"), UiState::Playing);
        assert_eq!(controller.playing_count(), 1);
        assert_eq!(controller.now_playing(), Some("b.wav"));
    }

    #[test]
    fn test_toggle_pause_resume_keeps_handle() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        assert!(matches!(
            controller.play("a.wav", t0).unwrap(),
            PlayOutcome::Paused
        ));
        assert_eq!(controller.state_of("a.wav"), UiState::Paused);
        assert_eq!(controller.handle_count(), 1);
        assert_eq!(controller.now_playing(), None);

        assert!(matches!(
            controller.play("a.wav", t0).unwrap(),
            PlayOutcome::Resumed
        ));
        assert_eq!(controller.state_of("a.wav"), UiState::Playing);
        assert_eq!(controller.now_playing(), Some("a.wav"));
    }

    #[test]
    fn test_rapid_replay_is_not_double_triggered() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let PlayOutcome::FetchStarted { attempt } = controller.play("a.wav", t0).unwrap() else {
            unreachable!()
        };
        // Second press lands while loading and is dropped.
        assert_eq!(
            controller.play("a.wav", t0).unwrap(),
            PlayOutcome::AlreadyLoading
        );
        controller.media_ready("a.wav", attempt, vec![1]);
        controller.tick(t0);
        assert_eq!(controller.state_of("a.wav"), UiState::Playing);
        assert_eq!(controller.handle_count(), 1);
    }

    #[test]
    fn test_new_load_supersedes_loading_entry() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let PlayOutcome::FetchStarted { attempt: for_a } = controller.play("a.wav", t0).unwrap()
        else {
            unreachable!()
        };
        let PlayOutcome::FetchStarted { attempt: for_b } = controller.play("b.wav", t0).unwrap()
        else {
            unreachable!()
        };
        // a went quietly back to Idle.
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);

        // a's fetch lands late and is stale.
        controller.media_ready("a.wav", for_a, vec![1]);
        controller.tick(t0);
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert_eq!(controller.handle_count(), 0);

        controller.media_ready("b.wav", for_b, vec![2]);
        controller.tick(t0);
        assert_eq!(controller.state_of("b.wav"), UiState::Playing);
    }

    #[test]
    fn test_timeout_fires_exactly_once() {
        let output = FakeOutput::default(); // never ready
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let PlayOutcome::FetchStarted { attempt } = controller.play("a.wav", t0).unwrap() else {
            unreachable!()
        };
        controller.tick(t0 + Duration::from_secs(9));
        assert_eq!(controller.state_of("a.wav"), UiState::Loading);

        controller.tick(t0 + Duration::from_secs(11));
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        let timeouts = controller
            .take_notes()
            .into_iter()
            .filter(|note| matches!(note, PlaybackNote::TimedOut(_)))
            .count();
        assert_eq!(timeouts, 1);

        // No second fire, and the late fetch is stale.
        controller.tick(t0 + Duration::from_secs(20));
        assert!(controller.take_notes().is_empty());
        controller.media_ready("a.wav", attempt, vec![1]);
        controller.tick(t0 + Duration::from_secs(21));
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert_eq!(controller.handle_count(), 0);
    }

    #[test]
    fn test_ready_cancels_deadline() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        controller.tick(t0 + Duration::from_secs(30));
        assert_eq!(controller.state_of("a.wav"), UiState::Playing);
        assert!(!controller
            .take_notes()
            .iter()
            .any(|note| matches!(note, PlaybackNote::TimedOut(_))));
    }

    #[test]
    fn test_natural_end_returns_to_idle() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output.clone());
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        output.last_handle().lock().unwrap().finished = true;
        controller.tick(t0 + Duration::from_secs(1));

        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert_eq!(controller.now_playing(), None);
        assert_eq!(controller.handle_count(), 0);
        assert!(controller
            .take_notes()
            .iter()
            .any(|note| matches!(note, PlaybackNote::Finished(_))));
    }

    #[test]
    fn test_stream_error_sets_badge_and_releases() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output.clone());
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        output.last_handle().lock().unwrap().error = Some("device unplugged".to_string());
        controller.tick(t0 + Duration::from_secs(1));

        assert_eq!(controller.state_of("a.wav"), UiState::Error);
        assert_eq!(controller.handle_count(), 0);
        assert_eq!(controller.now_playing(), None);
        // The badge behaves like Idle: the next play starts a fresh load.
        assert!(matches!(
            controller.play("a.wav", t0).unwrap(),
            PlayOutcome::FetchStarted { .. }
        ));
    }

    #[test]
    fn test_failed_resume_reports_and_releases() {
        let output = FakeOutput::ready();
        output.plan.lock().unwrap().fail_resume = true;
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        controller.play("a.wav", t0).unwrap(); // pause
        let err = controller.play("a.wav", t0).unwrap_err();
        assert!(matches!(err, PlaybackError::Media { .. }));
        assert_eq!(controller.state_of("a.wav"), UiState::Error);
        assert_eq!(controller.handle_count(), 0);
    }

    #[test]
    fn test_failed_open_sets_badge() {
        let output = FakeOutput::default();
        output.plan.lock().unwrap().fail_open = Some("bad wav".to_string());
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let PlayOutcome::FetchStarted { attempt } = controller.play("a.wav", t0).unwrap() else {
            unreachable!()
        };
        controller.media_ready("a.wav", attempt, vec![1]);
        assert_eq!(controller.state_of("a.wav"), UiState::Error);
        assert!(controller
            .take_notes()
            .iter()
            .any(|note| matches!(note, PlaybackNote::Failed { .. })));
    }

    #[test]
    fn test_fetch_failure_reaches_entry() {
        let output = FakeOutput::default();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        let PlayOutcome::FetchStarted { attempt } = controller.play("a.wav", t0).unwrap() else {
            unreachable!()
        };
        controller.media_failed("a.wav", attempt, "connection refused");
        assert_eq!(controller.state_of("a.wav"), UiState::Error);

        // A stale failure for a superseded attempt does nothing.
        controller.play("a.wav", t0).unwrap();
        controller.media_failed("a.wav", attempt, "connection refused");
        assert_eq!(controller.state_of("a.wav"), UiState::Loading);
    }

    #[test]
    fn test_stop_from_any_state() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output.clone());
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        controller.stop("a.wav").unwrap();
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert!(output.last_handle().lock().unwrap().stopped);
        assert_eq!(controller.now_playing(), None);

        // Stop on an idle entry is a quiet no-op.
        controller.stop("a.wav").unwrap();
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
    }

    #[test]
    fn test_stop_all_leaves_nothing_behind() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        controller.play("a.wav", t0).unwrap(); // now paused, keeps handle
        controller.play("b.wav", t0).unwrap(); // loading

        controller.stop_all();
        assert_eq!(controller.playing_count(), 0);
        assert_eq!(controller.loading_count(), 0);
        assert_eq!(controller.handle_count(), 0);
        assert_eq!(controller.state_of("a.wav"), UiState::Idle);
        assert_eq!(controller.state_of("b.wav"), UiState::Idle);
        assert_eq!(controller.now_playing(), None);
    }

    #[test]
    fn test_unknown_name_rejected_without_side_effects() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        start_playing(&mut controller, "a.wav", t0);
        let err = controller.play("ghost.wav", t0).unwrap_err();
        assert!(matches!(err, PlaybackError::UnknownRecording { .. }));
        // a.wav kept playing; the rejected call touched nothing.
        assert_eq!(controller.state_of("a.wav"), UiState::Playing);
        assert_eq!(controller.now_playing(), Some("a.wav"));
    }

    #[test]
    fn test_malformed_name_rejected() {
        let output = FakeOutput::ready();
        let mut controller = controller_with(output);
        let t0 = Instant::now();

        for bad in ["../etc/passwd.wav", "a/b.wav", "", "notes.txt"] {
            let err = controller.play(bad, t0).unwrap_err();
            assert!(matches!(err, PlaybackError::InvalidName { .. }), "{bad}");
        }
        assert!(matches!(
            controller.stop("a b.wav").unwrap_err(),
            PlaybackError::InvalidName { .. }
        ));
    }
}
