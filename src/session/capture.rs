//! Capture device management.
//!
//! Owns the cpal input stream for a recording session. The stream callback
//! feeds two buffers behind one lock: a pending queue the chunk cutter
//! drains, and a bounded tail the level monitor reads. A paused flag inside
//! the callback suspends intake without tearing the stream down.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, warn};

use crate::error::{DeviceError, SessionError};
use crate::quality::QualityProfile;

/// Newest samples retained for the analysis tap.
const TAP_CAPACITY: usize = 4096;

/// Opens capture streams for a profile. This is the seam that lets session
/// logic run without audio hardware in tests.
pub trait CaptureBackend {
    /// Acquires the device and starts a stream for `profile`.
    ///
    /// # Errors
    ///
    /// `SessionError::Device` when the device is missing, access is denied,
    /// or the profile's rate and channel count cannot be satisfied.
    fn open(
        &self,
        profile: &'static QualityProfile,
        device: &str,
    ) -> Result<Box<dyn CaptureHandle>, SessionError>;
}

/// One live capture stream. Dropping the handle releases the device.
pub trait CaptureHandle {
    /// Takes every sample captured since the previous call.
    fn take_pending(&mut self) -> Vec<i16>;
    /// Shared read handle for the level monitor.
    fn tap(&self) -> SampleTap;
    /// Suspends or resumes sample intake inside the stream callback.
    fn set_paused(&self, paused: bool);
    /// Native sample width of the device stream in bits.
    fn native_bits(&self) -> u16;
}

#[derive(Debug, Default)]
pub(crate) struct SharedBuffers {
    pending: Vec<i16>,
    tail: VecDeque<i16>,
    paused: bool,
}

impl SharedBuffers {
    pub(crate) fn push(&mut self, samples: &[i16]) {
        if self.paused {
            return;
        }
        self.pending.extend_from_slice(samples);
        self.tail.extend(samples.iter().copied());
        while self.tail.len() > TAP_CAPACITY {
            self.tail.pop_front();
        }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

/// Read-only view of the newest capture samples.
#[derive(Clone)]
pub struct SampleTap {
    shared: Arc<Mutex<SharedBuffers>>,
}

impl SampleTap {
    pub(crate) fn from_shared(shared: Arc<Mutex<SharedBuffers>>) -> Self {
        Self { shared }
    }

    /// Copies up to `count` of the newest samples.
    pub fn recent(&self, count: usize) -> Vec<i16> {
        let shared = self.shared.lock().unwrap();
        let skip = shared.tail.len().saturating_sub(count);
        shared.tail.iter().skip(skip).copied().collect()
    }
}

/// Capture through the system audio host.
pub struct CpalCaptureBackend;

struct CpalCapture {
    // Held for its lifetime. Dropping it stops the stream and releases the
    // device.
    _stream: cpal::Stream,
    shared: Arc<Mutex<SharedBuffers>>,
    native_bits: u16,
}

impl CaptureHandle for CpalCapture {
    fn take_pending(&mut self) -> Vec<i16> {
        self.shared.lock().unwrap().take_pending()
    }

    fn tap(&self) -> SampleTap {
        SampleTap::from_shared(Arc::clone(&self.shared))
    }

    fn set_paused(&self, paused: bool) {
        self.shared.lock().unwrap().set_paused(paused);
    }

    fn native_bits(&self) -> u16 {
        self.native_bits
    }
}

impl CaptureBackend for CpalCaptureBackend {
    fn open(
        &self,
        profile: &'static QualityProfile,
        device_spec: &str,
    ) -> Result<Box<dyn CaptureHandle>, SessionError> {
        silence_alsa(|| {
            let host = cpal::default_host();
            let device = resolve_device(&host, device_spec)?;
            let name = device.name().unwrap_or_else(|_| "unknown".to_string());
            let (config, sample_format) = negotiate(&device, profile, device_spec)?;
            info!(
                "Capturing from '{}' at {} Hz, {} ch ({:?} native)",
                name, profile.sample_rate, profile.channels, sample_format
            );
            if profile.echo_cancellation || profile.noise_suppression || profile.auto_gain_control
            {
                debug!(
                    "Input processing requested (ec={} ns={} agc={}, latency {} s), host decides support",
                    profile.echo_cancellation,
                    profile.noise_suppression,
                    profile.auto_gain_control,
                    profile.latency_hint
                );
            }
            build_stream(&device, &config, sample_format)
        })
    }
}

/// Resolves "default", a numeric index, or a device name, in that order.
fn resolve_device(host: &cpal::Host, spec: &str) -> Result<cpal::Device, SessionError> {
    if spec == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| not_found(spec).into());
    }

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| classify_backend(&e.to_string(), spec))?
        .collect();

    if let Ok(index) = spec.parse::<usize>() {
        if let Some(device) = devices.into_iter().nth(index) {
            return Ok(device);
        }
        warn!("No capture device at index {}", index);
        return Err(not_found(spec).into());
    }

    for device in devices {
        if device.name().map(|n| n == spec).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(not_found(spec).into())
}

/// Finds a supported config matching the profile's rate and channel count.
fn negotiate(
    device: &cpal::Device,
    profile: &QualityProfile,
    device_spec: &str,
) -> Result<(cpal::StreamConfig, cpal::SampleFormat), SessionError> {
    let rate = cpal::SampleRate(profile.sample_rate);
    let ranges = device
        .supported_input_configs()
        .map_err(|e| classify_backend(&e.to_string(), device_spec))?;

    for range in ranges {
        if range.channels() != profile.channels {
            continue;
        }
        if rate < range.min_sample_rate() || rate > range.max_sample_rate() {
            continue;
        }
        let supported = range.with_sample_rate(rate);
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        return Ok((config, sample_format));
    }

    Err(DeviceError::UnsupportedProfile {
        sample_rate: profile.sample_rate,
        channels: profile.channels,
    }
    .into())
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
) -> Result<Box<dyn CaptureHandle>, SessionError> {
    let shared = Arc::new(Mutex::new(SharedBuffers::default()));
    let err_fn = |err: cpal::StreamError| {
        error!("Capture stream error: {}", err);
    };

    let stream = match sample_format {
        cpal::SampleFormat::I16 => {
            let sink = Arc::clone(&shared);
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    sink.lock().unwrap().push(data);
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::U16 => {
            let sink = Arc::clone(&shared);
            device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> =
                        data.iter().map(|&s| (s as i32 - 32_768) as i16).collect();
                    sink.lock().unwrap().push(&converted);
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::F32 => {
            let sink = Arc::clone(&shared);
            device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    sink.lock().unwrap().push(&converted);
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(SessionError::Stream(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| classify_build(&e))?;

    stream
        .play()
        .map_err(|e| SessionError::Stream(e.to_string()))?;

    Ok(Box::new(CpalCapture {
        _stream: stream,
        shared,
        native_bits: native_bits_of(sample_format),
    }))
}

/// Wire width the device delivers natively. Float streams carry more than
/// 24 significant bits, so they satisfy any profile.
fn native_bits_of(format: cpal::SampleFormat) -> u16 {
    match format {
        cpal::SampleFormat::I16 | cpal::SampleFormat::U16 => 16,
        _ => 32,
    }
}

fn not_found(spec: &str) -> DeviceError {
    DeviceError::NotFound {
        device: spec.to_string(),
    }
}

/// Sorts backend error text into the permission bucket when it reads like
/// an access problem, otherwise treats the device as missing.
fn classify_backend(message: &str, device_spec: &str) -> SessionError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        DeviceError::PermissionDenied.into()
    } else {
        warn!("Device enumeration failed: {}", message);
        not_found(device_spec).into()
    }
}

fn classify_build(err: &cpal::BuildStreamError) -> SessionError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => not_found("default").into(),
        cpal::BuildStreamError::StreamConfigNotSupported => SessionError::Stream(
            "the negotiated stream configuration was rejected by the device".to_string(),
        ),
        other => {
            let text = other.to_string();
            let lowered = text.to_lowercase();
            if lowered.contains("permission") || lowered.contains("denied") {
                DeviceError::PermissionDenied.into()
            } else {
                SessionError::Stream(text)
            }
        }
    }
}

/// Runs `f` with stderr pointed at /dev/null, hiding ALSA's startup chatter
/// on Linux. Best effort: any dup failure just runs `f` unmuted.
#[cfg(target_os = "linux")]
pub fn silence_alsa<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved == -1 {
        return f();
    }
    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(saved) };
        return f();
    }
    let result = f();
    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }
    result
}

#[cfg(not(target_os = "linux"))]
pub fn silence_alsa<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_intake_drops_samples() {
        let mut buffers = SharedBuffers::default();
        buffers.push(&[1, 2, 3]);
        buffers.set_paused(true);
        buffers.push(&[4, 5, 6]);
        buffers.set_paused(false);
        buffers.push(&[7]);
        assert_eq!(buffers.take_pending(), vec![1, 2, 3, 7]);
    }

    #[test]
    fn test_take_pending_drains() {
        let mut buffers = SharedBuffers::default();
        buffers.push(&[1, 2]);
        assert_eq!(buffers.take_pending(), vec![1, 2]);
        assert!(buffers.take_pending().is_empty());
    }

    #[test]
    fn test_tap_keeps_bounded_tail_of_newest_samples() {
        let shared = Arc::new(Mutex::new(SharedBuffers::default()));
        let tap = SampleTap::from_shared(Arc::clone(&shared));

        let big: Vec<i16> = (0..(TAP_CAPACITY as i16 + 100)).map(|i| i as i16).collect();
        shared.lock().unwrap().push(&big);

        let recent = tap.recent(4);
        let last = big[big.len() - 1];
        assert_eq!(recent, vec![last - 3, last - 2, last - 1, last]);
        assert_eq!(shared.lock().unwrap().tail.len(), TAP_CAPACITY);
    }

    #[test]
    fn test_tap_recent_handles_short_tail() {
        let shared = Arc::new(Mutex::new(SharedBuffers::default()));
        let tap = SampleTap::from_shared(Arc::clone(&shared));
        shared.lock().unwrap().push(&[9, 10]);
        assert_eq!(tap.recent(256), vec![9, 10]);
    }

    #[test]
    fn test_native_bits_mapping() {
        assert_eq!(native_bits_of(cpal::SampleFormat::I16), 16);
        assert_eq!(native_bits_of(cpal::SampleFormat::U16), 16);
        assert_eq!(native_bits_of(cpal::SampleFormat::F32), 32);
    }

    #[test]
    fn test_backend_error_classification() {
        assert!(matches!(
            classify_backend("Permission denied by host", "default"),
            SessionError::Device(DeviceError::PermissionDenied)
        ));
        assert!(matches!(
            classify_backend("something exploded", "mic2"),
            SessionError::Device(DeviceError::NotFound { .. })
        ));
    }
}
