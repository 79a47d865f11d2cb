//! Audio output handles for playback.
//!
//! Decodes a fetched WAV into memory and feeds it to a cpal output stream.
//! The handle exposes the small surface the playback controller drives:
//! readiness, transport control, completion, and any asynchronous stream
//! error. The trait doubles as the seam for hardware-free tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error};

use crate::error::PlaybackError;

/// Creates playback handles from fetched recording bytes.
pub trait AudioOutput {
    /// Decodes `bytes` and opens an output resource for them.
    ///
    /// # Errors
    ///
    /// `PlaybackError::Media` when the bytes do not decode or no output
    /// device accepts the stream.
    fn open(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

/// One live audio output resource.
pub trait PlaybackHandle {
    /// True once the handle can start producing audio.
    fn is_ready(&self) -> bool;
    /// True when the media has played to its natural end.
    fn is_finished(&self) -> bool;
    /// Starts playback from position zero.
    fn begin(&mut self) -> Result<(), PlaybackError>;
    /// Pauses in place, keeping the position.
    fn pause(&mut self);
    /// Continues from the held position.
    fn resume(&mut self) -> Result<(), PlaybackError>;
    /// Stops and rewinds to zero.
    fn stop(&mut self);
    /// Drains an asynchronous stream error, if one fired.
    fn take_error(&mut self) -> Option<String>;
}

/// Playback through the system audio host.
pub struct CpalAudioOutput;

struct SinkShared {
    samples: Vec<f32>,
    position: AtomicUsize,
    playing: AtomicBool,
    finished: AtomicBool,
    error: Mutex<Option<String>>,
}

struct CpalSink {
    // Held for its lifetime. Dropping it closes the output device.
    _stream: cpal::Stream,
    shared: Arc<SinkShared>,
    filename: String,
}

impl AudioOutput for CpalAudioOutput {
    fn open(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| media_err(filename, format!("not a readable WAV: {e}")))?;
        let spec = reader.spec();
        let samples = decode_samples(reader, filename)?;
        debug!(
            "Decoded '{}': {} Hz, {} ch, {} samples",
            filename,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| media_err(filename, "no audio output device found".to_string()))?;
        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(SinkShared {
            samples,
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            error: Mutex::new(None),
        });

        let writer = Arc::clone(&shared);
        let failer = Arc::clone(&shared);
        let err_name = filename.to_string();
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(out, &writer);
                },
                move |err| {
                    error!("Output stream error for '{}': {}", err_name, err);
                    *failer.error.lock().unwrap() = Some(err.to_string());
                },
                None,
            )
            .map_err(|e| media_err(filename, e.to_string()))?;

        // The stream runs from here on but writes silence until `begin`
        // flips the playing flag.
        stream
            .play()
            .map_err(|e| media_err(filename, e.to_string()))?;

        Ok(Box::new(CpalSink {
            _stream: stream,
            shared,
            filename: filename.to_string(),
        }))
    }
}

impl PlaybackHandle for CpalSink {
    fn is_ready(&self) -> bool {
        // Decoding and device setup both happened in `open`.
        true
    }

    fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Relaxed)
    }

    fn begin(&mut self) -> Result<(), PlaybackError> {
        self.shared.position.store(0, Ordering::Relaxed);
        self.shared.finished.store(false, Ordering::Relaxed);
        self.shared.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::Relaxed);
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        if let Some(detail) = self.shared.error.lock().unwrap().take() {
            return Err(media_err(&self.filename, detail));
        }
        self.shared.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Relaxed);
        self.shared.position.store(0, Ordering::Relaxed);
        self.shared.finished.store(false, Ordering::Relaxed);
    }

    fn take_error(&mut self) -> Option<String> {
        self.shared.error.lock().unwrap().take()
    }
}

fn fill_output(out: &mut [f32], shared: &SinkShared) {
    if !shared.playing.load(Ordering::Relaxed) {
        out.fill(0.0);
        return;
    }
    let len = shared.samples.len();
    let mut position = shared.position.load(Ordering::Relaxed);
    for slot in out.iter_mut() {
        if position < len {
            *slot = shared.samples[position];
            position += 1;
        } else {
            *slot = 0.0;
        }
    }
    shared.position.store(position, Ordering::Relaxed);
    if position >= len {
        shared.finished.store(true, Ordering::Relaxed);
        shared.playing.store(false, Ordering::Relaxed);
    }
}

fn decode_samples(
    reader: hound::WavReader<Cursor<Vec<u8>>>,
    filename: &str,
) -> Result<Vec<f32>, PlaybackError> {
    let spec = reader.spec();
    let mut reader = reader;
    let decoded: Result<Vec<f32>, hound::Error> = match (spec.sample_format, spec.bits_per_sample)
    {
        (hound::SampleFormat::Float, 32) => reader.samples::<f32>().collect(),
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32_768.0))
            .collect(),
        (hound::SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect(),
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect(),
        (format, bits) => {
            return Err(media_err(
                filename,
                format!("unsupported WAV encoding: {bits}-bit {format:?}"),
            ))
        }
    };
    decoded.map_err(|e| media_err(filename, format!("decode failed: {e}")))
}

fn media_err(filename: &str, detail: String) -> PlaybackError {
    PlaybackError::Media {
        filename: filename.to_string(),
        detail,
    }
}
