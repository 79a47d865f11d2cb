//! Chunked wire encoding for the upload payload.
//!
//! Samples are cut into fixed-interval chunks while recording and each
//! chunk is packed to the profile's wire width immediately. Finalizing
//! concatenates the chunks behind a canonical RIFF/WAVE header tagged with
//! the profile's rate and channel count.

use std::time::Duration;

use crate::error::EncodingUnsupported;
use crate::quality::{QualityProfile, QualityTier};

/// Default chunk cadence in milliseconds. Small slices keep the buffer
/// close to the live signal; `[audio] chunk_interval_ms` overrides it.
pub const DEFAULT_CHUNK_INTERVAL_MS: u64 = 100;

const WAV_HEADER_LEN: usize = 44;

/// Ordered encoded chunks for one session.
pub struct ChunkBuffer {
    profile: &'static QualityProfile,
    wire_bits: u16,
    chunks: Vec<Vec<u8>>,
    frames: u64,
}

/// Finished recording handed to the upload path.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Complete WAV file image.
    pub bytes: Vec<u8>,
    pub tier: QualityTier,
    pub sample_rate: u32,
    pub channels: u16,
    /// Wire width actually written, after any fallback.
    pub bit_depth: u16,
    /// Audio duration derived from the frame count.
    pub audio_duration: Duration,
}

impl UploadPayload {
    /// True when no samples were captured. The upload path skips these.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= WAV_HEADER_LEN
    }
}

impl ChunkBuffer {
    /// Creates the buffer, choosing the wire width. Asking for more bits
    /// than the device delivers reports a fallback and capture continues.
    pub fn new(
        profile: &'static QualityProfile,
        native_bits: u16,
    ) -> (Self, Option<EncodingUnsupported>) {
        let (wire_bits, fallback) = if profile.bit_depth > native_bits {
            let note = EncodingUnsupported {
                requested_bits: profile.bit_depth,
                fallback_bits: 16,
            };
            (16, Some(note))
        } else {
            (profile.bit_depth, None)
        };
        let buffer = Self {
            profile,
            wire_bits,
            chunks: Vec::new(),
            frames: 0,
        };
        (buffer, fallback)
    }

    /// Packs one slice of interleaved samples into an encoded chunk. Empty
    /// slices, a fully paused interval for example, produce no chunk.
    pub fn push_slice(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }
        let chunk = match self.wire_bits {
            24 => pack_s24le(samples),
            _ => pack_s16le(samples),
        };
        self.frames += (samples.len() / self.profile.channels as usize) as u64;
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn wire_bits(&self) -> u16 {
        self.wire_bits
    }

    /// Concatenates every chunk behind a WAV header. Consumes the buffer,
    /// so a finished session cannot leak chunks into the next one.
    pub fn finalize(self) -> UploadPayload {
        let data_len: usize = self.chunks.iter().map(Vec::len).sum();
        let mut bytes = wav_header(
            self.profile.sample_rate,
            self.profile.channels,
            self.wire_bits,
            data_len as u32,
        );
        bytes.reserve(data_len);
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk);
        }
        let audio_duration =
            Duration::from_secs_f64(self.frames as f64 / f64::from(self.profile.sample_rate));
        UploadPayload {
            bytes,
            tier: self.profile.tier,
            sample_rate: self.profile.sample_rate,
            channels: self.profile.channels,
            bit_depth: self.wire_bits,
            audio_duration,
        }
    }
}

fn pack_s16le(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// 24-bit packing widens the 16-bit intermediate into the top bytes.
fn pack_s24le(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 3);
    for &sample in samples {
        let widened = (sample as i32) << 8;
        out.extend_from_slice(&widened.to_le_bytes()[0..3]);
    }
    out
}

/// Canonical 44-byte PCM WAV header.
fn wav_header(sample_rate: u32, channels: u16, bits: u16, data_len: u32) -> Vec<u8> {
    let block_align = channels * (bits / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = Vec::with_capacity(WAV_HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(36 + data_len).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&bits.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityTier;
    use std::io::Cursor;

    #[test]
    fn test_16_bit_packing_width() {
        let (mut buffer, fallback) = ChunkBuffer::new(QualityTier::Medium.profile(), 16);
        assert!(fallback.is_none());
        buffer.push_slice(&[100, -100]);
        assert_eq!(buffer.chunk_count(), 1);
        let payload = buffer.finalize();
        assert_eq!(payload.bytes.len(), 44 + 4);
    }

    #[test]
    fn test_24_bit_falls_back_on_16_bit_native() {
        let (buffer, fallback) = ChunkBuffer::new(QualityTier::High.profile(), 16);
        let note = fallback.unwrap();
        assert_eq!(note.requested_bits, 24);
        assert_eq!(note.fallback_bits, 16);
        assert_eq!(buffer.wire_bits(), 16);
    }

    #[test]
    fn test_24_bit_kept_on_float_native() {
        let (buffer, fallback) = ChunkBuffer::new(QualityTier::High.profile(), 32);
        assert!(fallback.is_none());
        assert_eq!(buffer.wire_bits(), 24);
    }

    #[test]
    fn test_empty_slices_produce_no_chunks() {
        let (mut buffer, _) = ChunkBuffer::new(QualityTier::Low.profile(), 16);
        buffer.push_slice(&[]);
        buffer.push_slice(&[]);
        assert_eq!(buffer.chunk_count(), 0);
        assert!(buffer.finalize().is_empty());
    }

    #[test]
    fn test_payload_tagged_with_profile() {
        let (mut buffer, _) = ChunkBuffer::new(QualityTier::Low.profile(), 16);
        buffer.push_slice(&[1, 2, 3, 4]);
        let payload = buffer.finalize();
        assert_eq!(payload.tier, QualityTier::Low);
        assert_eq!(payload.sample_rate, 22_050);
        assert_eq!(payload.channels, 1);
        assert_eq!(payload.bit_depth, 16);
    }

    #[test]
    fn test_audio_duration_counts_frames() {
        let profile = QualityTier::Medium.profile();
        let (mut buffer, _) = ChunkBuffer::new(profile, 16);
        // 0.1 s of stereo at 44.1 kHz.
        let samples = vec![0i16; (profile.sample_rate / 10) as usize * 2];
        buffer.push_slice(&samples);
        let payload = buffer.finalize();
        assert_eq!(payload.audio_duration, Duration::from_millis(100));
    }

    #[test]
    fn test_finalized_16_bit_payload_decodes() {
        let (mut buffer, _) = ChunkBuffer::new(QualityTier::Medium.profile(), 16);
        buffer.push_slice(&[100, -200]);
        buffer.push_slice(&[300, -400]);
        let payload = buffer.finalize();

        let mut reader = hound::WavReader::new(Cursor::new(payload.bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![100, -200, 300, -400]);
    }

    #[test]
    fn test_finalized_24_bit_payload_decodes() {
        let (mut buffer, _) = ChunkBuffer::new(QualityTier::High.profile(), 32);
        buffer.push_slice(&[1000, -1000]);
        let payload = buffer.finalize();
        assert_eq!(payload.bit_depth, 24);

        let mut reader = hound::WavReader::new(Cursor::new(payload.bytes)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 24);
        let samples: Vec<i32> = reader.samples::<i32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![1000 << 8, (-1000) << 8]);
    }

    #[test]
    fn test_wav_header_layout() {
        let header = wav_header(48_000, 2, 16, 8);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([header[22], header[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([header[24], header[25], header[26], header[27]]),
            48_000
        );
        // byte rate = rate * channels * bytes per sample
        assert_eq!(
            u32::from_le_bytes([header[28], header[29], header[30], header[31]]),
            192_000
        );
        assert_eq!(u16::from_le_bytes([header[34], header[35]]), 16);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes([header[40], header[41], header[42], header[43]]),
            8
        );
    }
}
