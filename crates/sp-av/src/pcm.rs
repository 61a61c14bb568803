//! Planar PCM buffers and WAV conversion.
//!
//! Samples are stored as `f32` in `[-1.0, 1.0]`, one `Vec` per channel.
//! WAV reading and writing goes through `hound`.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use sp_core::Error;

/// Sample encoding used when writing a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavEncoding {
    /// 16-bit signed integer, the most widely playable form.
    Int16,
    /// 32-bit IEEE float, lossless for our internal samples.
    Float32,
}

/// Decoded audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the sample rate is zero, there are no
    /// channels, or the channels differ in length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> sp_core::Result<Self> {
        if sample_rate == 0 {
            return Err(Error::Validation("sample rate must be positive".into()));
        }
        let Some(first) = channels.first() else {
            return Err(Error::Validation("audio must have at least one channel".into()));
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Error::Validation("channels differ in length".into()));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// A buffer of `frames` zero samples.
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> sp_core::Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Copy frames `[start, end)` into a new buffer with the same layout.
    ///
    /// `end` is clamped to [`frames`](Self::frames); `start >= end` yields an
    /// empty buffer. `self` is left untouched.
    pub fn slice(&self, start: usize, end: usize) -> AudioBuffer {
        let end = end.min(self.frames());
        let start = start.min(end);
        AudioBuffer {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|c| c[start..end].to_vec())
                .collect(),
        }
    }

    /// Join buffers end to end.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `parts` is empty or the parts disagree on
    /// sample rate or channel count.
    pub fn concat(parts: &[AudioBuffer]) -> sp_core::Result<AudioBuffer> {
        let Some(first) = parts.first() else {
            return Err(Error::Validation("nothing to concatenate".into()));
        };
        let mut channels = vec![Vec::new(); first.channel_count()];
        for part in parts {
            if part.sample_rate != first.sample_rate || part.channel_count() != first.channel_count() {
                return Err(Error::Validation("mismatched audio layout".into()));
            }
            for (dst, src) in channels.iter_mut().zip(&part.channels) {
                dst.extend_from_slice(src);
            }
        }
        AudioBuffer::new(first.sample_rate, channels)
    }

    /// Decode a PCM WAV file.
    ///
    /// Integer samples are scaled by `2^(bits-1)`.
    pub fn from_wav_bytes(data: &[u8]) -> sp_core::Result<AudioBuffer> {
        let reader = WavReader::new(Cursor::new(data))
            .map_err(|e| Error::Validation(format!("invalid WAV data: {e}")))?;
        let spec = reader.spec();
        let channel_count = usize::from(spec.channels);
        if channel_count == 0 {
            return Err(Error::Validation("WAV declares zero channels".into()));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, hound::Error>>()
                .map_err(|e| Error::Validation(format!("invalid WAV samples: {e}")))?,
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<f32>, hound::Error>>()
                    .map_err(|e| Error::Validation(format!("invalid WAV samples: {e}")))?
            }
        };

        AudioBuffer::new(spec.sample_rate, deinterleave(&interleaved, channel_count))
    }

    /// Encode as a WAV file in memory.
    pub fn to_wav_bytes(&self, encoding: WavEncoding) -> sp_core::Result<Vec<u8>> {
        let spec = WavSpec {
            channels: u16::try_from(self.channel_count())
                .map_err(|_| Error::Validation("too many channels for WAV".into()))?,
            sample_rate: self.sample_rate,
            bits_per_sample: match encoding {
                WavEncoding::Int16 => 16,
                WavEncoding::Float32 => 32,
            },
            sample_format: match encoding {
                WavEncoding::Int16 => SampleFormat::Int,
                WavEncoding::Float32 => SampleFormat::Float,
            },
        };

        let wav_err = |e: hound::Error| Error::Internal(format!("WAV write failed: {e}"));

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
            for frame in 0..self.frames() {
                for channel in &self.channels {
                    let sample = channel[frame];
                    match encoding {
                        WavEncoding::Int16 => {
                            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            writer.write_sample(scaled).map_err(wav_err)?;
                        }
                        WavEncoding::Float32 => writer.write_sample(sample).map_err(wav_err)?,
                    }
                }
            }
            writer.finalize().map_err(wav_err)?;
        }
        Ok(cursor.into_inner())
    }
}

/// `[L,R,L,R,...]` to `[[L,L,...],[R,R,...]]`. A trailing partial frame is
/// dropped.
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut result = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (dst, &s) in result.iter_mut().zip(frame) {
            dst.push(s);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(sample_rate: u32, channels: usize, frames: usize) -> AudioBuffer {
        let data = (0..channels)
            .map(|c| {
                (0..frames)
                    .map(|i| ((i + c * 7) % 100) as f32 / 100.0 - 0.5)
                    .collect()
            })
            .collect();
        AudioBuffer::new(sample_rate, data).unwrap()
    }

    #[test]
    fn new_validates_layout() {
        assert!(AudioBuffer::new(0, vec![vec![0.0]]).is_err());
        assert!(AudioBuffer::new(44100, vec![]).is_err());
        assert!(AudioBuffer::new(44100, vec![vec![0.0; 3], vec![0.0; 2]]).is_err());
        let ok = AudioBuffer::new(44100, vec![vec![0.0; 3], vec![0.0; 3]]).unwrap();
        assert_eq!(ok.frames(), 3);
        assert_eq!(ok.channel_count(), 2);
    }

    #[test]
    fn duration_from_frames() {
        let buf = AudioBuffer::silent(8000, 1, 16000).unwrap();
        assert_eq!(buf.duration(), 2.0);
    }

    #[test]
    fn slice_copies_and_clamps() {
        let buf = ramp(1000, 2, 50);
        let part = buf.slice(10, 20);
        assert_eq!(part.frames(), 10);
        assert_eq!(part.channel(1).unwrap(), &buf.channel(1).unwrap()[10..20]);

        let tail = buf.slice(40, 500);
        assert_eq!(tail.frames(), 10);

        let empty = buf.slice(30, 20);
        assert!(empty.is_empty());
        assert_eq!(empty.channel_count(), 2);
        assert_eq!(empty.sample_rate(), 1000);

        // Source untouched.
        assert_eq!(buf, ramp(1000, 2, 50));
    }

    #[test]
    fn concat_restores_original() {
        let buf = ramp(1000, 2, 50);
        let joined =
            AudioBuffer::concat(&[buf.slice(0, 13), buf.slice(13, 13), buf.slice(13, 50)]).unwrap();
        assert_eq!(joined, buf);
    }

    #[test]
    fn concat_rejects_mismatch() {
        let a = AudioBuffer::silent(1000, 1, 5).unwrap();
        let b = AudioBuffer::silent(2000, 1, 5).unwrap();
        assert!(AudioBuffer::concat(&[a, b]).is_err());
        assert!(AudioBuffer::concat(&[]).is_err());
    }

    #[test]
    fn wav_float_roundtrip_is_exact() {
        let buf = ramp(22050, 2, 300);
        let bytes = buf.to_wav_bytes(WavEncoding::Float32).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        let back = AudioBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn wav_int16_roundtrip_is_close() {
        let buf = ramp(8000, 1, 100);
        let bytes = buf.to_wav_bytes(WavEncoding::Int16).unwrap();
        let back = AudioBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(back.frames(), 100);
        for (a, b) in back.channel(0).unwrap().iter().zip(buf.channel(0).unwrap()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn empty_buffer_writes_valid_wav() {
        let buf = AudioBuffer::silent(44100, 2, 0).unwrap();
        let bytes = buf.to_wav_bytes(WavEncoding::Int16).unwrap();
        let back = AudioBuffer::from_wav_bytes(&bytes).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.channel_count(), 2);
    }

    #[test]
    fn garbage_is_not_wav() {
        let err = AudioBuffer::from_wav_bytes(b"definitely not a wav").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn deinterleave_splits_channels() {
        let planar = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }
}
