//! Audio state representation.
//!
//! An [`AudioSignal`] is the full mixture heard by the agent at one point of
//! an episode. Samples are stored channel-major so that a single channel is a
//! contiguous slice:
//!
//! ```text
//! data = [ch0 f0, ch0 f1, ..., ch0 fN, ch1 f0, ch1 f1, ..., ch1 fN]
//! ```
//!
//! On disk the signal is a 32-bit float WAV file (interleaved, as the format
//! requires). Writing then loading a signal is bit-exact.

use std::path::Path;

use crate::error::{ReplayError, ReplayResult};

/// Multi-channel audio signal with a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    sample_rate: u32,
    num_channels: usize,
    /// Channel-major samples
    data: Vec<f32>,
}

impl AudioSignal {
    /// Create a signal from channel-major samples.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the sample rate or channel count is zero, or if
    /// `data` does not split evenly into `num_channels` channels.
    pub fn new(data: Vec<f32>, num_channels: usize, sample_rate: u32) -> ReplayResult<Self> {
        if sample_rate == 0 {
            return Err(ReplayError::InvalidConfig("sample rate must be positive".to_string()));
        }
        if num_channels == 0 || num_channels > u16::MAX as usize {
            return Err(ReplayError::InvalidConfig(format!(
                "unsupported channel count {}",
                num_channels
            )));
        }
        if data.len() % num_channels != 0 {
            return Err(ReplayError::InvalidConfig(format!(
                "{} samples do not split into {} channels",
                data.len(),
                num_channels
            )));
        }
        Ok(Self {
            sample_rate,
            num_channels,
            data,
        })
    }

    /// Create a mono signal.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> ReplayResult<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Create a signal from one `Vec` per channel. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> ReplayResult<Self> {
        let num_channels = channels.len();
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != frames) {
            return Err(ReplayError::InvalidConfig(
                "channels have different lengths".to_string(),
            ));
        }
        Self::new(channels.into_iter().flatten().collect(), num_channels, sample_rate)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.num_channels
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    pub fn channel(&self, channel: usize) -> &[f32] {
        let frames = self.num_frames();
        &self.data[channel * frames..(channel + 1) * frames]
    }

    /// All samples, channel-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Load a signal from a WAV file.
    ///
    /// Integer PCM is rescaled to `[-1.0, 1.0)`; float PCM is taken as is.
    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => ReplayError::from_io_at(io, path),
            other => ReplayError::Audio(format!("{:?}: {}", path, other)),
        })?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_value))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let num_channels = spec.channels as usize;
        Self::new(deinterleave(&interleaved, num_channels), num_channels, spec.sample_rate)
    }

    /// Write the signal to a 32-bit float WAV file, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> ReplayResult<()> {
        let spec = hound::WavSpec {
            channels: self.num_channels as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        let frames = self.num_frames();
        for frame in 0..frames {
            for ch in 0..self.num_channels {
                writer.write_sample(self.data[ch * frames + frame])?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Convert interleaved samples to channel-major order.
fn deinterleave(interleaved: &[f32], num_channels: usize) -> Vec<f32> {
    if num_channels <= 1 {
        return interleaved.to_vec();
    }
    let frames = interleaved.len() / num_channels;
    let mut out = vec![0.0; frames * num_channels];
    for (i, &sample) in interleaved.iter().take(frames * num_channels).enumerate() {
        let (frame, ch) = (i / num_channels, i % num_channels);
        out[ch * frames + frame] = sample;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stereo_ramp(frames: usize) -> AudioSignal {
        let left: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let right: Vec<f32> = (0..frames).map(|i| -(i as f32) / frames as f32).collect();
        AudioSignal::from_channels(vec![left, right], 8000).unwrap()
    }

    #[test]
    fn test_rejects_uneven_channels() {
        assert!(AudioSignal::new(vec![0.0; 5], 2, 8000).is_err());
        assert!(AudioSignal::new(vec![0.0; 4], 0, 8000).is_err());
        assert!(AudioSignal::new(vec![0.0; 4], 1, 0).is_err());
        assert!(AudioSignal::from_channels(vec![vec![0.0; 3], vec![0.0; 2]], 8000).is_err());
    }

    #[test]
    fn test_channel_layout() {
        let signal = stereo_ramp(4);
        assert_eq!(signal.num_frames(), 4);
        assert_eq!(signal.channel(0), &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(signal.channel(1), &[0.0, -0.25, -0.5, -0.75]);
        assert!((signal.duration_secs() - 4.0 / 8000.0).abs() < 1e-12);
    }

    #[test]
    fn test_wav_round_trip_is_bit_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.wav");
        let signal = stereo_ramp(257);

        signal.write(&path).unwrap();
        let loaded = AudioSignal::load(&path).unwrap();

        assert_eq!(loaded, signal);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.wav");
        match AudioSignal::load(&path) {
            Err(ReplayError::MissingFile(p)) => assert_eq!(p, path),
            other => panic!("expected MissingFile, got {:?}", other),
        }
    }

    #[test]
    fn test_load_int_pcm_is_rescaled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("int.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();

        let loaded = AudioSignal::load(&path).unwrap();
        assert_eq!(loaded.sample_rate(), 16000);
        assert_eq!(loaded.data(), &[0.5, -1.0]);
    }
}
