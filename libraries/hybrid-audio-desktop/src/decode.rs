//! Whole-file decoding with Symphonia
//!
//! Tracks are fetched completely before playback, so decoding works on an
//! in-memory byte buffer and produces interleaved f32 samples. The output
//! is then remixed and resampled to the device configuration.

use crate::error::{AudioError, Result};
use std::io::{Cursor, ErrorKind};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Convert to the given channel count and sample rate
    #[must_use]
    pub fn into_format(self, channels: u16, sample_rate: u32) -> DecodedAudio {
        let remixed = remix(&self.samples, self.channels, channels);
        let samples = resample_linear(&remixed, channels, self.sample_rate, sample_rate);
        DecodedAudio {
            samples,
            channels,
            sample_rate,
        }
    }
}

/// Decode a complete audio file held in memory
///
/// `extension` (without the dot) helps format detection.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::UnsupportedFormat("no audio track found".into()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut samples = Vec::new();
    let mut signal = None;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut buf_frames = 0u64;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let packet_signal = *decoded.spec();
        let frames = decoded.capacity() as u64;
        if sample_buf.is_none() || buf_frames < frames {
            sample_buf = Some(SampleBuffer::new(frames, packet_signal));
            buf_frames = frames;
        }
        signal.get_or_insert(packet_signal);

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let signal = signal.ok_or_else(|| AudioError::Decode("no audio decoded".into()))?;
    let channels = u16::try_from(signal.channels.count())
        .map_err(|_| AudioError::UnsupportedFormat("too many channels".into()))?;

    let audio = DecodedAudio {
        samples,
        channels,
        sample_rate: signal.rate,
    };
    debug!(
        channels,
        sample_rate = signal.rate,
        duration = audio.duration(),
        "Decoded audio"
    );
    Ok(audio)
}

/// Convert interleaved samples between channel counts
///
/// Down to mono averages all channels; other reductions keep the first
/// channels; expansions repeat the source channels.
pub fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let (from, to) = (usize::from(from.max(1)), usize::from(to.max(1)));
    if from == to {
        return samples.to_vec();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|c| frame[c % from]));
        }
    }
    out
}

/// Linear-interpolation sample rate conversion of interleaved samples
pub fn resample_linear(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.len() < channels {
        return samples.to_vec();
    }

    let frames_in = samples.len() / channels;
    let frames_out = (frames_in as u64 * u64::from(to_rate)).div_ceil(u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);

    let mut out = Vec::with_capacity(frames_out * channels);
    for i in 0..frames_out {
        let pos = i as f64 * step;
        let index = (pos.floor() as usize).min(frames_in - 1);
        let next = (index + 1).min(frames_in - 1);
        let frac = (pos - index as f64) as f32;

        for c in 0..channels {
            let a = samples[index * channels + c];
            let b = samples[next * channels + c];
            out.push(a + (b - a) * frac);
        }
    }
    out
}
