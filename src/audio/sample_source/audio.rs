// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A sample source that decodes audio files (WAV, OGG, MP3, FLAC, etc.) with symphonia
/// and yields interleaved f32 samples.
pub struct AudioSampleSource {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    // Samples from the last decoded packet.
    sample_buffer: Vec<f32>,
    buffer_position: usize,
    channels: u16,
    sample_rate: u32,
    duration: Option<Duration>,
}

impl SampleSource for AudioSampleSource {
    fn next_sample(&mut self) -> Result<Option<f32>, SampleSourceError> {
        while self.buffer_position >= self.sample_buffer.len() {
            if self.is_finished {
                return Ok(None);
            }
            self.refill_buffer()?;
        }

        let sample = self.sample_buffer[self.buffer_position];
        self.buffer_position += 1;
        Ok(Some(sample))
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl AudioSampleSource {
    /// Opens the given file and prepares its first audio track for decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SampleSourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SampleSourceError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let file_path = path.to_string_lossy().to_string();
        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                SampleSourceError::SampleConversionFailed(format!("'{}': {}", file_path, e))
            })?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                SampleSourceError::SampleConversionFailed(format!(
                    "'{}': no audio track found",
                    file_path
                ))
            })?;
        let track_id = track.id;
        let params = &track.codec_params;

        let sample_rate = params.sample_rate.ok_or_else(|| {
            SampleSourceError::SampleConversionFailed(format!(
                "'{}': sample rate not specified",
                file_path
            ))
        })?;
        let duration = params
            .n_frames
            .map(|n_frames| Duration::from_secs_f64(n_frames as f64 / sample_rate as f64));

        let decoder = get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| {
                SampleSourceError::SampleConversionFailed(format!("'{}': {}", file_path, e))
            })?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);

        let mut source = Self {
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            sample_buffer: Vec::new(),
            buffer_position: 0,
            channels,
            sample_rate,
            duration,
        };

        // Some containers omit the channel layout, so decode the first packet to find it.
        if source.channels == 0 {
            source.refill_buffer()?;
            if source.channels == 0 {
                return Err(SampleSourceError::SampleConversionFailed(format!(
                    "'{}': channels not specified",
                    file_path
                )));
            }
        }

        Ok(source)
    }

    /// Reads the next packet. Returns None at the end of the stream.
    fn read_next_packet(&mut self) -> Result<Option<Packet>, SampleSourceError> {
        match self.format_reader.next_packet() {
            Ok(packet) => Ok(Some(packet)),
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            Err(SymphoniaError::ResetRequired) => {
                self.decoder.reset();
                self.read_next_packet()
            }
            Err(e) => Err(SampleSourceError::AudioError(e)),
        }
    }

    /// Decodes packets until one produces samples for our track, or the stream ends.
    fn refill_buffer(&mut self) -> Result<(), SampleSourceError> {
        self.sample_buffer.clear();
        self.buffer_position = 0;

        loop {
            let packet = match self.read_next_packet()? {
                Some(packet) => packet,
                None => {
                    self.is_finished = true;
                    return Ok(());
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt frames are skipped rather than ending playback.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(SampleSourceError::AudioError(e)),
            };

            let (samples, channels) = Self::decode_buffer_to_f32(decoded);
            if channels > 0 && !samples.is_empty() {
                self.channels = channels as u16;
                self.sample_buffer = samples;
                return Ok(());
            }
        }
    }

    /// Converts a decoded buffer into interleaved f32 samples and its channel count.
    fn decode_buffer_to_f32(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
        match decoded {
            AudioBufferRef::F32(buf) => Self::interleave_planar_samples(&buf, |sample| sample),
            AudioBufferRef::F64(buf) => {
                Self::interleave_planar_samples(&buf, |sample| sample as f32)
            }
            AudioBufferRef::S8(buf) => Self::interleave_planar_samples(&buf, Self::scale_s8),
            AudioBufferRef::S16(buf) => Self::interleave_planar_samples(&buf, Self::scale_s16),
            AudioBufferRef::S24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_s24(sample.inner()))
            }
            AudioBufferRef::S32(buf) => Self::interleave_planar_samples(&buf, Self::scale_s32),
            AudioBufferRef::U8(buf) => Self::interleave_planar_samples(&buf, Self::scale_u8),
            AudioBufferRef::U16(buf) => Self::interleave_planar_samples(&buf, Self::scale_u16),
            AudioBufferRef::U24(buf) => {
                Self::interleave_planar_samples(&buf, |sample| Self::scale_u24(sample.inner()))
            }
            AudioBufferRef::U32(buf) => Self::interleave_planar_samples(&buf, Self::scale_u32),
        }
    }

    fn interleave_planar_samples<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
    where
        T: symphonia::core::sample::Sample,
        F: Fn(T) -> f32,
    {
        let frames = buf.frames();
        let channels = buf.spec().channels.count();
        let planes = buf.planes();
        let mut samples = Vec::with_capacity(frames * channels);
        for frame_idx in 0..frames {
            for ch_idx in 0..channels {
                samples.push(convert(planes.planes()[ch_idx][frame_idx]));
            }
        }
        (samples, channels)
    }

    #[inline]
    pub(crate) fn scale_s8(sample: i8) -> f32 {
        sample as f32 / (1i64 << 7) as f32
    }

    #[inline]
    pub(crate) fn scale_s16(sample: i16) -> f32 {
        sample as f32 / (1i64 << 15) as f32
    }

    #[inline]
    pub(crate) fn scale_s24(sample: i32) -> f32 {
        sample as f32 / (1i64 << 23) as f32
    }

    #[inline]
    pub(crate) fn scale_s32(sample: i32) -> f32 {
        sample as f32 / (1i64 << 31) as f32
    }

    #[inline]
    pub(crate) fn scale_u8(sample: u8) -> f32 {
        (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u16(sample: u16) -> f32 {
        (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u24(sample: u32) -> f32 {
        let max = (1u32 << 24) - 1;
        (sample as f32 / max as f32) * 2.0 - 1.0
    }

    #[inline]
    pub(crate) fn scale_u32(sample: u32) -> f32 {
        (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
