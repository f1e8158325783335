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

use std::{error::Error, fmt};

use serde::Serialize;

/// Sample encoding of an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Integer samples (e.g., 16-bit, 32-bit)
    Int,
    /// IEEE floating point samples
    Float,
}

impl SampleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The wave format negotiated with an output device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveFormat {
    /// Sample encoding.
    pub encoding: SampleFormat,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Number of interleaved output channels.
    pub channels: u16,
}

impl WaveFormat {
    /// Creates a new WaveFormat.
    pub fn new(
        encoding: SampleFormat,
        sample_rate: u32,
        bits_per_sample: u16,
        channels: u16,
    ) -> Result<Self, Box<dyn Error>> {
        if sample_rate == 0 {
            return Err("Sample rate must be greater than 0".into());
        }
        if channels == 0 {
            return Err("Channel count must be greater than 0".into());
        }

        Ok(WaveFormat {
            encoding,
            sample_rate,
            bits_per_sample,
            channels,
        })
    }

    /// IEEE float at the given rate and channel count, the format the mixer
    /// renders in.
    pub fn ieee_float(sample_rate: u32, channels: u16) -> Result<Self, Box<dyn Error>> {
        WaveFormat::new(SampleFormat::Float, sample_rate, 32, channels)
    }

    /// Average bytes per second of the stream.
    pub fn average_bytes_per_second(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Size in bytes of one interleaved frame.
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }
}

impl fmt::Display for WaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bit {} {}Hz, {} channels",
            self.bits_per_sample, self.encoding, self.sample_rate, self.channels
        )
    }
}
