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
use std::sync::Arc;
use std::time::Duration;

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A sample source that plays interleaved samples held in memory. The data is
/// shared so that every trigger of the same sample avoids a copy.
#[derive(Clone)]
pub struct MemorySampleSource {
    data: Arc<Vec<f32>>,
    position: usize,
    channel_count: u16,
    sample_rate: u32,
    volume: f32,
}

impl MemorySampleSource {
    /// Creates a new memory sample source from interleaved samples.
    #[cfg(test)]
    pub fn new(interleaved_samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        Self::from_shared(Arc::new(interleaved_samples), channel_count, sample_rate, 1.0)
    }

    /// Creates a source over shared sample data, scaled by volume.
    pub fn from_shared(
        data: Arc<Vec<f32>>,
        channel_count: u16,
        sample_rate: u32,
        volume: f32,
    ) -> Self {
        Self {
            data,
            position: 0,
            channel_count,
            sample_rate,
            volume,
        }
    }

    /// Returns the number of frames in the source.
    pub fn total_frames(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.data.len() / self.channel_count as usize
    }
}

impl SampleSource for MemorySampleSource {
    fn next_sample(&mut self) -> Result<Option<f32>, SampleSourceError> {
        match self.data.get(self.position) {
            Some(sample) => {
                self.position += 1;
                Ok(Some(sample * self.volume))
            }
            None => Ok(None),
        }
    }

    fn channel_count(&self) -> u16 {
        self.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Option<Duration> {
        if self.sample_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.total_frames() as f64 / self.sample_rate as f64,
        ))
    }
}
