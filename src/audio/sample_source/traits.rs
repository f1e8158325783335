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
use std::time::Duration;

use super::error::SampleSourceError;

/// A source of interleaved f32 samples.
pub trait SampleSource: Send {
    /// Returns the next interleaved sample, or None at the end of the source.
    fn next_sample(&mut self) -> Result<Option<f32>, SampleSourceError>;

    /// Get the number of channels in this source
    fn channel_count(&self) -> u16;

    /// Get the sample rate of this source
    fn sample_rate(&self) -> u32;

    /// Get the duration of this source (if known)
    fn duration(&self) -> Option<Duration>;
}

impl SampleSource for Box<dyn SampleSource> {
    fn next_sample(&mut self) -> Result<Option<f32>, SampleSourceError> {
        (**self).next_sample()
    }

    fn channel_count(&self) -> u16 {
        (**self).channel_count()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }
}
