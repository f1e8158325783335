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
// Mixes voices for the cpal output callback.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio::sample_source::SampleSource;

/// Global atomic counter for generating unique voice IDs
static VOICE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A single playing instance of a sample.
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The name of the sample being played, used for logging.
    name: String,
    source: Box<dyn SampleSource>,
    channel_count: u16,
}

impl Voice {
    pub fn new(name: &str, source: Box<dyn SampleSource>) -> Voice {
        let channel_count = source.channel_count();
        Voice {
            id: VOICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            source,
            channel_count,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Mixes active voices into interleaved output buffers.
pub struct AudioMixer {
    voices: Vec<Voice>,
    num_channels: u16,
    /// Voices beyond this count steal the oldest voice.
    max_voices: usize,
    /// Scratch space for one source frame.
    scratch: Vec<f32>,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, max_voices: usize) -> Self {
        Self {
            voices: Vec::new(),
            num_channels,
            max_voices: max_voices.max(1),
            scratch: Vec::new(),
        }
    }

    /// Adds a voice to the mixer. Returns the ID of the voice that was stolen to
    /// make room, if any.
    pub fn add_voice(&mut self, voice: Voice) -> Option<u64> {
        let stolen = if self.voices.len() >= self.max_voices {
            // Voices are kept in start order, so the first is the oldest.
            Some(self.voices.remove(0).id)
        } else {
            None
        };
        self.voices.push(voice);
        stolen
    }

    /// Mixes all active voices into the interleaved output buffer. The buffer is
    /// overwritten. Voices that run out of samples are removed.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        let num_channels = self.num_channels as usize;
        if num_channels == 0 {
            return;
        }

        let scratch = &mut self.scratch;
        self.voices.retain_mut(|voice| {
            let source_channels = voice.channel_count as usize;
            if source_channels == 0 {
                return false;
            }
            scratch.resize(source_channels, 0.0);

            for frame in output.chunks_mut(num_channels) {
                for slot in scratch.iter_mut() {
                    match voice.source.next_sample() {
                        Ok(Some(sample)) => *slot = sample,
                        // A partial frame means the source is exhausted.
                        Ok(None) | Err(_) => return false,
                    }
                }

                if source_channels == 1 {
                    for out in frame.iter_mut() {
                        *out += scratch[0];
                    }
                } else {
                    for (out, sample) in frame.iter_mut().zip(scratch.iter()) {
                        *out += sample;
                    }
                }
            }
            true
        });

        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    /// Drops all voices.
    #[cfg(test)]
    pub fn clear(&mut self) {
        self.voices.clear();
    }

    /// Returns the number of voices still playing.
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }
}
