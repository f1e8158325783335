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
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, error, info, span, warn, Level};

use super::loader::{LoadedSample, SampleLoader};
use crate::{
    audio::{Device, Voice, WaveFormat},
    config::AppSettings,
};

/// A sample ready to play for one input.
struct BoundSample {
    /// The file name shown in logs.
    name: String,
    sample: LoadedSample,
    volume: f32,
}

/// Plays the bound samples on an open output device.
pub struct PlaybackEngine {
    device: Arc<dyn Device>,
    bindings: HashMap<String, BoundSample>,
}

impl PlaybackEngine {
    /// Loads every bound sample at the device's sample rate. Relative paths are
    /// resolved against base_path. Bindings whose file can't be loaded are skipped.
    pub fn new(device: Arc<dyn Device>, settings: &AppSettings, base_path: &Path) -> PlaybackEngine {
        let span = span!(Level::INFO, "playback engine");
        let _enter = span.enter();

        let mut loader = SampleLoader::new(device.wave_format().sample_rate);
        let mut bindings = HashMap::new();

        for binding in settings.bindings() {
            if bindings.contains_key(binding.input()) {
                warn!(input = binding.input(), "Input is bound more than once, keeping the first");
                continue;
            }

            let file = binding.file_or(settings.hitsound());
            let path = resolve_path(base_path, file);
            let sample = match loader.load(&path) {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(input = binding.input(), path = ?path, err = %e, "Skipping binding");
                    continue;
                }
            };

            bindings.insert(
                binding.input().to_string(),
                BoundSample {
                    name: file.to_string(),
                    sample,
                    volume: binding.volume_or(settings.volume()),
                },
            );
        }

        info!(
            device = %device,
            bindings = bindings.len(),
            samples = loader.cached_count(),
            memory_kb = loader.total_memory_usage() / 1024,
            "Playback engine ready"
        );

        PlaybackEngine { device, bindings }
    }

    /// Starts the sample bound to the input. Returns false if the input isn't
    /// bound or the device refused the voice.
    pub fn trigger(&self, input: &str) -> bool {
        let Some(bound) = self.bindings.get(input) else {
            debug!(input, "Input not bound");
            return false;
        };

        let voice = Voice::new(&bound.name, Box::new(bound.sample.create_source(bound.volume)));
        match self.device.play(voice) {
            Ok(()) => true,
            Err(e) => {
                error!(input, err = %e, "Unable to play sample");
                false
            }
        }
    }

    #[cfg(test)]
    pub fn is_bound(&self, input: &str) -> bool {
        self.bindings.contains_key(input)
    }

    /// The bound inputs, sorted by name.
    pub fn bound_inputs(&self) -> Vec<&str> {
        let mut inputs: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        inputs.sort();
        inputs
    }

    pub fn wave_format(&self) -> &WaveFormat {
        self.device.wave_format()
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Stops the output device.
    pub fn dispose(&self) {
        info!(device = %self.device, "Disposing output device");
        self.device.dispose();
    }
}

fn resolve_path(base_path: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_path.join(path)
    }
}
