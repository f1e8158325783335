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
use serde::{Deserialize, Serialize};

/// Binds a global input to a sample.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TriggerBinding {
    /// The input name, e.g. `KeyZ`, `Space` or `MouseLeft`.
    input: String,

    /// The sample file to play. The hitsound is used when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,

    /// Volume for this binding (0.0 to 1.0). The global volume is used when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<f32>,
}

impl TriggerBinding {
    /// Creates a binding that plays the hitsound at the global volume.
    pub fn new(input: &str) -> TriggerBinding {
        TriggerBinding {
            input: input.to_string(),
            file: None,
            volume: None,
        }
    }

    /// Sets the file this binding plays.
    #[cfg(test)]
    pub fn with_file(mut self, file: &str) -> TriggerBinding {
        self.file = Some(file.to_string());
        self
    }

    /// Sets the volume for this binding.
    #[cfg(test)]
    pub fn with_volume(mut self, volume: f32) -> TriggerBinding {
        self.volume = Some(volume);
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// The file to play, falling back to the given hitsound.
    pub fn file_or<'a>(&'a self, hitsound: &'a str) -> &'a str {
        self.file.as_deref().unwrap_or(hitsound)
    }

    /// The volume to play at, falling back to the global volume.
    pub fn volume_or(&self, global: f32) -> f32 {
        self.volume.unwrap_or(global).clamp(0.0, 1.0)
    }
}
