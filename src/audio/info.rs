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
use std::fmt;

use serde::{Deserialize, Serialize};

/// The audio backend family a device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMethod {
    Asio,
    Wasapi,
    Alsa,
    Jack,
    CoreAudio,
    Other,
}

impl OutputMethod {
    /// Maps a cpal host name onto an output method.
    pub fn from_host_name(name: &str) -> OutputMethod {
        match name.to_lowercase().as_str() {
            "asio" => OutputMethod::Asio,
            "wasapi" => OutputMethod::Wasapi,
            "alsa" => OutputMethod::Alsa,
            "jack" => OutputMethod::Jack,
            "coreaudio" => OutputMethod::CoreAudio,
            _ => OutputMethod::Other,
        }
    }
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputMethod::Asio => "ASIO",
            OutputMethod::Wasapi => "WASAPI",
            OutputMethod::Alsa => "ALSA",
            OutputMethod::Jack => "JACK",
            OutputMethod::CoreAudio => "CoreAudio",
            OutputMethod::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

/// Identifies an output device. Persisted in the settings file with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceInfo {
    Asio {
        driver_name: String,
    },
    Wasapi {
        friendly_name: String,
        device_id: String,
    },
    Other {
        output_method: OutputMethod,
        friendly_name: String,
    },
}

impl DeviceInfo {
    /// Builds the info for a device reported by the given output method.
    pub fn new(output_method: OutputMethod, name: &str) -> DeviceInfo {
        match output_method {
            OutputMethod::Asio => DeviceInfo::Asio {
                driver_name: name.to_string(),
            },
            OutputMethod::Wasapi => DeviceInfo::Wasapi {
                friendly_name: name.to_string(),
                device_id: name.to_string(),
            },
            output_method => DeviceInfo::Other {
                output_method,
                friendly_name: name.to_string(),
            },
        }
    }

    pub fn output_method(&self) -> OutputMethod {
        match self {
            DeviceInfo::Asio { .. } => OutputMethod::Asio,
            DeviceInfo::Wasapi { .. } => OutputMethod::Wasapi,
            DeviceInfo::Other { output_method, .. } => *output_method,
        }
    }

    pub fn friendly_name(&self) -> &str {
        match self {
            DeviceInfo::Asio { driver_name } => driver_name,
            DeviceInfo::Wasapi { friendly_name, .. } => friendly_name,
            DeviceInfo::Other { friendly_name, .. } => friendly_name,
        }
    }

    /// The driver-specific name used to find the device again.
    pub fn identifier(&self) -> &str {
        match self {
            DeviceInfo::Asio { driver_name } => driver_name,
            DeviceInfo::Wasapi { device_id, .. } => device_id,
            DeviceInfo::Other { friendly_name, .. } => friendly_name,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.friendly_name(), self.output_method())
    }
}
