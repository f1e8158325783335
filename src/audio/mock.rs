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
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::info;

use crate::audio::{
    AudioError, Device as AudioDevice, DeviceInfo, DeviceProvider, OpenRequest, OutputMethod,
    Voice, WaveFormat,
};

/// A mock device. Doesn't actually play anything, but remembers what it was asked to play.
pub struct Device {
    info: DeviceInfo,
    wave_format: WaveFormat,
    played: Mutex<Vec<String>>,
    disposed: AtomicBool,
}

impl Device {
    pub fn new(info: DeviceInfo, wave_format: WaveFormat) -> Device {
        Device {
            info,
            wave_format,
            played: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// The names of every voice played so far.
    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Relaxed)
    }
}

impl AudioDevice for Device {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn wave_format(&self) -> &WaveFormat {
        &self.wave_format
    }

    fn play(&self, voice: Voice) -> Result<(), Box<dyn Error>> {
        if self.is_disposed() {
            return Err(AudioError::Disposed(self.info.friendly_name().to_string()).into());
        }
        info!(device = self.info.friendly_name(), voice = voice.name(), "Playing voice.");
        self.played.lock().push(voice.name().to_string());
        Ok(())
    }

    fn control_panel(&self) -> Option<String> {
        match self.info.output_method() {
            OutputMethod::Asio => Some(format!("ASIO driver: {}", self.info.friendly_name())),
            _ => None,
        }
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Relaxed);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.info.friendly_name())
    }
}

/// A provider over a fixed list of mock devices.
pub struct Provider {
    devices: Vec<DeviceInfo>,
    opened: Mutex<Vec<Arc<Device>>>,
}

impl Provider {
    pub fn new(devices: Vec<DeviceInfo>) -> Provider {
        Provider {
            devices,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Every device opened through this provider, oldest first.
    pub fn opened(&self) -> Vec<Arc<Device>> {
        self.opened.lock().clone()
    }
}

impl DeviceProvider for Provider {
    fn list(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        Ok(self.devices.clone())
    }

    fn open(
        &self,
        info: &DeviceInfo,
        request: &OpenRequest,
    ) -> Result<Arc<dyn AudioDevice>, Box<dyn Error>> {
        if !self.devices.contains(info) {
            return Err(AudioError::DeviceNotFound(info.identifier().to_string()).into());
        }
        let device = Arc::new(Device::new(
            info.clone(),
            WaveFormat::ieee_float(request.sample_rate, request.channels)?,
        ));
        self.opened.lock().push(device.clone());
        Ok(device)
    }
}
