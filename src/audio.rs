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
use std::{error::Error, fmt, sync::Arc, time::Duration};

pub mod cpal;
pub mod format;
pub mod info;
pub mod mixer;
#[cfg(test)]
pub mod mock;
pub mod sample_source;

pub use format::{SampleFormat, WaveFormat};
pub use info::{DeviceInfo, OutputMethod};
pub use mixer::Voice;

/// Typed audio errors that callers react to, rather than just report.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no device found with name {0}")]
    DeviceNotFound(String),

    #[error("output method {0} is not available on this system")]
    HostUnavailable(OutputMethod),

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("device {0} has been disposed")]
    Disposed(String),
}

/// What the caller would like the device to be opened with. The device may
/// negotiate something different, see [`Device::wave_format`].
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub sample_rate: u32,
    pub channels: u16,
    pub latency: Duration,
    pub max_voices: usize,
}

/// An open output device.
pub trait Device: fmt::Display + Send + Sync {
    /// The info used to open this device.
    fn info(&self) -> &DeviceInfo;

    /// The wave format negotiated with the device.
    fn wave_format(&self) -> &WaveFormat;

    /// Starts playing the given voice. Fails once the device is disposed.
    fn play(&self, voice: Voice) -> Result<(), Box<dyn Error>>;

    /// A description of the driver's control panel, or None if the output
    /// method has none.
    fn control_panel(&self) -> Option<String>;

    /// Stops the output stream. Safe to call more than once.
    fn dispose(&self);
}

/// Enumerates and opens output devices.
pub trait DeviceProvider: Send + Sync {
    /// Lists every output device on every available output method.
    fn list(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error>>;

    /// Opens the device described by info.
    fn open(
        &self,
        info: &DeviceInfo,
        request: &OpenRequest,
    ) -> Result<Arc<dyn Device>, Box<dyn Error>>;
}

/// Returns the provider backed by cpal.
pub fn provider() -> Arc<dyn DeviceProvider> {
    Arc::new(cpal::Provider {})
}

/// Returns true if the error means the device no longer exists.
pub fn is_device_not_found(err: &(dyn Error + 'static)) -> bool {
    matches!(
        err.downcast_ref::<AudioError>(),
        Some(AudioError::DeviceNotFound(_)) | Some(AudioError::HostUnavailable(_))
    )
}
