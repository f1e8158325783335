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
    fs,
    io::{self, BufRead, Write},
    path::Path,
    time::Duration,
};

use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::{info, span, warn, Level};

use super::{bindings::TriggerBinding, error::SettingsError};
use crate::{
    audio::{DeviceInfo, OpenRequest},
    console,
};

const DEFAULT_LATENCY: &str = "5ms";
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_CHANNEL_COUNT: u16 = 2;
const DEFAULT_VOLUME: f32 = 1.0;
const DEFAULT_HITSOUND: &str = "hitsound.wav";
const DEFAULT_BINDINGS: [&str; 2] = ["KeyZ", "KeyX"];
const DEFAULT_CLOSE_INPUT: &str = "ScrollLock";
const DEFAULT_MAX_VOICES: usize = 32;

/// The persisted application settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// The last selected output device.
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<DeviceInfo>,

    /// The requested output latency, e.g. "5ms".
    latency: String,

    /// The requested sample rate in Hz.
    sample_rate: u32,

    /// The requested number of output channels.
    channel_count: u16,

    /// The global volume (0.0 to 1.0).
    volume: f32,

    /// The sample played by bindings that don't name their own file.
    hitsound: String,

    /// Inputs that trigger a sample.
    bindings: Vec<TriggerBinding>,

    /// The input that closes the trigger session.
    close_input: String,

    /// Maximum number of voices playing at once.
    max_voices: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            device: None,
            latency: DEFAULT_LATENCY.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: DEFAULT_CHANNEL_COUNT,
            volume: DEFAULT_VOLUME,
            hitsound: DEFAULT_HITSOUND.to_string(),
            bindings: DEFAULT_BINDINGS
                .iter()
                .map(|input| TriggerBinding::new(input))
                .collect(),
            close_input: DEFAULT_CLOSE_INPUT.to_string(),
            max_voices: DEFAULT_MAX_VOICES,
        }
    }
}

impl AppSettings {
    /// Loads and validates the settings at the given path.
    pub fn load(path: &Path) -> Result<AppSettings, SettingsError> {
        // Bytes that aren't UTF-8 are a parse error, not an I/O one.
        let contents = fs::read(path)?;
        let settings: AppSettings = serde_json::from_slice(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads the settings, creating them if the file doesn't exist. If the file
    /// can't be parsed, the operator is asked whether to replace it with the
    /// defaults. Returns None if they decline, in which case the file is left alone.
    pub fn load_or_create<R, W>(
        path: &Path,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<Option<AppSettings>, SettingsError>
    where
        R: BufRead,
        W: Write,
    {
        let span = span!(Level::INFO, "settings", path = %path.display());
        let _enter = span.enter();

        match AppSettings::load(path) {
            Ok(settings) => Ok(Some(settings)),
            Err(SettingsError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("Settings not found, creating defaults");
                let settings = AppSettings::default();
                settings.save(path)?;
                Ok(Some(settings))
            }
            Err(e) if e.is_malformed() => {
                warn!(err = %e, "Unable to load settings");
                let prompt = format!(
                    "Error occurs while loading settings:\n{}\nGenerate a new one? (Y/n) ",
                    e
                );
                if !console::confirm(reader, writer, &prompt)? {
                    return Ok(None);
                }
                let settings = AppSettings::default();
                settings.save(path)?;
                Ok(Some(settings))
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the settings as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut contents = serde_json::to_string_pretty(self)?;
        contents.push('\n');
        fs::write(path, contents)?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Checks values serde can't.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.sample_rate == 0 {
            return Err(SettingsError::Invalid("sample_rate must be positive".into()));
        }
        if self.channel_count == 0 {
            return Err(SettingsError::Invalid("channel_count must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(SettingsError::Invalid(format!(
                "volume {} is outside 0.0 to 1.0",
                self.volume
            )));
        }
        if self.max_voices == 0 {
            return Err(SettingsError::Invalid("max_voices must be at least 1".into()));
        }
        self.latency()?;
        Ok(())
    }

    pub fn device(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    pub fn set_device(&mut self, device: Option<DeviceInfo>) {
        self.device = device;
    }

    /// The requested output latency.
    pub fn latency(&self) -> Result<Duration, SettingsError> {
        DurationString::from_string(self.latency.clone())
            .map(Into::into)
            .map_err(|e| SettingsError::Latency(self.latency.clone(), e.to_string()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn hitsound(&self) -> &str {
        &self.hitsound
    }

    pub fn bindings(&self) -> &[TriggerBinding] {
        &self.bindings
    }

    pub fn close_input(&self) -> &str {
        &self.close_input
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// What to ask the output device for.
    pub fn open_request(&self) -> Result<OpenRequest, SettingsError> {
        Ok(OpenRequest {
            sample_rate: self.sample_rate,
            channels: self.channel_count,
            latency: self.latency()?,
            max_voices: self.max_voices,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use super::*;
    use crate::audio::OutputMethod;

    fn load_with_input(
        path: &Path,
        input: &str,
    ) -> (Result<Option<AppSettings>, SettingsError>, String) {
        let mut reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let result = AppSettings::load_or_create(path, &mut reader, &mut writer);
        (result, String::from_utf8(writer).unwrap())
    }

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.device(), None);
        assert_eq!(settings.latency().unwrap(), Duration::from_millis(5));
        assert_eq!(settings.sample_rate(), 48000);
        assert_eq!(settings.channel_count(), 2);
        assert_eq!(settings.volume(), 1.0);
        assert_eq!(settings.hitsound(), "hitsound.wav");
        let inputs: Vec<&str> = settings.bindings().iter().map(|b| b.input()).collect();
        assert_eq!(inputs, vec!["KeyZ", "KeyX"]);
        assert_eq!(settings.close_input(), "ScrollLock");
        assert_eq!(settings.max_voices(), 32);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("appsettings.json");

        let (result, output) = load_with_input(&path, "");
        assert_eq!(result.unwrap(), Some(AppSettings::default()));
        assert!(output.is_empty());
        assert_eq!(AppSettings::load(&path).unwrap(), AppSettings::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        fs::write(&path, r#"{"latency": "10ms", "hitsound": "clap.wav"}"#).unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.latency().unwrap(), Duration::from_millis(10));
        assert_eq!(settings.hitsound(), "clap.wav");
        assert_eq!(settings.sample_rate(), 48000);
    }

    #[test]
    fn test_malformed_file_regenerated_on_yes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        fs::write(&path, "{ not json").unwrap();

        let (result, output) = load_with_input(&path, "Y\n");
        assert_eq!(result.unwrap(), Some(AppSettings::default()));
        assert!(output.starts_with("Error occurs while loading settings:\n"));
        assert!(output.ends_with("\nGenerate a new one? (Y/n) "));
        assert_eq!(AppSettings::load(&path).unwrap(), AppSettings::default());
    }

    #[test]
    fn test_malformed_file_untouched_on_no() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        fs::write(&path, "{ not json").unwrap();

        for input in ["n\n", "y\n", "", "\n"] {
            let (result, _) = load_with_input(&path, input);
            assert_eq!(result.unwrap(), None, "input {:?}", input);
            assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
        }
    }

    #[test]
    fn test_non_utf8_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        let contents = b"{\"latency\": \"\xff\xfe\"}";
        fs::write(&path, contents).unwrap();

        let (result, output) = load_with_input(&path, "n\n");
        assert_eq!(result.unwrap(), None);
        assert!(output.starts_with("Error occurs while loading settings:\n"));
        assert_eq!(fs::read(&path).unwrap(), contents);

        let (result, _) = load_with_input(&path, "Y\n");
        assert_eq!(result.unwrap(), Some(AppSettings::default()));
        assert_eq!(AppSettings::load(&path).unwrap(), AppSettings::default());
    }

    #[test]
    fn test_invalid_values_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");

        for contents in [
            r#"{"latency": "soon"}"#,
            r#"{"volume": 1.5}"#,
            r#"{"sample_rate": 0}"#,
            r#"{"channel_count": 0}"#,
            r#"{"max_voices": 0}"#,
        ] {
            fs::write(&path, contents).unwrap();
            let err = AppSettings::load(&path).unwrap_err();
            assert!(err.is_malformed(), "contents {}", contents);

            let (result, output) = load_with_input(&path, "n\n");
            assert_eq!(result.unwrap(), None);
            assert!(output.contains("Generate a new one?"));
        }
    }

    #[test]
    fn test_save_round_trip_with_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");

        let mut settings = AppSettings::default();
        settings.set_device(Some(DeviceInfo::new(OutputMethod::Asio, "ASIO4ALL v2")));
        settings.save(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains(r#""type": "Asio""#));
        assert_eq!(AppSettings::load(&path).unwrap(), settings);

        settings.set_device(None);
        settings.save(&path).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("device"));
    }

    #[test]
    fn test_open_request() {
        let request = AppSettings::default().open_request().unwrap();
        assert_eq!(
            request,
            OpenRequest {
                sample_rate: 48000,
                channels: 2,
                latency: Duration::from_millis(5),
                max_voices: 32,
            }
        );
    }
}
