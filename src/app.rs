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
    io::{BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, span, warn, Level};

use crate::{
    audio::{self, Device, DeviceInfo, DeviceProvider, WaveFormat},
    config::AppSettings,
    console::{self, Command},
    input::InputHook,
    samples::PlaybackEngine,
    trigger::TriggerSession,
};

/// The open device, shared with the termination handler so it can be disposed
/// while the console is blocked.
pub type DeviceSlot = Arc<Mutex<Option<Arc<dyn Device>>>>;

/// What's printed before each trigger session.
#[derive(Serialize)]
struct DisplayInfo<'a> {
    device_info: &'a DeviceInfo,
    wave_format: &'a WaveFormat,
    average_bytes_per_second: u32,
    block_align: u16,
}

/// The console application: device selection, trigger sessions and commands.
pub struct App {
    settings: AppSettings,
    settings_path: PathBuf,
    /// Relative sample paths are resolved against this.
    base_path: PathBuf,
    provider: Arc<dyn DeviceProvider>,
    hook: Arc<dyn InputHook>,
    slot: DeviceSlot,
    engine: Option<PlaybackEngine>,
}

impl App {
    pub fn new(
        settings: AppSettings,
        settings_path: &Path,
        provider: Arc<dyn DeviceProvider>,
        hook: Arc<dyn InputHook>,
        slot: DeviceSlot,
    ) -> App {
        let base_path = settings_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        App {
            settings,
            settings_path: settings_path.to_path_buf(),
            base_path,
            provider,
            hook,
            slot,
            engine: None,
        }
    }

    /// Opens the saved device (or asks for one), then alternates between trigger
    /// sessions and console commands until the operator exits.
    pub fn run<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), Box<dyn Error>>
    where
        R: BufRead,
        W: Write,
    {
        let span = span!(Level::INFO, "app");
        let _enter = span.enter();

        self.open_saved_device()?;

        loop {
            if self.engine.is_none() {
                self.select_device(reader, writer)?;
            }
            let Some(engine) = self.engine.as_ref() else {
                return Err("no output device is open".into());
            };

            let wave_format = engine.wave_format();
            let display_info = DisplayInfo {
                device_info: engine.device().info(),
                wave_format,
                average_bytes_per_second: wave_format.average_bytes_per_second(),
                block_align: wave_format.block_align(),
            };
            writeln!(writer, "Current Info: ")?;
            writeln!(writer, "{}", serde_json::to_string_pretty(&display_info)?)?;

            if let Err(e) = TriggerSession::run(
                self.hook.as_ref(),
                engine,
                self.settings.close_input(),
                writer,
            ) {
                self.close_device();
                return Err(e);
            }

            match console::read_command(reader, writer)? {
                Command::Panel => match engine.device().control_panel() {
                    Some(panel) => writeln!(writer, "{}", panel)?,
                    None => writeln!(writer, "Output method is not ASIO.")?,
                },
                Command::Device => {
                    if console::confirm(
                        reader,
                        writer,
                        "Stop current device and select a new one ? (Y/n) ",
                    )? {
                        self.close_device();
                        self.settings.set_device(None);
                        self.settings.save(&self.settings_path)?;
                    } else {
                        writeln!(writer, "Canceled operation.")?;
                    }
                }
                Command::Exit => {
                    self.close_device();
                    return Ok(());
                }
                Command::Reopen => {}
            }
        }
    }

    /// Opens the device saved in settings, if any. A device that no longer exists
    /// is forgotten so the operator is asked for a new one.
    fn open_saved_device(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(info) = self.settings.device().cloned() else {
            return Ok(());
        };

        match self.open_device(&info) {
            Ok(()) => Ok(()),
            Err(e) if audio::is_device_not_found(e.as_ref()) => {
                warn!(device = %info, err = %e, "Saved device not found, selecting a new one");
                self.settings.set_device(None);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Asks the operator for a device, saves the choice and opens it.
    fn select_device<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), Box<dyn Error>>
    where
        R: BufRead,
        W: Write,
    {
        let devices = self.provider.list()?;
        let Some(info) = console::select_device(&devices, reader, writer)? else {
            return Err("no output devices found".into());
        };

        info!(device = %info, "Selected output device");
        self.settings.set_device(Some(info.clone()));
        self.settings.save(&self.settings_path)?;
        self.open_device(&info)
    }

    fn open_device(&mut self, info: &DeviceInfo) -> Result<(), Box<dyn Error>> {
        let request = self.settings.open_request()?;
        let device = self.provider.open(info, &request)?;
        info!(device = %device, wave_format = %device.wave_format(), "Opened output device");

        *self.slot.lock() = Some(device.clone());
        self.engine = Some(PlaybackEngine::new(device, &self.settings, &self.base_path));
        Ok(())
    }

    fn close_device(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.dispose();
        }
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use super::*;
    use crate::{
        audio::{mock, OutputMethod},
        input::mock::{tap, Hook},
        testutil::write_wav,
    };

    struct Harness {
        dir: tempfile::TempDir,
        provider: Arc<mock::Provider>,
        hook: Arc<Hook>,
        slot: DeviceSlot,
    }

    impl Harness {
        fn new(devices: Vec<DeviceInfo>, sessions: Vec<Vec<crate::input::InputEvent>>) -> Harness {
            Harness::with_hook(devices, Hook::new(sessions))
        }

        fn with_hook(devices: Vec<DeviceInfo>, hook: Hook) -> Harness {
            let dir = tempfile::tempdir().unwrap();
            write_wav(&dir.path().join("hitsound.wav"), &[0, 1, 2], 1, 48000).unwrap();
            Harness {
                dir,
                provider: Arc::new(mock::Provider::new(devices)),
                hook: Arc::new(hook),
                slot: Arc::new(Mutex::new(None)),
            }
        }

        fn settings_path(&self) -> PathBuf {
            self.dir.path().join("appsettings.json")
        }

        fn run(&self, settings: AppSettings, input: &str) -> (Result<(), Box<dyn Error>>, String) {
            let mut app = App::new(
                settings,
                &self.settings_path(),
                self.provider.clone(),
                self.hook.clone(),
                self.slot.clone(),
            );
            let mut reader = BufReader::new(input.as_bytes());
            let mut writer: Vec<u8> = Vec::new();
            let result = app.run(&mut reader, &mut writer);
            (result, String::from_utf8(writer).unwrap())
        }

        fn saved_device(&self) -> Option<DeviceInfo> {
            AppSettings::load(&self.settings_path())
                .unwrap()
                .device()
                .cloned()
        }
    }

    fn asio() -> DeviceInfo {
        DeviceInfo::new(OutputMethod::Asio, "ASIO4ALL v2")
    }

    fn wasapi() -> DeviceInfo {
        DeviceInfo::new(OutputMethod::Wasapi, "Speakers")
    }

    fn with_device(info: DeviceInfo) -> AppSettings {
        let mut settings = AppSettings::default();
        settings.set_device(Some(info));
        settings
    }

    #[test]
    fn test_select_play_and_exit() {
        let harness = Harness::new(vec![wasapi(), asio()], vec![tap("KeyZ")]);
        let (result, output) = harness.run(AppSettings::default(), "\n\nexit\n");
        result.unwrap();

        assert!(output.contains("Select output method: (default 2) "));
        assert!(output.contains("Current Info: \n{\n"));
        assert!(output.contains(r#""driver_name": "ASIO4ALL v2""#));
        assert!(output.contains(r#""encoding": "float""#));
        assert!(output.contains(r#""average_bytes_per_second": 384000"#));

        let opened = harness.provider.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].played(), vec!["hitsound.wav"]);
        assert!(opened[0].is_disposed());
        assert!(harness.slot.lock().is_none());
        assert_eq!(harness.saved_device(), Some(asio()));
    }

    #[test]
    fn test_saved_device_skips_menu() {
        let harness = Harness::new(vec![wasapi(), asio()], vec![]);
        let (result, output) = harness.run(with_device(wasapi()), "exit\n");
        result.unwrap();

        assert!(!output.contains("Select output method"));
        assert_eq!(harness.provider.opened()[0].info(), &wasapi());
    }

    #[test]
    fn test_missing_saved_device_falls_back_to_menu() {
        let harness = Harness::new(vec![wasapi()], vec![]);
        let (result, output) = harness.run(with_device(asio()), "\n\nexit\n");
        result.unwrap();

        assert!(output.contains("Select output method: (default 1) "));
        assert_eq!(harness.provider.opened()[0].info(), &wasapi());
        assert_eq!(harness.saved_device(), Some(wasapi()));
    }

    #[test]
    fn test_no_devices_is_an_error() {
        let harness = Harness::new(vec![], vec![]);
        let (result, _) = harness.run(AppSettings::default(), "\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_device_command_reselects() {
        let harness = Harness::new(vec![wasapi(), asio()], vec![]);
        let (result, output) = harness.run(AppSettings::default(), "\n\ndevice\nY\n1\n\nexit\n");
        result.unwrap();

        assert!(output.contains("Stop current device and select a new one ? (Y/n) "));
        let opened = harness.provider.opened();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].info(), &asio());
        assert!(opened[0].is_disposed());
        assert_eq!(opened[1].info(), &wasapi());
        assert_eq!(harness.saved_device(), Some(wasapi()));
    }

    #[test]
    fn test_device_command_at_eof_reselects_default() {
        let harness = Harness::new(vec![asio()], vec![]);
        let (result, _) = harness.run(with_device(asio()), "device\nY\n");

        // The menu accepts the default at EOF, then the command prompt exits.
        result.unwrap();
        assert_eq!(harness.provider.opened().len(), 2);
        assert_eq!(harness.saved_device(), Some(asio()));
    }

    #[test]
    fn test_device_command_canceled() {
        let harness = Harness::new(vec![asio()], vec![]);
        let (result, output) = harness.run(with_device(asio()), "device\nn\nexit\n");
        result.unwrap();

        assert!(output.contains("Canceled operation."));
        assert_eq!(harness.provider.opened().len(), 1);
    }

    #[test]
    fn test_panel_command() {
        let harness = Harness::new(vec![asio()], vec![]);
        let (result, output) = harness.run(with_device(asio()), "panel\nexit\n");
        result.unwrap();
        assert!(output.contains("ASIO driver: ASIO4ALL v2"));

        let harness = Harness::new(vec![wasapi()], vec![]);
        let (result, output) = harness.run(with_device(wasapi()), "panel\nexit\n");
        result.unwrap();
        assert!(output.contains("Output method is not ASIO."));
    }

    #[test]
    fn test_other_input_reopens_session() {
        let harness = Harness::new(vec![asio()], vec![tap("KeyZ"), tap("KeyX")]);
        let (result, _) = harness.run(with_device(asio()), "again\nexit\n");
        result.unwrap();

        assert_eq!(harness.hook.subscriptions(), 2);
        assert_eq!(harness.provider.opened()[0].played().len(), 2);
    }

    #[test]
    fn test_stopped_listener_ends_run() {
        let harness = Harness::with_hook(vec![asio()], Hook::stopping_after(vec![tap("KeyZ")]));
        let (result, output) = harness.run(with_device(asio()), "again\nexit\n");

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("global input listener stopped"));
        assert_eq!(output.matches("Listening to").count(), 2);
        assert_eq!(output.matches("to close the program.").count(), 1);
        assert!(harness.provider.opened()[0].is_disposed());
        assert!(harness.slot.lock().is_none());
    }

    #[test]
    fn test_eof_exits() {
        let harness = Harness::new(vec![asio()], vec![]);
        let (result, _) = harness.run(with_device(asio()), "");
        result.unwrap();

        assert!(harness.provider.opened()[0].is_disposed());
        assert!(harness.slot.lock().is_none());
    }
}
