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
use std::{error::Error, fmt, sync::Arc, thread, time::Duration};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level};

use crate::audio::mixer::{AudioMixer, Voice};
use crate::audio::{
    AudioError, Device as AudioDevice, DeviceInfo, DeviceProvider, OpenRequest, OutputMethod,
    SampleFormat, WaveFormat,
};

/// How long to wait for the output thread to report that the stream is running.
const BUILD_STREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens output devices through cpal.
pub struct Provider {}

impl DeviceProvider for Provider {
    fn list(&self) -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        // Suppress noisy driver output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<DeviceInfo> = Vec::new();
        for host_id in cpal::available_hosts() {
            let output_method = OutputMethod::from_host_name(host_id.name());
            let host_devices = match cpal::host_from_id(host_id)
                .map_err(|e| e.to_string())
                .and_then(|host| host.output_devices().map_err(|e| e.to_string()))
            {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(err = e, host = host_id.name(), "Unable to list devices for host");
                    continue;
                }
            };

            for device in host_devices {
                let Ok(name) = device.name() else {
                    continue;
                };
                let has_outputs = device
                    .supported_output_configs()
                    .map(|mut configs| configs.next().is_some())
                    .unwrap_or(false);
                if has_outputs {
                    devices.push(DeviceInfo::new(output_method, name.trim()));
                }
            }
        }

        Ok(devices)
    }

    fn open(
        &self,
        info: &DeviceInfo,
        request: &OpenRequest,
    ) -> Result<Arc<dyn AudioDevice>, Box<dyn Error>> {
        Ok(Arc::new(Device::open(info, request)?))
    }
}

/// A supported output configuration, reduced to what format negotiation needs.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConfigCandidate {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    pub sample_format: cpal::SampleFormat,
    /// Supported buffer sizes in frames, if the backend reports them.
    pub buffer_range: Option<(u32, u32)>,
}

impl From<&cpal::SupportedStreamConfigRange> for ConfigCandidate {
    fn from(range: &cpal::SupportedStreamConfigRange) -> Self {
        ConfigCandidate {
            channels: range.channels(),
            min_sample_rate: range.min_sample_rate().0,
            max_sample_rate: range.max_sample_rate().0,
            sample_format: range.sample_format(),
            buffer_range: buffer_range(range.buffer_size()),
        }
    }
}

fn buffer_range(buffer_size: &cpal::SupportedBufferSize) -> Option<(u32, u32)> {
    match buffer_size {
        cpal::SupportedBufferSize::Range { min, max } => Some((*min, *max)),
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Ranks sample formats the mixer can render to. Lower is better.
fn format_rank(sample_format: cpal::SampleFormat) -> Option<u8> {
    match sample_format {
        cpal::SampleFormat::F32 => Some(0),
        cpal::SampleFormat::I32 => Some(1),
        cpal::SampleFormat::I16 => Some(2),
        cpal::SampleFormat::U16 => Some(3),
        _ => None,
    }
}

/// Picks the best candidate that carries exactly the requested channel count and
/// whose rate range contains the requested rate.
pub(crate) fn negotiate(
    candidates: &[ConfigCandidate],
    sample_rate: u32,
    channels: u16,
) -> Option<&ConfigCandidate> {
    candidates
        .iter()
        .filter(|c| {
            c.channels == channels
                && c.min_sample_rate <= sample_rate
                && sample_rate <= c.max_sample_rate
        })
        .filter_map(|c| format_rank(c.sample_format).map(|rank| (rank, c)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, c)| c)
}

/// Converts a latency into a buffer size in frames, clamped to the supported range.
pub(crate) fn buffer_frames(latency: Duration, sample_rate: u32, range: Option<(u32, u32)>) -> u32 {
    let frames = (latency.as_secs_f64() * sample_rate as f64).round().max(1.0) as u32;
    match range {
        Some((min, max)) if min <= max => frames.clamp(min, max),
        _ => frames,
    }
}

fn wave_format_for(
    sample_format: cpal::SampleFormat,
    sample_rate: u32,
    channels: u16,
) -> Result<WaveFormat, Box<dyn Error>> {
    let encoding = if sample_format.is_float() {
        SampleFormat::Float
    } else {
        SampleFormat::Int
    };
    WaveFormat::new(
        encoding,
        sample_rate,
        (sample_format.sample_size() * 8) as u16,
        channels,
    )
}

/// The output thread that owns the cpal stream. cpal streams are not Send on
/// every backend, so the stream lives and dies on this thread.
struct OutputThread {
    shutdown_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// A cpal output device with a running stream.
pub struct Device {
    info: DeviceInfo,
    host_name: &'static str,
    wave_format: WaveFormat,
    /// Fixed buffer size the stream was requested with, if any.
    buffer_frames: Option<u32>,
    /// Every configuration the device reported, kept for the control panel.
    candidates: Vec<ConfigCandidate>,
    voice_tx: Sender<Voice>,
    output: Mutex<Option<OutputThread>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.info.friendly_name(),
            self.wave_format.channels,
            self.host_name
        )
    }
}

impl Device {
    /// Finds the device described by info and starts an output stream on it.
    pub fn open(info: &DeviceInfo, request: &OpenRequest) -> Result<Device, Box<dyn Error>> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let host_id = cpal::available_hosts()
            .into_iter()
            .find(|id| OutputMethod::from_host_name(id.name()) == info.output_method())
            .ok_or(AudioError::HostUnavailable(info.output_method()))?;
        let host = cpal::host_from_id(host_id)?;
        let device = host
            .output_devices()?
            .find(|device| {
                device
                    .name()
                    .is_ok_and(|name| name.trim() == info.identifier())
            })
            .ok_or_else(|| AudioError::DeviceNotFound(info.identifier().to_string()))?;

        let candidates: Vec<ConfigCandidate> = device
            .supported_output_configs()?
            .map(|range| ConfigCandidate::from(&range))
            .collect();

        let (sample_format, sample_rate, channels, range) =
            match negotiate(&candidates, request.sample_rate, request.channels) {
                Some(candidate) => (
                    candidate.sample_format,
                    request.sample_rate,
                    request.channels,
                    candidate.buffer_range,
                ),
                None => {
                    let default = device.default_output_config()?;
                    warn!(
                        requested_rate = request.sample_rate,
                        requested_channels = request.channels,
                        rate = default.sample_rate().0,
                        channels = default.channels(),
                        "Requested format not supported, using the device default"
                    );
                    (
                        default.sample_format(),
                        default.sample_rate().0,
                        default.channels(),
                        buffer_range(default.buffer_size()),
                    )
                }
            };

        if format_rank(sample_format).is_none() {
            return Err(AudioError::UnsupportedFormat(format!("{:?}", sample_format)).into());
        }

        let wave_format = wave_format_for(sample_format, sample_rate, channels)?;
        let frames = buffer_frames(request.latency, sample_rate, range);
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(frames),
        };

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (output, buffer_frames) = start_output_thread(
            device,
            config,
            sample_format,
            voice_rx,
            request.max_voices,
        )?;

        info!(
            device = info.friendly_name(),
            host = host_id.name(),
            format = %wave_format,
            buffer_frames,
            "Output stream started"
        );

        Ok(Device {
            info: info.clone(),
            host_name: host_id.name(),
            wave_format,
            buffer_frames,
            candidates,
            voice_tx,
            output: Mutex::new(Some(output)),
        })
    }
}

/// Builds a stream that mixes voices received on voice_rx, converting to T.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice_rx: Receiver<Voice>,
    max_voices: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut mixer = AudioMixer::new(config.channels, max_voices);
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(voice) = voice_rx.try_recv() {
                if let Some(stolen) = mixer.add_voice(voice) {
                    warn!(stolen, "Voice limit reached, stealing oldest");
                }
            }
            // Only allocates when the host hands us a larger buffer than before.
            scratch.resize(data.len(), 0.0);
            mixer.process_into_output(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

fn build_stream_for_format(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    voice_rx: Receiver<Voice>,
    max_voices: usize,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, voice_rx, max_voices)?,
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, voice_rx, max_voices)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, voice_rx, max_voices)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, voice_rx, max_voices)?,
        other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other)).into()),
    };
    Ok(stream)
}

/// Starts the thread that owns the stream. Blocks until the stream is playing or
/// has failed. Returns the thread and the fixed buffer size in use, if any.
fn start_output_thread(
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    voice_rx: Receiver<Voice>,
    max_voices: usize,
) -> Result<(OutputThread, Option<u32>), Box<dyn Error>> {
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<Option<u32>, String>>(1);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    let handle = thread::spawn(move || {
        let mut config = config;
        let mut stream =
            build_stream_for_format(&device, &config, sample_format, voice_rx.clone(), max_voices);
        let retry = match (&stream, &config.buffer_size) {
            (Err(e), cpal::BufferSize::Fixed(frames)) => {
                warn!(
                    err = e.to_string(),
                    frames, "Fixed buffer size rejected, retrying with the backend default"
                );
                true
            }
            _ => false,
        };
        if retry {
            config.buffer_size = cpal::BufferSize::Default;
            stream = build_stream_for_format(&device, &config, sample_format, voice_rx, max_voices);
        }

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(format!("Failed to create CPAL stream: {}", e)));
                return;
            }
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(format!("Failed to start CPAL stream: {}", e)));
            return;
        }

        let frames = match config.buffer_size {
            cpal::BufferSize::Fixed(frames) => Some(frames),
            cpal::BufferSize::Default => None,
        };
        let _ = ready_tx.send(Ok(frames));

        // Keep the stream alive until the device is disposed.
        let _ = shutdown_rx.recv();
        drop(stream);
    });

    match ready_rx.recv_timeout(BUILD_STREAM_TIMEOUT) {
        Ok(Ok(frames)) => Ok((
            OutputThread {
                shutdown_tx,
                handle,
            },
            frames,
        )),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e.into())
        }
        Err(_) => {
            // The thread is left to finish on its own; dropping shutdown_tx stops it
            // as soon as the stream comes up.
            Err("timed out waiting for the output stream to start".into())
        }
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
        if self.output.lock().is_none() {
            return Err(AudioError::Disposed(self.info.friendly_name().to_string()).into());
        }
        debug!(voice = voice.name(), id = voice.id(), "Queueing voice");
        self.voice_tx.send(voice)?;
        Ok(())
    }

    fn control_panel(&self) -> Option<String> {
        if self.info.output_method() != OutputMethod::Asio {
            return None;
        }

        let mut panel = format!(
            "ASIO driver: {}\nStream: {}\nBuffer: {}\nSupported configurations:",
            self.info.friendly_name(),
            self.wave_format,
            self.buffer_frames
                .map(|frames| format!("{} frames", frames))
                .unwrap_or_else(|| "driver default".to_string()),
        );
        for candidate in &self.candidates {
            panel.push_str(&format!(
                "\n  {} ch, {}-{} Hz, {:?}, buffer {}",
                candidate.channels,
                candidate.min_sample_rate,
                candidate.max_sample_rate,
                candidate.sample_format,
                candidate
                    .buffer_range
                    .map(|(min, max)| format!("{}-{} frames", min, max))
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        Some(panel)
    }

    fn dispose(&self) {
        if let Some(output) = self.output.lock().take() {
            let _ = output.shutdown_tx.send(());
            if output.handle.join().is_err() {
                error!(device = self.info.friendly_name(), "Output thread panicked");
            }
            info!(device = self.info.friendly_name(), "Output stream stopped");
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        AudioDevice::dispose(self);
    }
}
