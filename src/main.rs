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
mod app;
mod audio;
mod config;
mod console;
mod input;
mod samples;
#[cfg(test)]
mod testutil;
mod trigger;

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use parking_lot::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::{App, DeviceSlot};
use crate::config::AppSettings;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays a hitsound through a low-latency output device on global key presses."
)]
struct Cli {
    /// The path to the settings file.
    #[arg(short, long, default_value = config::DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Logs what the player is doing to stderr.
    #[arg(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Selects a device and plays samples on key presses. This is the default.
    Start {},
    /// Lists the available audio output devices.
    Devices {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Start {}) {
        Commands::Devices {} => {
            let devices = audio::provider().list()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            console::print_devices(&devices, &mut io::stdout())?;
        }
        Commands::Start {} => {
            if start(cli.settings).await? {
                // The console thread is still blocked on stdin and would keep
                // the runtime from shutting down.
                process::exit(0);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,keyasio=info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Runs the console app until it exits or the process is asked to terminate.
/// Returns true if it was terminated.
async fn start(settings_path: PathBuf) -> Result<bool, Box<dyn Error>> {
    let slot: DeviceSlot = Arc::new(Mutex::new(None));
    let console_slot = slot.clone();

    let console = tokio::task::spawn_blocking(move || -> Result<(), String> {
        let mut reader = io::stdin().lock();
        let mut writer = io::stdout();

        let settings = AppSettings::load_or_create(&settings_path, &mut reader, &mut writer)
            .map_err(|e| e.to_string())?;
        let Some(settings) = settings else {
            info!("Settings were not regenerated, exiting");
            return Ok(());
        };

        let mut app = App::new(
            settings,
            &settings_path,
            audio::provider(),
            input::hook(),
            console_slot,
        );
        app.run(&mut reader, &mut writer).map_err(|e| e.to_string())
    });

    tokio::select! {
        result = console => {
            if let Err(e) = result? {
                error!(err = %e, "Exiting with error");
                return Err(e.into());
            }
            Ok(false)
        }
        Ok(()) = termination() => {
            println!("Console window closing, death imminent");
            if let Some(device) = slot.lock().take() {
                device.dispose();
            }
            Ok(true)
        }
    }
}

#[cfg(windows)]
async fn termination() -> io::Result<()> {
    let mut close = tokio::signal::windows::ctrl_close()?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = close.recv() => Ok(()),
    }
}

#[cfg(not(windows))]
async fn termination() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
