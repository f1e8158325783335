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
pub mod bindings;
pub mod error;
pub mod settings;

pub use bindings::TriggerBinding;
pub use error::SettingsError;
pub use settings::AppSettings;

/// The settings file used when none is given on the command line.
pub const DEFAULT_SETTINGS_PATH: &str = "appsettings.json";
