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

/// Typed error for settings load/save failures so callers can tell a broken
/// file (which the operator may discard) from an I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid latency '{0}': {1}")]
    Latency(String, String),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

impl SettingsError {
    /// True if the file exists but its content can't be used.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, SettingsError::Io(_))
    }
}
