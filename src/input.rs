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
use std::{error::Error, fmt, sync::Arc};

use crossbeam_channel::Receiver;
use thiserror::Error;

#[cfg(test)]
pub mod mock;
pub mod rdev;

/// A global key or mouse button event. Inputs are named the way they are in
/// the settings file, e.g. `KeyZ`, `Space` or `MouseLeft`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(String),
    Released(String),
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEvent::Pressed(name) => write!(f, "{} pressed", name),
            InputEvent::Released(name) => write!(f, "{} released", name),
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("global input listener stopped: {0}")]
    ListenerStopped(String),
}

/// A system-wide input hook.
pub trait InputHook: Send + Sync {
    /// Arms the hook. Events are delivered on the returned receiver until
    /// unsubscribe is called, which disconnects it. Fails once the hook can no
    /// longer deliver events.
    fn subscribe(&self) -> Result<Receiver<InputEvent>, Box<dyn Error>>;

    /// Disarms the hook.
    fn unsubscribe(&self);
}

/// Returns the hook backed by rdev.
pub fn hook() -> Arc<dyn InputHook> {
    Arc::new(rdev::Hook::new())
}
