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
    sync::{Arc, OnceLock},
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rdev::{Button, EventType};
use tracing::{debug, error, info, span, Level};

use super::{InputError, InputEvent, InputHook};

/// Decides where listener events go. Once the listener has stopped, no
/// subscription can be armed again.
#[derive(Default)]
struct Gate {
    sender: Option<Sender<InputEvent>>,
    stopped: Option<String>,
}

impl Gate {
    fn arm(&mut self) -> Result<Receiver<InputEvent>, InputError> {
        if let Some(reason) = &self.stopped {
            return Err(InputError::ListenerStopped(reason.clone()));
        }
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.sender = Some(sender);
        Ok(receiver)
    }

    fn disarm(&mut self) {
        self.sender = None;
    }

    fn forward(&self, input: InputEvent) {
        if let Some(sender) = self.sender.as_ref() {
            if sender.send(input).is_err() {
                debug!("Input session receiver dropped");
            }
        }
    }

    /// Marks the listener as gone. Dropping the sender disconnects any running
    /// session.
    fn stop(&mut self, reason: String) {
        self.stopped = Some(reason);
        self.sender = None;
    }
}

/// rdev can't stop listening once started, so the listener runs for the
/// lifetime of the process and only forwards events while someone is subscribed.
static LISTENER: OnceLock<Arc<Mutex<Gate>>> = OnceLock::new();

fn listener() -> &'static Arc<Mutex<Gate>> {
    LISTENER.get_or_init(|| {
        let gate = Arc::new(Mutex::new(Gate::default()));
        let callback_gate = gate.clone();
        let error_gate = gate.clone();

        thread::spawn(move || {
            let span = span!(Level::INFO, "input hook");
            let _enter = span.enter();

            info!("Starting global input listener");
            let result = rdev::listen(move |event| {
                if let Some(input) = to_input_event(&event.event_type) {
                    callback_gate.lock().forward(input);
                }
            });

            let reason = match result {
                Ok(()) => "listener returned".to_string(),
                Err(e) => format!("{:?}", e),
            };
            error!(err = %reason, "Global input listener stopped");
            error_gate.lock().stop(reason);
        });

        gate
    })
}

/// Maps an rdev event to an input event. Mouse movement and wheel events are ignored.
pub fn to_input_event(event_type: &EventType) -> Option<InputEvent> {
    match event_type {
        EventType::KeyPress(key) => Some(InputEvent::Pressed(format!("{:?}", key))),
        EventType::KeyRelease(key) => Some(InputEvent::Released(format!("{:?}", key))),
        EventType::ButtonPress(button) => Some(InputEvent::Pressed(button_name(button))),
        EventType::ButtonRelease(button) => Some(InputEvent::Released(button_name(button))),
        _ => None,
    }
}

fn button_name(button: &Button) -> String {
    match button {
        Button::Left => "MouseLeft".to_string(),
        Button::Right => "MouseRight".to_string(),
        Button::Middle => "MouseMiddle".to_string(),
        Button::Unknown(code) => format!("Mouse{}", code),
    }
}

/// The global hook backed by rdev.
pub struct Hook {}

impl Hook {
    pub fn new() -> Hook {
        Hook {}
    }
}

impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHook for Hook {
    fn subscribe(&self) -> Result<Receiver<InputEvent>, Box<dyn Error>> {
        let receiver = listener().lock().arm()?;
        debug!("Global input hook armed");
        Ok(receiver)
    }

    fn unsubscribe(&self) {
        if let Some(gate) = LISTENER.get() {
            gate.lock().disarm();
            debug!("Global input hook disarmed");
        }
    }
}
