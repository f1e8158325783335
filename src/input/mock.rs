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
use std::{collections::VecDeque, error::Error};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::{InputError, InputEvent, InputHook};

/// A mock hook that replays one scripted list of events per subscription. The
/// receiver disconnects once a script is exhausted.
pub struct Hook {
    scripts: Mutex<VecDeque<Vec<InputEvent>>>,
    /// Fail subscriptions once the scripts run out, like a listener that died.
    stop_when_exhausted: bool,
    subscriptions: Mutex<usize>,
    unsubscriptions: Mutex<usize>,
}

impl Hook {
    pub fn new(scripts: Vec<Vec<InputEvent>>) -> Hook {
        Hook {
            scripts: Mutex::new(scripts.into()),
            stop_when_exhausted: false,
            subscriptions: Mutex::new(0),
            unsubscriptions: Mutex::new(0),
        }
    }

    /// A hook whose listener stops after the given scripts have been played.
    pub fn stopping_after(scripts: Vec<Vec<InputEvent>>) -> Hook {
        Hook {
            stop_when_exhausted: true,
            ..Hook::new(scripts)
        }
    }

    pub fn subscriptions(&self) -> usize {
        *self.subscriptions.lock()
    }

    pub fn unsubscriptions(&self) -> usize {
        *self.unsubscriptions.lock()
    }
}

/// Shorthand for a press followed by a release.
pub fn tap(name: &str) -> Vec<InputEvent> {
    vec![
        InputEvent::Pressed(name.to_string()),
        InputEvent::Released(name.to_string()),
    ]
}

impl InputHook for Hook {
    fn subscribe(&self) -> Result<Receiver<InputEvent>, Box<dyn Error>> {
        let script = match self.scripts.lock().pop_front() {
            Some(script) => script,
            None if self.stop_when_exhausted => {
                return Err(InputError::ListenerStopped("mock listener stopped".into()).into())
            }
            None => Vec::new(),
        };
        let (sender, receiver) = crossbeam_channel::unbounded();
        for event in script {
            sender.send(event)?;
        }
        *self.subscriptions.lock() += 1;
        Ok(receiver)
    }

    fn unsubscribe(&self) {
        *self.unsubscriptions.lock() += 1;
    }
}
