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
use std::{collections::HashSet, error::Error, io};

use tracing::{debug, info, span, Level};

use crate::{
    input::{InputEvent, InputHook},
    samples::PlaybackEngine,
};

/// Plays samples for global input events until the close input is pressed.
pub struct TriggerSession {}

impl TriggerSession {
    /// Runs one session and returns how many samples were triggered. The hook is
    /// disarmed when the session ends.
    pub fn run<W: io::Write>(
        hook: &dyn InputHook,
        engine: &PlaybackEngine,
        close_input: &str,
        writer: &mut W,
    ) -> Result<usize, Box<dyn Error>> {
        let span = span!(Level::INFO, "trigger session");
        let _enter = span.enter();

        writeln!(
            writer,
            "Listening to {}. Press {} to close.",
            engine.bound_inputs().join(", "),
            close_input
        )?;
        writer.flush()?;

        let receiver = hook.subscribe()?;
        info!(close_input, "Trigger session started");

        // Keys auto-repeat while held, but only the first press should play.
        let mut held: HashSet<String> = HashSet::new();
        let mut triggered = 0;

        for event in receiver.iter() {
            match event {
                InputEvent::Pressed(name) => {
                    if name == close_input {
                        debug!("Close input pressed");
                        break;
                    }
                    if !held.insert(name.clone()) {
                        continue;
                    }
                    if engine.trigger(&name) {
                        triggered += 1;
                    }
                }
                InputEvent::Released(name) => {
                    held.remove(&name);
                }
            }
        }

        hook.unsubscribe();
        info!(triggered, "Trigger session closed");
        Ok(triggered)
    }
}
