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

//! Interactive console prompts: yes/no questions, numbered menus and the
//! command prompt shown between trigger sessions.

use std::io;

use tracing::debug;

use crate::audio::{DeviceInfo, OutputMethod};

const PANEL: &str = "panel";
const DEVICE: &str = "device";
const EXIT: &str = "exit";

/// Commands accepted after a trigger session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Shows the ASIO control panel.
    Panel,
    /// Stops the current device and selects a new one.
    Device,
    /// Disposes the device and exits.
    Exit,
    /// Anything else reopens the trigger session.
    Reopen,
}

impl Command {
    pub fn parse(input: &str) -> Command {
        match input.trim().to_lowercase().as_str() {
            PANEL => Command::Panel,
            DEVICE => Command::Device,
            EXIT => Command::Exit,
            _ => Command::Reopen,
        }
    }
}

/// Reads one line without its line ending. Returns None at EOF.
pub fn read_line<R: io::BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        return Ok(None);
    }
    let trimmed = input.trim_end_matches(['\r', '\n']).len();
    input.truncate(trimmed);
    Ok(Some(input))
}

/// Asks a Y/n question. Only an exact `Y` counts as yes.
pub fn confirm<R, W>(reader: &mut R, writer: &mut W, prompt: &str) -> io::Result<bool>
where
    R: io::BufRead,
    W: io::Write,
{
    write!(writer, "{}", prompt)?;
    writer.flush()?;
    Ok(read_line(reader)?.as_deref() == Some("Y"))
}

/// Shows info and reads a 1-based index no greater than max. A blank answer (or
/// EOF) selects the default. Anything else that isn't a valid index reprompts.
pub fn read_index<R, W>(
    reader: &mut R,
    writer: &mut W,
    info: &str,
    max: usize,
    default: usize,
) -> io::Result<usize>
where
    R: io::BufRead,
    W: io::Write,
{
    loop {
        write!(writer, "{}", info)?;
        writer.flush()?;

        let input = match read_line(reader)? {
            Some(input) => input,
            None => {
                writeln!(writer)?;
                return Ok(default);
            }
        };
        writeln!(writer)?;

        let input = input.trim();
        if input.is_empty() {
            return Ok(default);
        }
        match input.parse::<usize>() {
            Ok(index) if (1..=max).contains(&index) => return Ok(index),
            _ => {
                debug!(input, max, "Invalid index");
                writeln!(writer, "Sorry, please input a valid index.")?;
            }
        }
    }
}

/// Groups devices by output method, keeping the order methods first appear in.
pub fn group_by_method(devices: &[DeviceInfo]) -> Vec<(OutputMethod, Vec<&DeviceInfo>)> {
    let mut groups: Vec<(OutputMethod, Vec<&DeviceInfo>)> = Vec::new();
    for device in devices {
        match groups
            .iter_mut()
            .find(|(method, _)| *method == device.output_method())
        {
            Some((_, group)) => group.push(device),
            None => groups.push((device.output_method(), vec![device])),
        }
    }
    groups
}

/// The 1-based method index offered by default: ASIO, then WASAPI, then the first.
pub fn default_method_index(methods: &[OutputMethod]) -> usize {
    [OutputMethod::Asio, OutputMethod::Wasapi]
        .iter()
        .find_map(|preferred| methods.iter().position(|method| method == preferred))
        .map(|position| position + 1)
        .unwrap_or(1)
}

/// Walks the operator through choosing an output method and then a device.
/// Returns None if there are no devices to choose from.
pub fn select_device<R, W>(
    devices: &[DeviceInfo],
    reader: &mut R,
    writer: &mut W,
) -> io::Result<Option<DeviceInfo>>
where
    R: io::BufRead,
    W: io::Write,
{
    let groups = group_by_method(devices);
    if groups.is_empty() {
        return Ok(None);
    }

    let methods: Vec<OutputMethod> = groups.iter().map(|(method, _)| *method).collect();
    let default_method = default_method_index(&methods);
    let mut info = String::new();
    for (i, method) in methods.iter().enumerate() {
        info.push_str(&format!("{}. {}\n", i + 1, method));
    }
    info.push_str(&format!(
        "Select output method: (default {}) ",
        default_method
    ));
    let method_index = read_index(reader, writer, &info, methods.len(), default_method)?;

    let (_, group) = &groups[method_index - 1];
    let mut info = String::new();
    for (i, device) in group.iter().enumerate() {
        info.push_str(&format!("{}. {}\n", i + 1, device.friendly_name()));
    }
    info.push_str("Select output device: (default 1) ");
    let device_index = read_index(reader, writer, &info, group.len(), 1)?;

    Ok(Some(group[device_index - 1].clone()))
}

/// Prints the command help and reads a command. EOF is treated as exit.
pub fn read_command<R, W>(reader: &mut R, writer: &mut W) -> io::Result<Command>
where
    R: io::BufRead,
    W: io::Write,
{
    writeln!(writer, "Type \"{}\" to open the ASIO control panel.", PANEL)?;
    writeln!(writer, "Type \"{}\" to select a device.", DEVICE)?;
    writeln!(writer, "Type \"{}\" to close the program.", EXIT)?;
    writeln!(writer, "Anything else reopens the trigger session.")?;
    writer.flush()?;

    Ok(match read_line(reader)? {
        Some(input) => Command::parse(&input),
        None => Command::Exit,
    })
}

/// Prints every device grouped by output method.
pub fn print_devices<W: io::Write>(devices: &[DeviceInfo], writer: &mut W) -> io::Result<()> {
    for (method, group) in group_by_method(devices) {
        writeln!(writer, "{}:", method)?;
        for device in group {
            writeln!(writer, "- {}", device.friendly_name())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use super::*;

    fn devices() -> Vec<DeviceInfo> {
        vec![
            DeviceInfo::new(OutputMethod::Wasapi, "Speakers"),
            DeviceInfo::new(OutputMethod::Asio, "ASIO4ALL v2"),
            DeviceInfo::new(OutputMethod::Wasapi, "Headphones"),
            DeviceInfo::new(OutputMethod::Asio, "FL Studio ASIO"),
        ]
    }

    fn run_select(devices: &[DeviceInfo], input: &str) -> (Option<DeviceInfo>, String) {
        let mut reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let selected = select_device(devices, &mut reader, &mut writer).unwrap();
        (selected, String::from_utf8(writer).unwrap())
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("panel"), Command::Panel);
        assert_eq!(Command::parse("device\r\n"), Command::Device);
        assert_eq!(Command::parse(" EXIT "), Command::Exit);
        assert_eq!(Command::parse(""), Command::Reopen);
        assert_eq!(Command::parse("asio"), Command::Reopen);
    }

    #[test]
    fn test_read_command_eof_exits() {
        let mut reader = BufReader::new("".as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        assert_eq!(
            read_command(&mut reader, &mut writer).unwrap(),
            Command::Exit
        );
        assert!(String::from_utf8(writer).unwrap().contains("\"panel\""));
    }

    #[test]
    fn test_confirm_requires_exact_y() {
        for (input, expected) in [("Y\n", true), ("Y\r\n", true), ("y\n", false), ("yes\n", false), ("", false)] {
            let mut reader = BufReader::new(input.as_bytes());
            let mut writer: Vec<u8> = Vec::new();
            assert_eq!(
                confirm(&mut reader, &mut writer, "Sure? (Y/n) ").unwrap(),
                expected,
                "input {:?}",
                input
            );
            assert_eq!(writer, b"Sure? (Y/n) ");
        }
    }

    #[test]
    fn test_read_index_reprompts_until_valid() {
        let mut reader = BufReader::new("abc\n0\n4\n2\n".as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let index = read_index(&mut reader, &mut writer, "Pick: ", 3, 1).unwrap();
        assert_eq!(index, 2);

        let output = String::from_utf8(writer).unwrap();
        assert_eq!(output.matches("Pick: ").count(), 4);
        assert_eq!(output.matches("Sorry, please input a valid index.").count(), 3);
    }

    #[test]
    fn test_read_index_blank_selects_default() {
        let mut reader = BufReader::new("\n".as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        assert_eq!(read_index(&mut reader, &mut writer, "Pick: ", 3, 3).unwrap(), 3);

        // Blank after an invalid answer still accepts the default.
        let mut reader = BufReader::new("9\n   \n".as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        assert_eq!(read_index(&mut reader, &mut writer, "Pick: ", 3, 2).unwrap(), 2);

        let mut reader = BufReader::new("".as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        assert_eq!(read_index(&mut reader, &mut writer, "Pick: ", 3, 2).unwrap(), 2);
    }

    #[test]
    fn test_group_by_method_keeps_first_appearance_order() {
        let devices = devices();
        let groups = group_by_method(&devices);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, OutputMethod::Wasapi);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, OutputMethod::Asio);
        assert_eq!(groups[1].1[1].friendly_name(), "FL Studio ASIO");
    }

    #[test]
    fn test_default_method_index() {
        assert_eq!(
            default_method_index(&[OutputMethod::Wasapi, OutputMethod::Asio]),
            2
        );
        assert_eq!(
            default_method_index(&[OutputMethod::Alsa, OutputMethod::Wasapi]),
            2
        );
        assert_eq!(
            default_method_index(&[OutputMethod::Alsa, OutputMethod::Jack]),
            1
        );
    }

    #[test]
    fn test_select_device_defaults_to_asio() {
        let (selected, output) = run_select(&devices(), "\n\n");
        assert_eq!(
            selected,
            Some(DeviceInfo::new(OutputMethod::Asio, "ASIO4ALL v2"))
        );
        assert!(output.contains("1. WASAPI\n2. ASIO\nSelect output method: (default 2) "));
        assert!(output.contains("1. ASIO4ALL v2\n2. FL Studio ASIO\nSelect output device: (default 1) "));
    }

    #[test]
    fn test_select_device_explicit_choice() {
        let (selected, _) = run_select(&devices(), "1\n2\n");
        assert_eq!(
            selected,
            Some(DeviceInfo::new(OutputMethod::Wasapi, "Headphones"))
        );
    }

    #[test]
    fn test_select_device_without_devices() {
        let (selected, output) = run_select(&[], "1\n");
        assert_eq!(selected, None);
        assert!(output.is_empty());
    }

    #[test]
    fn test_print_devices() {
        let mut writer: Vec<u8> = Vec::new();
        print_devices(&devices(), &mut writer).unwrap();
        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "WASAPI:\n- Speakers\n- Headphones\nASIO:\n- ASIO4ALL v2\n- FL Studio ASIO\n"
        );
    }
}
