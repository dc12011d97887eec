use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;

use audio_loopback_core::{AudioDevice, LoopbackConfiguration};

use crate::audio_state::AppEvent;

/// A console command, one per input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Empty line: the start/stop button.
    Toggle,
    Start,
    Stop,
    Devices,
    /// Pick a capture device by list index or exact name.
    Select(String),
    Gain(f32),
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" | "toggle" => Ok(Self::Toggle),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "devices" | "ls" => Ok(Self::Devices),
            "status" => Ok(Self::Status),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "select" if !rest.is_empty() => Ok(Self::Select(rest.to_string())),
            "select" => Err("usage: select <index|name>".into()),
            "gain" => rest
                .parse::<f32>()
                .ok()
                .filter(|g| g.is_finite() && *g >= 0.0)
                .map(Self::Gain)
                .ok_or_else(|| "usage: gain <non-negative number>".to_string()),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

/// Read the configuration snapshot from a JSON file, or use defaults.
pub fn load_configuration(path: Option<&Path>) -> Result<LoopbackConfiguration, String> {
    let Some(path) = path else {
        return Ok(LoopbackConfiguration::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let config: LoopbackConfiguration =
        serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
    config.validate()?;
    Ok(config)
}

/// Resolve a `select` argument against the listed devices.
pub fn resolve_device<'a>(devices: &'a [AudioDevice], selector: &str) -> Option<&'a AudioDevice> {
    if let Ok(index) = selector.parse::<usize>() {
        return devices.get(index);
    }
    devices.iter().find(|d| d.name == selector)
}

pub fn print_devices(devices: &[AudioDevice], selected: &str) {
    if devices.is_empty() {
        println!("no capture devices found");
        return;
    }
    for (i, device) in devices.iter().enumerate() {
        let marker = if device.name == selected { '*' } else { ' ' };
        println!("{} {:>2}: {}", marker, i, device.name);
    }
}

/// Forward stdin lines to the control loop as commands.
pub fn spawn_console_reader(events: Sender<AppEvent>) {
    let spawned = thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let event = match Command::parse(&line) {
                    Ok(command) => AppEvent::Command(command),
                    Err(message) => {
                        eprintln!("{}", message);
                        continue;
                    }
                };
                if events.send(event).is_err() {
                    return;
                }
            }
            let _ = events.send(AppEvent::InputClosed);
        });
    if let Err(e) = spawned {
        log::error!("failed to spawn console reader: {}", e);
    }
}
