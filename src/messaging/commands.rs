//! Audio commands
//!
//! Commands are requests to do something (imperative). UI callbacks, the
//! pause menu and the console all produce them; the executor applies them on
//! the tick thread.

use std::str::FromStr;

use crate::audio_system::{Channel, ClipRef};

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    PlayEffect { clip: ClipRef },

    PlayMusic { index: usize },

    NextMusic,

    PreviousMusic,

    StopMusic,

    StartLoop { clip: ClipRef },

    /// Loops are addressed by slot index; the executor resolves the live handle
    StopLoop { slot: usize },

    PauseLoop { slot: usize },

    ResumeLoop { slot: usize },

    SetVolume { channel: Channel, volume: f32 },

    SetEnabled { channel: Channel, enabled: bool },

    PauseGame,

    ResumeGame,

    SaveSettings,

    LoadSettings,

    /// Print what is currently playing
    Status,

    Quit,
}

/// Result of command execution
#[derive(Debug)]
pub enum CommandResult {
    /// Command executed successfully
    Success,

    /// Command executed with a specific result
    SuccessWithValue(String),

    /// Command failed with an error
    Error(String),
}

impl AudioCommand {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            AudioCommand::PlayEffect { clip } => format!("Play effect {}", clip),
            AudioCommand::PlayMusic { index } => format!("Play music #{}", index),
            AudioCommand::NextMusic => "Next music track".to_string(),
            AudioCommand::PreviousMusic => "Previous music track".to_string(),
            AudioCommand::StopMusic => "Stop music".to_string(),
            AudioCommand::StartLoop { clip } => format!("Start loop {}", clip),
            AudioCommand::StopLoop { slot } => format!("Stop loop on slot {}", slot),
            AudioCommand::PauseLoop { slot } => format!("Pause loop on slot {}", slot),
            AudioCommand::ResumeLoop { slot } => format!("Resume loop on slot {}", slot),
            AudioCommand::SetVolume { channel, volume } => {
                format!("Set {} volume to {:.2}", channel, volume)
            }
            AudioCommand::SetEnabled { channel, enabled } => {
                format!("{} {}", if *enabled { "Enable" } else { "Disable" }, channel)
            }
            AudioCommand::PauseGame => "Pause game".to_string(),
            AudioCommand::ResumeGame => "Resume game".to_string(),
            AudioCommand::SaveSettings => "Save settings".to_string(),
            AudioCommand::LoadSettings => "Load settings".to_string(),
            AudioCommand::Status => "Status".to_string(),
            AudioCommand::Quit => "Quit".to_string(),
        }
    }
}

fn parse_clip(arg: &str) -> ClipRef {
    match arg.parse::<usize>() {
        Ok(index) => ClipRef::Index(index),
        Err(_) => ClipRef::Name(arg.to_string()),
    }
}

fn parse_flag(arg: &str) -> Result<bool, String> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected on/off, got '{}'", other)),
    }
}

fn parse_slot(arg: Option<&str>) -> Result<usize, String> {
    let arg = arg.ok_or("missing slot number")?;
    arg.parse().map_err(|_| format!("invalid slot number '{}'", arg))
}

/// Console grammar, one command per line:
///
/// ```text
/// effect <name|index>        music <index|next|prev|stop>
/// loop <name|index>          stop|pause-loop|resume-loop <slot>
/// volume <channel> <0..1>    enable <channel> <on|off>
/// pause | resume | save | load | status | quit
/// ```
impl FromStr for AudioCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or("empty command")?.to_ascii_lowercase();
        let arg = parts.next();

        let command = match verb.as_str() {
            "effect" | "play" => AudioCommand::PlayEffect {
                clip: parse_clip(arg.ok_or("missing clip")?),
            },
            "music" => match arg.ok_or("missing track")? {
                "next" => AudioCommand::NextMusic,
                "prev" | "previous" => AudioCommand::PreviousMusic,
                "stop" => AudioCommand::StopMusic,
                index => AudioCommand::PlayMusic {
                    index: index
                        .parse()
                        .map_err(|_| format!("invalid track index '{}'", index))?,
                },
            },
            "loop" => AudioCommand::StartLoop {
                clip: parse_clip(arg.ok_or("missing clip")?),
            },
            "stop" => AudioCommand::StopLoop {
                slot: parse_slot(arg)?,
            },
            "pause-loop" => AudioCommand::PauseLoop {
                slot: parse_slot(arg)?,
            },
            "resume-loop" => AudioCommand::ResumeLoop {
                slot: parse_slot(arg)?,
            },
            "volume" => {
                let channel = arg.ok_or("missing channel")?.parse()?;
                let value = parts.next().ok_or("missing volume")?;
                AudioCommand::SetVolume {
                    channel,
                    volume: value
                        .parse()
                        .map_err(|_| format!("invalid volume '{}'", value))?,
                }
            }
            "enable" => {
                let channel = arg.ok_or("missing channel")?.parse()?;
                AudioCommand::SetEnabled {
                    channel,
                    enabled: parse_flag(parts.next().ok_or("missing on/off")?)?,
                }
            }
            "pause" => AudioCommand::PauseGame,
            "resume" => AudioCommand::ResumeGame,
            "save" => AudioCommand::SaveSettings,
            "load" => AudioCommand::LoadSettings,
            "status" => AudioCommand::Status,
            "quit" | "exit" => AudioCommand::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };

        Ok(command)
    }
}
