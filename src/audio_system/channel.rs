//! Mixer channels
//!
//! Defines the volume groups every sound is routed through.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Volume/enable groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Scales every other channel
    Master,

    /// Background music track
    Music,

    /// One-shot and looping sound effects
    Effect,
}

impl Channel {
    /// Key prefix used when persisting this channel's settings
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Master => "master",
            Channel::Music => "music",
            Channel::Effect => "effect",
        }
    }

    /// Check whether a change to this channel affects sessions routed through `other`
    pub fn affects(&self, other: Channel) -> bool {
        *self == Channel::Master || *self == other
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Master => write!(f, "Master"),
            Channel::Music => write!(f, "Music"),
            Channel::Effect => write!(f, "Effect"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "master" => Ok(Channel::Master),
            "music" => Ok(Channel::Music),
            "effect" | "effects" | "sfx" => Ok(Channel::Effect),
            other => Err(format!("unknown channel '{}'", other)),
        }
    }
}

/// Stored volume and enable flag of a single channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// Volume multiplier (0.0-1.0)
    volume: f32,
    enabled: bool,
}

impl ChannelState {
    pub fn new(volume: f32, enabled: bool) -> Self {
        Self {
            volume: clamp_volume(volume),
            enabled,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            enabled: true,
        }
    }
}

/// Clamp to [0, 1]; NaN is treated as silence
pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
