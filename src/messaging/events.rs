//! Audio events
//!
//! Events are notifications of things that already happened. They are
//! broadcast to every subscriber of the [`EventBus`](super::EventBus).

use crate::audio_system::{Channel, SlotHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// A one-shot effect started playing
    EffectStarted { handle: SlotHandle, clip: String },

    /// A one-shot effect reached the end of its clip and its slot was freed
    EffectFinished { handle: SlotHandle },

    LoopStarted { handle: SlotHandle, clip: String },

    LoopStopped { handle: SlotHandle },

    /// The music session switched tracks
    MusicChanged { index: usize, name: String },

    MusicStopped,

    VolumeChanged { channel: Channel, volume: f32 },

    ChannelToggled { channel: Channel, enabled: bool },

    GamePaused,

    GameResumed,

    /// A play request was dropped (disabled channel, unknown clip, full pool)
    RequestDropped { reason: String },

    SettingsSaved,

    /// The manager is shutting down
    Shutdown,
}

impl AudioEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            AudioEvent::EffectStarted { handle, clip } => {
                format!("Effect '{}' started on slot {}", clip, handle)
            }
            AudioEvent::EffectFinished { handle } => format!("Effect on slot {} finished", handle),
            AudioEvent::LoopStarted { handle, clip } => {
                format!("Loop '{}' started on slot {}", clip, handle)
            }
            AudioEvent::LoopStopped { handle } => format!("Loop on slot {} stopped", handle),
            AudioEvent::MusicChanged { index, name } => format!("Music #{}: {}", index, name),
            AudioEvent::MusicStopped => "Music stopped".to_string(),
            AudioEvent::VolumeChanged { channel, volume } => {
                format!("{} volume: {:.2}", channel, volume)
            }
            AudioEvent::ChannelToggled { channel, enabled } => {
                format!("{} {}", channel, if *enabled { "enabled" } else { "disabled" })
            }
            AudioEvent::GamePaused => "Game paused".to_string(),
            AudioEvent::GameResumed => "Game resumed".to_string(),
            AudioEvent::RequestDropped { reason } => format!("Request dropped: {}", reason),
            AudioEvent::SettingsSaved => "Settings saved".to_string(),
            AudioEvent::Shutdown => "Shutting down".to_string(),
        }
    }
}
