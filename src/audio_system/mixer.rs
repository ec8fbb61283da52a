//! Channel mixer
//!
//! Stores per-channel volume/enable state and derives the effective volume a
//! session on that channel should be played at.

use super::channel::{Channel, ChannelState};
use super::settings::AudioSettings;

#[derive(Debug, Clone, Default)]
pub struct ChannelMixer {
    master: ChannelState,
    music: ChannelState,
    effect: ChannelState,
}

impl ChannelMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self {
            master: ChannelState::new(settings.master_volume, settings.master_enabled),
            music: ChannelState::new(settings.music_volume, settings.music_enabled),
            effect: ChannelState::new(settings.effect_volume, settings.effect_enabled),
        }
    }

    /// Copy the channel state into `settings`, leaving the music index untouched
    pub fn write_settings(&self, settings: &mut AudioSettings) {
        settings.master_volume = self.master.volume();
        settings.music_volume = self.music.volume();
        settings.effect_volume = self.effect.volume();
        settings.master_enabled = self.master.is_enabled();
        settings.music_enabled = self.music.is_enabled();
        settings.effect_enabled = self.effect.is_enabled();
    }

    pub fn state(&self, channel: Channel) -> &ChannelState {
        match channel {
            Channel::Master => &self.master,
            Channel::Music => &self.music,
            Channel::Effect => &self.effect,
        }
    }

    fn state_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::Master => &mut self.master,
            Channel::Music => &mut self.music,
            Channel::Effect => &mut self.effect,
        }
    }

    /// Clamp and store; returns the stored value
    pub fn set_volume(&mut self, channel: Channel, volume: f32) -> f32 {
        let state = self.state_mut(channel);
        state.set_volume(volume);
        state.volume()
    }

    pub fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        self.state_mut(channel).set_enabled(enabled);
    }

    pub fn volume(&self, channel: Channel) -> f32 {
        self.state(channel).volume()
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.state(channel).is_enabled()
    }

    /// Master and `channel` both enabled
    pub fn is_audible(&self, channel: Channel) -> bool {
        self.master.is_enabled() && self.state(channel).is_enabled()
    }

    /// Volume a session on `channel` should be played at.
    ///
    /// Zero whenever master or the channel itself is disabled, otherwise
    /// `master * channel` clamped to [0, 1].
    pub fn effective_volume(&self, channel: Channel) -> f32 {
        if !self.is_audible(channel) {
            return 0.0;
        }

        match channel {
            Channel::Master => self.master.volume(),
            _ => (self.master.volume() * self.state(channel).volume()).clamp(0.0, 1.0),
        }
    }
}
