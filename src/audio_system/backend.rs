//! Playback backend seam
//!
//! The mixer and pool only ever talk to [`Voice`]s handed out by a
//! [`PlaybackBackend`]. [`HeadlessBackend`] tracks voice state without
//! producing sound; the rodio backend lives in `player`.

use super::catalog::Clip;
use crate::error::AudioError;

/// Coarse playback state of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// One reusable playback resource
pub trait Voice {
    /// Start `clip` from the beginning, replacing whatever was playing
    fn start(&mut self, clip: &Clip, looping: bool) -> Result<(), AudioError>;
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn state(&self) -> VoiceState;

    fn is_playing(&self) -> bool {
        self.state() == VoiceState::Playing
    }

    fn is_paused(&self) -> bool {
        self.state() == VoiceState::Paused
    }
}

/// Factory for voices
pub trait PlaybackBackend {
    type Voice: Voice;

    fn create_voice(&mut self) -> Result<Self::Voice, AudioError>;
}

/// Backend that produces no output, for servers, tests and machines without
/// an audio device.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    created: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voices created so far
    pub fn created(&self) -> usize {
        self.created
    }
}

impl PlaybackBackend for HeadlessBackend {
    type Voice = HeadlessVoice;

    fn create_voice(&mut self) -> Result<HeadlessVoice, AudioError> {
        self.created += 1;
        Ok(HeadlessVoice::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessVoice {
    clip: Option<Clip>,
    looping: bool,
    volume: f32,
    state: VoiceState,
    starts: usize,
}

impl HeadlessVoice {
    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// How many times playback was started from the beginning
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl Voice for HeadlessVoice {
    fn start(&mut self, clip: &Clip, looping: bool) -> Result<(), AudioError> {
        self.clip = Some(clip.clone());
        self.looping = looping;
        self.state = VoiceState::Playing;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.clip = None;
        self.looping = false;
        self.state = VoiceState::Stopped;
    }

    fn pause(&mut self) {
        if self.state == VoiceState::Playing {
            self.state = VoiceState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == VoiceState::Paused {
            self.state = VoiceState::Playing;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn state(&self) -> VoiceState {
        self.state
    }
}
