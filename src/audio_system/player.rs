//! rodio-backed voices
//!
//! Every voice owns its own `Sink` on a shared output stream.

use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::backend::{PlaybackBackend, Voice, VoiceState};
use super::catalog::Clip;
use crate::error::AudioError;

/// Audio output device. Must stay alive for as long as any voice plays.
pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
}

impl RodioBackend {
    /// Open the default output device
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;

        tracing::info!("Opened default audio output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }
}

impl PlaybackBackend for RodioBackend {
    type Voice = RodioVoice;

    fn create_voice(&mut self) -> Result<RodioVoice, AudioError> {
        RodioVoice::new(self.stream_handle.clone())
    }
}

/// Individual playback voice
pub struct RodioVoice {
    stream_handle: OutputStreamHandle,
    sink: Sink,
    volume: f32,
    state: VoiceState,
}

impl RodioVoice {
    fn new(stream_handle: OutputStreamHandle) -> Result<Self, AudioError> {
        let sink = Sink::try_new(&stream_handle).map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;

        Ok(Self {
            stream_handle,
            sink,
            volume: 1.0,
            state: VoiceState::Stopped,
        })
    }

    /// Drop anything queued by replacing the sink
    fn reset_sink(&mut self) {
        self.sink.stop();
        match Sink::try_new(&self.stream_handle) {
            Ok(sink) => {
                sink.set_volume(self.volume);
                self.sink = sink;
            }
            Err(e) => tracing::warn!("Failed to recreate audio sink: {}", e),
        }
    }
}

impl Voice for RodioVoice {
    fn start(&mut self, clip: &Clip, looping: bool) -> Result<(), AudioError> {
        self.reset_sink();
        self.state = VoiceState::Stopped;

        let cursor = Cursor::new(clip.bytes());

        // Each decoder is a different type, so box the source
        let source: Box<dyn Source<Item = i16> + Send> = if looping {
            Box::new(Decoder::new_looped(cursor).map_err(|e| AudioError::DecodeFailed(Box::new(e)))?)
        } else {
            Box::new(Decoder::new(cursor).map_err(|e| AudioError::DecodeFailed(Box::new(e)))?)
        };

        self.sink.set_volume(self.volume);
        self.sink.append(source);
        self.sink.play();
        self.state = VoiceState::Playing;

        tracing::trace!("Started '{}' (looping: {})", clip.name(), looping);
        Ok(())
    }

    fn stop(&mut self) {
        self.reset_sink();
        self.state = VoiceState::Stopped;
    }

    fn pause(&mut self) {
        if self.state() == VoiceState::Playing {
            self.sink.pause();
            self.state = VoiceState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == VoiceState::Paused {
            self.sink.play();
            self.state = VoiceState::Playing;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn state(&self) -> VoiceState {
        match self.state {
            // One-shots drain the sink when they finish
            VoiceState::Playing if self.sink.empty() => VoiceState::Stopped,
            state => state,
        }
    }
}

impl Drop for RodioVoice {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
