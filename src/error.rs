use thiserror::Error;

use crate::audio_system::{Channel, SlotHandle};

/// Library errors using thiserror for structured error handling.
///
/// Playback requests never panic or abort the caller: every failure is logged
/// where it happens and handed back as one of these values, which callers are
/// free to ignore.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode audio format")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("Clip not found: {0}")]
    NotFound(String),

    #[error("Music index {index} out of range ({count} tracks)")]
    MusicIndexOutOfRange { index: usize, count: usize },

    #[error("{0} channel is disabled")]
    ChannelDisabled(Channel),

    #[error("Source pool exhausted ({max} slots active)")]
    PoolExhausted { max: usize },

    #[error("Slot {0} is looping and must be stopped explicitly")]
    LoopActive(SlotHandle),

    #[error("Unknown or inactive slot {0}")]
    UnknownHandle(SlotHandle),

    #[error("No loop is playing on slot {0}")]
    NoLoopOnSlot(usize),

    #[error("Loops cannot be resumed while the game is paused")]
    GamePaused,

    #[error("Music source unavailable")]
    MusicUnavailable,

    #[error(transparent)]
    Backend(#[from] AudioError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = AudioError::InvalidFormat("unknown".to_string());
        assert_eq!(err.to_string(), "Invalid audio format: unknown");

        let err = PlayError::ChannelDisabled(Channel::Effect);
        assert_eq!(err.to_string(), "Effect channel is disabled");

        let err = PlayError::PoolExhausted { max: 8 };
        assert_eq!(err.to_string(), "Source pool exhausted (8 slots active)");
    }

    #[test]
    fn test_error_source_chain() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_err = ConfigError::LoadFailed {
            path: "/test/prefs.json".to_string(),
            source: Box::new(io_err),
        };

        assert!(config_err.source().is_some());
        assert_eq!(
            config_err.to_string(),
            "Failed to load configuration from /test/prefs.json"
        );
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: PlayError = AudioError::InvalidFormat("ogg".to_string()).into();
        assert_eq!(err.to_string(), "Invalid audio format: ogg");
    }
}
