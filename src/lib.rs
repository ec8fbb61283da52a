//! Game audio mixing and pooled playback.
//!
//! See [`audio_system`] for the manager and [`messaging`] for the
//! command/event plumbing around it.

pub mod audio_system;
pub mod config;
pub mod error;
pub mod messaging;
