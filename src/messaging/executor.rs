/// Command executor
///
/// Queues commands from any thread and applies them to the audio manager on
/// the tick thread.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::commands::{AudioCommand, CommandResult};
use crate::audio_system::{AudioSystemManager, PlaybackBackend, SlotHandle};
use crate::error::PlayError;

/// Command executor that drains queued commands into the manager
pub struct CommandExecutor {
    command_tx: Sender<AudioCommand>,
    command_rx: Receiver<AudioCommand>,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();

        Self {
            command_tx: tx,
            command_rx: rx,
        }
    }

    /// Get a sender for submitting commands
    pub fn sender(&self) -> Sender<AudioCommand> {
        self.command_tx.clone()
    }

    /// Queue a command for the next [`Self::process_pending`]
    pub fn submit(&self, command: AudioCommand) {
        let _ = self.command_tx.send(command);
    }

    pub fn pending(&self) -> usize {
        self.command_rx.len()
    }

    /// Apply every queued command, handing each result to `on_result`.
    ///
    /// Returns false once `Quit` was seen; commands queued after it are left in
    /// the channel.
    pub fn process_pending<B, F>(&self, manager: &mut AudioSystemManager<B>, mut on_result: F) -> bool
    where
        B: PlaybackBackend,
        F: FnMut(CommandResult),
    {
        while let Ok(command) = self.command_rx.try_recv() {
            if command == AudioCommand::Quit {
                tracing::info!("Quit command received");
                return false;
            }

            on_result(self.execute(manager, command));
        }

        true
    }

    /// Execute a command immediately
    pub fn execute<B: PlaybackBackend>(
        &self,
        manager: &mut AudioSystemManager<B>,
        command: AudioCommand,
    ) -> CommandResult {
        tracing::debug!("Executing command: {}", command.description());

        let result = match command {
            AudioCommand::PlayEffect { clip } => manager
                .play_effect(clip)
                .map(|handle| format!("Effect on slot {}", handle.index())),
            AudioCommand::StartLoop { clip } => manager
                .start_loop(clip)
                .map(|handle| format!("Loop on slot {}", handle.index())),
            AudioCommand::StopLoop { slot } => {
                live_loop(manager, slot).and_then(|h| manager.stop_loop(h)).map(|_| String::new())
            }
            AudioCommand::PauseLoop { slot } => {
                live_loop(manager, slot).and_then(|h| manager.pause_loop(h)).map(|_| String::new())
            }
            AudioCommand::ResumeLoop { slot } => {
                live_loop(manager, slot).and_then(|h| manager.resume_loop(h)).map(|_| String::new())
            }
            AudioCommand::PlayMusic { index } => manager.play_music(index).map(|_| String::new()),
            AudioCommand::NextMusic => manager.next_music().map(|_| String::new()),
            AudioCommand::PreviousMusic => manager.previous_music().map(|_| String::new()),
            AudioCommand::StopMusic => {
                manager.stop_music();
                Ok(String::new())
            }
            AudioCommand::SetVolume { channel, volume } => {
                manager.set_volume(channel, volume);
                Ok(String::new())
            }
            AudioCommand::SetEnabled { channel, enabled } => {
                manager.set_enabled(channel, enabled);
                Ok(String::new())
            }
            AudioCommand::PauseGame => {
                manager.pause_game();
                Ok(String::new())
            }
            AudioCommand::ResumeGame => {
                manager.resume_game();
                Ok(String::new())
            }
            AudioCommand::SaveSettings => {
                return match manager.save_settings() {
                    Ok(()) => CommandResult::Success,
                    Err(e) => CommandResult::Error(e.to_string()),
                };
            }
            AudioCommand::LoadSettings => {
                return match manager.load_settings() {
                    Ok(()) => CommandResult::Success,
                    Err(e) => CommandResult::Error(e.to_string()),
                };
            }
            AudioCommand::Status => Ok(status_line(manager)),
            AudioCommand::Quit => Ok(String::new()),
        };

        match result {
            Ok(value) if value.is_empty() => CommandResult::Success,
            Ok(value) => CommandResult::SuccessWithValue(value),
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }
}

/// Resolve a slot index typed on the console to the loop currently holding it
fn live_loop<B: PlaybackBackend>(manager: &AudioSystemManager<B>, slot: usize) -> Result<SlotHandle, PlayError> {
    let pool = manager.pool();
    pool.active_handles()
        .into_iter()
        .find(|h| h.index() == slot && pool.state(*h).is_some_and(|s| s.is_loop()))
        .ok_or_else(|| PlayError::NoLoopOnSlot(slot))
}

fn status_line<B: PlaybackBackend>(manager: &AudioSystemManager<B>) -> String {
    let music = match manager.current_music() {
        Some(clip) if manager.is_music_playing() => format!("'{}' (#{})", clip.name(), manager.music_index()),
        Some(clip) => format!("'{}' (#{}, silent)", clip.name(), manager.music_index()),
        None => "none".to_string(),
    };

    let pool = manager.pool();
    format!(
        "music: {} | slots: {}/{} active (max {}) | game {}",
        music,
        pool.active_count(),
        pool.len(),
        pool.max_size(),
        if manager.is_game_paused() { "paused" } else { "running" },
    )
}
