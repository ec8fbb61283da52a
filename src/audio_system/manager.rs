//! Audio system manager
//!
//! Owns the mixer, the source pool, the music session and the release
//! scheduler. Constructed explicitly and passed by reference to whatever needs
//! to make noise; everything runs on the thread that calls [`AudioSystemManager::tick`].

use std::collections::HashMap;
use std::time::Duration;

use super::backend::{PlaybackBackend, Voice};
use super::catalog::{Clip, ClipCatalog, ClipRef};
use super::channel::Channel;
use super::mixer::ChannelMixer;
use super::pool::{SessionKind, SlotHandle, SlotState, SourcePool};
use super::scheduler::{Scheduler, TimerId};
use super::settings::{AudioSettings, PrefsStore};
use crate::error::{AudioError, ConfigError, PlayError};
use crate::messaging::{AudioEvent, EventBus};

/// Pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Voices created at startup
    pub initial_size: usize,

    /// Hard cap on concurrent effect sessions
    pub max_size: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            initial_size: 8,
            max_size: 16,
        }
    }
}

struct MusicSession<V> {
    voice: V,
    clip: Option<Clip>,
    /// Whether music was audible when the game paused
    resume_after_pause: bool,
}

pub struct AudioSystemManager<B: PlaybackBackend> {
    catalog: ClipCatalog,
    mixer: ChannelMixer,
    pool: SourcePool<B>,
    music: Option<MusicSession<B::Voice>>,
    music_index: usize,
    scheduler: Scheduler<SlotHandle>,
    /// Pending release timer of each live one-shot
    release_timers: HashMap<SlotHandle, TimerId>,
    clock: Duration,
    game_paused: bool,
    prefs: PrefsStore,
    events: EventBus,
}

impl<B: PlaybackBackend> AudioSystemManager<B> {
    /// Build the manager and apply saved settings. Nothing plays until [`Self::start`].
    pub fn init(
        backend: B,
        catalog: ClipCatalog,
        prefs: PrefsStore,
        limits: PoolLimits,
    ) -> Result<Self, AudioError> {
        let mut pool = SourcePool::new(backend, limits.initial_size, limits.max_size)?;

        let music = match pool.backend_mut().create_voice() {
            Ok(voice) => Some(MusicSession {
                voice,
                clip: None,
                resume_after_pause: false,
            }),
            Err(e) => {
                tracing::error!("Music source unavailable, music requests will be ignored: {}", e);
                None
            }
        };

        if catalog.music().is_empty() {
            tracing::error!("Clip catalog has no music tracks");
        }
        if catalog.effects().is_empty() {
            tracing::error!("Clip catalog has no effects");
        }

        let settings = AudioSettings::load(&prefs);
        let mixer = ChannelMixer::from_settings(&settings);

        let music_index = if settings.music_index < catalog.music().len() {
            settings.music_index
        } else {
            if !catalog.music().is_empty() {
                tracing::warn!(
                    "Saved music index {} out of range, starting from the first track",
                    settings.music_index
                );
            }
            0
        };

        tracing::info!(
            "Audio system ready: {} music tracks, {} effects, pool {}/{}",
            catalog.music().len(),
            catalog.effects().len(),
            limits.initial_size.min(limits.max_size),
            limits.max_size
        );

        Ok(Self {
            catalog,
            mixer,
            pool,
            music,
            music_index,
            scheduler: Scheduler::new(),
            release_timers: HashMap::new(),
            clock: Duration::ZERO,
            game_paused: false,
            prefs,
            events: EventBus::new(),
        })
    }

    /// Start the saved music track
    pub fn start(&mut self) {
        if self.catalog.music().is_empty() {
            return;
        }
        let _ = self.play_music(self.music_index);
    }

    /// Save settings and stop everything
    pub fn shutdown(mut self) {
        if let Err(e) = self.save_settings() {
            tracing::error!("Failed to save audio settings on shutdown: {}", e);
        }

        self.stop_all();
        self.events.publish(AudioEvent::Shutdown);
        tracing::info!("Audio system shut down");
    }

    /// Advance the game clock and release one-shots whose clip has finished
    pub fn tick(&mut self, delta: Duration) {
        self.clock += delta;

        for handle in self.scheduler.poll(self.clock) {
            self.release_timers.remove(&handle);

            // The slot may have been released and handed out again since the
            // timer was scheduled; the generation check in `state` catches that.
            match self.pool.state(handle) {
                Some(SlotState::ActiveOneShot) => {
                    if self.pool.release(handle).is_ok() {
                        tracing::debug!("Effect on slot {} finished", handle);
                        self.events.publish(AudioEvent::EffectFinished { handle });
                    }
                }
                _ => tracing::trace!("Ignoring stale release timer for slot {}", handle),
            }
        }
    }

    fn drop_request(&self, error: PlayError) -> PlayError {
        tracing::warn!("{}", error);
        self.events.publish(AudioEvent::RequestDropped {
            reason: error.to_string(),
        });
        error
    }

    /// Validate an effect request and grab a slot for it
    fn begin_effect(&mut self, clip: ClipRef, kind: SessionKind) -> Result<(SlotHandle, Clip), PlayError> {
        for channel in [Channel::Master, Channel::Effect] {
            if !self.mixer.is_enabled(channel) {
                return Err(self.drop_request(PlayError::ChannelDisabled(channel)));
            }
        }

        let Some(clip) = self.catalog.find_effect(&clip).cloned() else {
            return Err(self.drop_request(PlayError::NotFound(clip.to_string())));
        };

        let handle = match self.pool.acquire(kind) {
            Ok(handle) => handle,
            Err(e) => {
                // The pool already logged it
                self.events.publish(AudioEvent::RequestDropped {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        self.pool.bind_clip(handle, clip.clone());
        Ok((handle, clip))
    }

    fn start_voice(&mut self, handle: SlotHandle, clip: &Clip, looping: bool, volume: f32) -> Result<(), PlayError> {
        let result = match self.pool.voice_mut(handle) {
            Some(voice) => {
                voice.set_volume(volume);
                voice.start(clip, looping)
            }
            None => return Err(PlayError::UnknownHandle(handle)),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to start '{}': {}", clip.name(), e);
            let released = match looping {
                true => self.pool.release_loop(handle),
                false => self.pool.release(handle),
            };
            if let Err(release_err) = released {
                tracing::warn!("Failed to release slot {}: {}", handle, release_err);
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Play an effect once. Its slot is released automatically after the clip's duration.
    pub fn play_effect(&mut self, clip: impl Into<ClipRef>) -> Result<SlotHandle, PlayError> {
        let (handle, clip) = self.begin_effect(clip.into(), SessionKind::OneShot)?;

        // One-shots keep playing through game pause
        let volume = self.mixer.effective_volume(Channel::Effect);
        self.start_voice(handle, &clip, false, volume)?;

        let timer = self.scheduler.schedule(self.clock + clip.duration(), handle);
        self.release_timers.insert(handle, timer);

        tracing::debug!("Playing effect '{}' on slot {}", clip.name(), handle);
        self.events.publish(AudioEvent::EffectStarted {
            handle,
            clip: clip.name().to_string(),
        });

        Ok(handle)
    }

    /// Start looping an effect until [`Self::stop_loop`] is called.
    ///
    /// A loop started while the game is paused begins on resume.
    pub fn start_loop(&mut self, clip: impl Into<ClipRef>) -> Result<SlotHandle, PlayError> {
        let (handle, clip) = self.begin_effect(clip.into(), SessionKind::Loop)?;

        let volume = match self.game_paused {
            true => 0.0,
            false => self.mixer.effective_volume(Channel::Effect),
        };
        self.start_voice(handle, &clip, true, volume)?;

        if self.game_paused {
            if let Some(voice) = self.pool.voice_mut(handle) {
                voice.pause();
            }
        }

        tracing::debug!("Started loop '{}' on slot {}", clip.name(), handle);
        self.events.publish(AudioEvent::LoopStarted {
            handle,
            clip: clip.name().to_string(),
        });

        Ok(handle)
    }

    pub fn stop_loop(&mut self, handle: SlotHandle) -> Result<(), PlayError> {
        if !matches!(self.pool.state(handle), Some(SlotState::ActiveLoop { .. })) {
            tracing::debug!("stop_loop: slot {} is not an active loop", handle);
            return Err(PlayError::UnknownHandle(handle));
        }

        self.pool.release_loop(handle)?;

        tracing::debug!("Stopped loop on slot {}", handle);
        self.events.publish(AudioEvent::LoopStopped { handle });
        Ok(())
    }

    /// Pause a loop without giving up its slot
    pub fn pause_loop(&mut self, handle: SlotHandle) -> Result<(), PlayError> {
        match self.pool.state(handle) {
            Some(SlotState::ActiveLoop { paused: true }) => Ok(()),
            Some(SlotState::ActiveLoop { paused: false }) => {
                if let Some(voice) = self.pool.voice_mut(handle) {
                    voice.pause();
                }
                self.pool.set_loop_paused(handle, true);
                Ok(())
            }
            _ => {
                tracing::debug!("pause_loop: slot {} is not an active loop", handle);
                Err(PlayError::UnknownHandle(handle))
            }
        }
    }

    pub fn resume_loop(&mut self, handle: SlotHandle) -> Result<(), PlayError> {
        match self.pool.state(handle) {
            Some(SlotState::ActiveLoop { paused }) => {
                if self.game_paused {
                    tracing::warn!("Not resuming loop on slot {} while the game is paused", handle);
                    return Err(PlayError::GamePaused);
                }

                if paused {
                    let volume = self.mixer.effective_volume(Channel::Effect);
                    if let Some(voice) = self.pool.voice_mut(handle) {
                        voice.set_volume(volume);
                        voice.resume();
                    }
                    self.pool.set_loop_paused(handle, false);
                }
                Ok(())
            }
            _ => {
                tracing::debug!("resume_loop: slot {} is not an active loop", handle);
                Err(PlayError::UnknownHandle(handle))
            }
        }
    }

    /// Switch the music session to track `index`.
    ///
    /// Asking for the track that is already current and playing (or held by
    /// game pause) does nothing, so the track doesn't restart.
    pub fn play_music(&mut self, index: usize) -> Result<(), PlayError> {
        let count = self.catalog.music().len();
        let Some(clip) = self.catalog.music_track(index).cloned() else {
            return Err(self.drop_request(PlayError::MusicIndexOutOfRange { index, count }));
        };

        let audible = self.mixer.is_audible(Channel::Music);
        let volume = self.mixer.effective_volume(Channel::Music);
        let game_paused = self.game_paused;

        let Some(session) = self.music.as_mut() else {
            tracing::warn!("Music source unavailable, ignoring request for track {}", index);
            return Err(PlayError::MusicUnavailable);
        };

        let is_current = index == self.music_index && session.clip.as_ref() == Some(&clip);
        if is_current && (session.voice.is_playing() || session.voice.is_paused()) {
            tracing::trace!("Music track {} already playing", index);
            return Ok(());
        }

        self.music_index = index;
        session.voice.stop();
        session.clip = Some(clip.clone());

        if audible && !game_paused {
            session.voice.set_volume(volume);
            if let Err(e) = session.voice.start(&clip, true) {
                tracing::warn!("Failed to start music '{}': {}", clip.name(), e);
                return Err(e.into());
            }
        }

        tracing::info!("Music track {}: {}", index, clip.name());
        self.events.publish(AudioEvent::MusicChanged {
            index,
            name: clip.name().to_string(),
        });

        Ok(())
    }

    /// Advance to the next music track, wrapping around
    pub fn next_music(&mut self) -> Result<(), PlayError> {
        let count = self.catalog.music().len();
        if count == 0 {
            return Err(self.drop_request(PlayError::MusicIndexOutOfRange { index: 0, count }));
        }
        self.play_music((self.music_index + 1) % count)
    }

    /// Go back to the previous music track, wrapping around
    pub fn previous_music(&mut self) -> Result<(), PlayError> {
        let count = self.catalog.music().len();
        if count == 0 {
            return Err(self.drop_request(PlayError::MusicIndexOutOfRange { index: 0, count }));
        }
        self.play_music((self.music_index + count - 1) % count)
    }

    pub fn stop_music(&mut self) {
        if let Some(session) = self.music.as_mut() {
            session.voice.stop();
            session.resume_after_pause = false;
            self.events.publish(AudioEvent::MusicStopped);
        }
    }

    /// Start the current track if music is audible; used when music is re-enabled
    fn start_music_if_allowed(&mut self) {
        if !self.mixer.is_audible(Channel::Music) {
            return;
        }

        let volume = self.mixer.effective_volume(Channel::Music);
        let current = self.catalog.music_track(self.music_index).cloned();
        let game_paused = self.game_paused;

        let Some(session) = self.music.as_mut() else {
            tracing::warn!("Music source unavailable");
            return;
        };

        if game_paused {
            session.resume_after_pause = true;
            return;
        }

        if session.voice.is_playing() {
            return;
        }

        session.voice.set_volume(volume);
        if session.voice.is_paused() {
            session.voice.resume();
            return;
        }

        let Some(clip) = session.clip.clone().or(current) else {
            return;
        };
        session.clip = Some(clip.clone());
        if let Err(e) = session.voice.start(&clip, true) {
            tracing::warn!("Failed to start music '{}': {}", clip.name(), e);
        }
    }

    /// Clamp and store a channel volume, then re-apply it to every affected session
    pub fn set_volume(&mut self, channel: Channel, volume: f32) {
        let volume = self.mixer.set_volume(channel, volume);
        self.apply_volumes(channel);

        tracing::debug!("{} volume set to {:.2}", channel, volume);
        self.events.publish(AudioEvent::VolumeChanged { channel, volume });
    }

    /// Enable or disable a channel.
    ///
    /// Master and Effect only change the computed volume of playing sessions,
    /// except that enabling Master starts music left silent while it was off.
    /// Music starts or stops the music session right away.
    pub fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        self.mixer.set_enabled(channel, enabled);
        self.apply_volumes(channel);

        match (channel, enabled) {
            (Channel::Music, false) => self.stop_music(),
            // Music that was never started while muted starts now; a live
            // session only gets its volume back
            (Channel::Music, true) | (Channel::Master, true) => self.start_music_if_allowed(),
            _ => {}
        }

        tracing::debug!("{} {}", channel, if enabled { "enabled" } else { "disabled" });
        self.events.publish(AudioEvent::ChannelToggled { channel, enabled });
    }

    /// Push current effective volumes to sessions routed through `changed`.
    /// Sessions held silent by game pause stay at zero.
    fn apply_volumes(&mut self, changed: Channel) {
        let game_paused = self.game_paused;

        if changed.affects(Channel::Music) && !game_paused {
            let volume = self.mixer.effective_volume(Channel::Music);
            if let Some(session) = self.music.as_mut() {
                session.voice.set_volume(volume);
            }
        }

        if changed.affects(Channel::Effect) {
            let volume = self.mixer.effective_volume(Channel::Effect);
            for (_, state, voice) in self.pool.active_mut() {
                if game_paused && state.is_loop() {
                    continue;
                }
                voice.set_volume(volume);
            }
        }
    }

    /// Silence and pause music and loops. One-shots carry on.
    pub fn pause_game(&mut self) {
        if self.game_paused {
            return;
        }
        self.game_paused = true;

        if let Some(session) = self.music.as_mut() {
            session.resume_after_pause = session.voice.is_playing();
            session.voice.set_volume(0.0);
            session.voice.pause();
        }

        for (_, state, voice) in self.pool.active_mut() {
            if state.is_loop() {
                voice.set_volume(0.0);
                voice.pause();
            }
        }

        tracing::debug!("Game paused");
        self.events.publish(AudioEvent::GamePaused);
    }

    /// Undo [`Self::pause_game`]. Music only comes back if it was playing before.
    pub fn resume_game(&mut self) {
        if !self.game_paused {
            return;
        }
        self.game_paused = false;

        let music_volume = self.mixer.effective_volume(Channel::Music);
        let music_audible = self.mixer.is_audible(Channel::Music);
        if let Some(session) = self.music.as_mut() {
            if session.resume_after_pause && music_audible {
                session.voice.set_volume(music_volume);
                if session.voice.is_paused() {
                    session.voice.resume();
                } else if let Some(clip) = session.clip.clone() {
                    // Track was switched during pause
                    if let Err(e) = session.voice.start(&clip, true) {
                        tracing::warn!("Failed to restart music '{}': {}", clip.name(), e);
                    }
                }
            }
            session.resume_after_pause = false;
        }

        let effect_volume = self.mixer.effective_volume(Channel::Effect);
        for (_, state, voice) in self.pool.active_mut() {
            if state == (SlotState::ActiveLoop { paused: false }) {
                voice.set_volume(effect_volume);
                voice.resume();
            }
        }

        tracing::debug!("Game resumed");
        self.events.publish(AudioEvent::GameResumed);
    }

    /// Stop the music and every active session.
    ///
    /// One-shots are released early and their release timers cancelled.
    pub fn stop_all(&mut self) {
        for handle in self.pool.active_handles() {
            let result = match self.pool.state(handle) {
                Some(SlotState::ActiveLoop { .. }) => self.pool.release_loop(handle),
                _ => {
                    if let Some(timer) = self.release_timers.remove(&handle) {
                        self.scheduler.cancel(timer);
                    }
                    self.pool.release(handle)
                }
            };
            if let Err(e) = result {
                tracing::warn!("Failed to release slot {}: {}", handle, e);
            }
        }

        self.stop_music();
        tracing::debug!("Stopped all audio");
    }

    pub fn settings(&self) -> AudioSettings {
        let mut settings = AudioSettings {
            music_index: self.music_index,
            ..AudioSettings::default()
        };
        self.mixer.write_settings(&mut settings);
        settings
    }

    /// Write the current mixer state and music index to the prefs store
    pub fn save_settings(&mut self) -> Result<(), ConfigError> {
        self.settings().store(&mut self.prefs);
        self.prefs.save()?;

        match self.prefs.path() {
            Some(path) => tracing::info!("Saved audio settings to {}", path.display()),
            None => tracing::debug!("Saved audio settings"),
        }
        self.events.publish(AudioEvent::SettingsSaved);
        Ok(())
    }

    /// Re-read the prefs store and apply it
    pub fn load_settings(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.prefs.path().map(|p| p.to_path_buf()) {
            self.prefs = PrefsStore::open(path)?;
        }

        let settings = AudioSettings::load(&self.prefs);
        self.mixer = ChannelMixer::from_settings(&settings);
        self.apply_volumes(Channel::Master);

        // Switch tracks first so only the saved track gets started
        if settings.music_index != self.music_index {
            let _ = self.play_music(settings.music_index);
        }

        if settings.music_enabled {
            self.start_music_if_allowed();
        } else {
            self.stop_music();
        }

        tracing::info!("Loaded audio settings");
        Ok(())
    }

    pub fn subscribe(&self) -> (crossbeam_channel::Receiver<AudioEvent>, crate::messaging::SubscriberId) {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn mixer(&self) -> &ChannelMixer {
        &self.mixer
    }

    pub fn effective_volume(&self, channel: Channel) -> f32 {
        self.mixer.effective_volume(channel)
    }

    pub fn catalog(&self) -> &ClipCatalog {
        &self.catalog
    }

    pub fn pool(&self) -> &SourcePool<B> {
        &self.pool
    }

    pub fn music_index(&self) -> usize {
        self.music_index
    }

    pub fn current_music(&self) -> Option<&Clip> {
        self.music.as_ref().and_then(|session| session.clip.as_ref())
    }

    pub fn music_voice(&self) -> Option<&B::Voice> {
        self.music.as_ref().map(|session| &session.voice)
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_voice().map(|voice| voice.is_playing()).unwrap_or(false)
    }

    pub fn is_game_paused(&self) -> bool {
        self.game_paused
    }

    /// One-shots still waiting for their release timer
    pub fn pending_releases(&self) -> usize {
        self.scheduler.len()
    }

    /// Game clock: total time passed to [`Self::tick`]
    pub fn clock(&self) -> Duration {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::{HeadlessBackend, VoiceState};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn catalog() -> ClipCatalog {
        ClipCatalog::new(
            vec![
                Clip::silent("menu", Duration::from_secs(90)),
                Clip::silent("level", Duration::from_secs(120)),
                Clip::silent("boss", Duration::from_secs(150)),
            ],
            vec![
                Clip::silent("hook", ms(400)),
                Clip::silent("coin", ms(250)),
                Clip::silent("engine", Duration::from_secs(3)),
            ],
        )
    }

    fn manager_with(limits: PoolLimits) -> AudioSystemManager<HeadlessBackend> {
        AudioSystemManager::init(HeadlessBackend::new(), catalog(), PrefsStore::in_memory(), limits).unwrap()
    }

    fn manager() -> AudioSystemManager<HeadlessBackend> {
        manager_with(PoolLimits {
            initial_size: 2,
            max_size: 4,
        })
    }

    #[test]
    fn test_init_applies_defaults() {
        let manager = manager();
        assert_eq!(manager.settings(), AudioSettings::default());
        assert_eq!(manager.pool().len(), 2);
        assert!(!manager.is_music_playing());
    }

    #[test]
    fn test_init_uses_saved_settings() {
        let mut prefs = PrefsStore::in_memory();
        AudioSettings {
            master_volume: 0.5,
            music_index: 2,
            ..AudioSettings::default()
        }
        .store(&mut prefs);

        let mut manager =
            AudioSystemManager::init(HeadlessBackend::new(), catalog(), prefs, PoolLimits::default()).unwrap();
        manager.start();

        assert_eq!(manager.music_index(), 2);
        assert_eq!(manager.current_music().unwrap().name(), "boss");
        assert!((manager.music_voice().unwrap().volume() - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_saved_index_out_of_range_resets() {
        let mut prefs = PrefsStore::in_memory();
        prefs.set_i64("music_index", 9);

        let manager =
            AudioSystemManager::init(HeadlessBackend::new(), catalog(), prefs, PoolLimits::default()).unwrap();
        assert_eq!(manager.music_index(), 0);
    }

    #[test]
    fn test_play_effect_auto_releases() {
        let mut manager = manager();
        let (rx, _id) = manager.subscribe();

        let handle = manager.play_effect("hook").unwrap();
        assert_eq!(manager.pool().state(handle), Some(SlotState::ActiveOneShot));
        assert!(manager.pool().voice(handle).unwrap().is_playing());

        manager.tick(ms(399));
        assert_eq!(manager.pool().state(handle), Some(SlotState::ActiveOneShot));

        manager.tick(ms(1));
        assert_eq!(manager.pool().state(handle), None);
        assert_eq!(manager.pool().active_count(), 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events[0], AudioEvent::EffectStarted { .. }));
        assert_eq!(events.last(), Some(&AudioEvent::EffectFinished { handle }));
    }

    #[test]
    fn test_play_effect_by_index() {
        let mut manager = manager();
        let handle = manager.play_effect(1usize).unwrap();
        assert_eq!(manager.pool().clip(handle).unwrap().name(), "coin");
    }

    #[test]
    fn test_play_effect_rejections() {
        let mut manager = manager();

        assert!(matches!(manager.play_effect("missing"), Err(PlayError::NotFound(_))));

        manager.set_enabled(Channel::Effect, false);
        assert!(matches!(
            manager.play_effect("hook"),
            Err(PlayError::ChannelDisabled(Channel::Effect))
        ));

        manager.set_enabled(Channel::Effect, true);
        manager.set_enabled(Channel::Master, false);
        assert!(matches!(
            manager.play_effect("hook"),
            Err(PlayError::ChannelDisabled(Channel::Master))
        ));
        assert!(manager.start_loop("engine").is_err());
        assert_eq!(manager.pool().active_count(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut manager = manager();
        for _ in 0..4 {
            manager.play_effect("coin").unwrap();
        }

        assert!(matches!(
            manager.play_effect("coin"),
            Err(PlayError::PoolExhausted { max: 4 })
        ));

        manager.tick(ms(250));
        assert!(manager.play_effect("coin").is_ok());
    }

    #[test]
    fn test_stale_timer_does_not_release_new_session() {
        let mut manager = manager_with(PoolLimits {
            initial_size: 1,
            max_size: 1,
        });

        let first = manager.play_effect("coin").unwrap();
        manager.stop_all();
        assert_eq!(manager.pool().state(first), None);

        // Reuses the same slot; the pending timer belongs to the old session
        let looped = manager.start_loop("engine").unwrap();
        assert_eq!(looped.index(), first.index());

        manager.tick(ms(250));
        assert_eq!(
            manager.pool().state(looped),
            Some(SlotState::ActiveLoop { paused: false })
        );
        assert_eq!(manager.pending_releases(), 0);
    }

    #[test]
    fn test_loop_lifecycle() {
        let mut manager = manager();
        let handle = manager.start_loop("engine").unwrap();

        manager.tick(Duration::from_secs(60));
        assert!(manager.pool().voice(handle).unwrap().is_looping());
        assert!(manager.pool().voice(handle).unwrap().is_playing());

        manager.pause_loop(handle).unwrap();
        assert_eq!(manager.pool().state(handle), Some(SlotState::ActiveLoop { paused: true }));
        assert!(manager.pool().voice(handle).unwrap().is_paused());

        manager.resume_loop(handle).unwrap();
        assert!(manager.pool().voice(handle).unwrap().is_playing());

        manager.stop_loop(handle).unwrap();
        assert_eq!(manager.pool().state(handle), None);
        assert!(matches!(manager.stop_loop(handle), Err(PlayError::UnknownHandle(_))));
        assert!(manager.pause_loop(handle).is_err());
    }

    #[test]
    fn test_stop_loop_ignores_one_shots() {
        let mut manager = manager();
        let handle = manager.play_effect("hook").unwrap();
        assert!(manager.stop_loop(handle).is_err());
        assert_eq!(manager.pool().state(handle), Some(SlotState::ActiveOneShot));
    }

    #[test]
    fn test_play_music_same_index_no_restart() {
        let mut manager = manager();
        manager.play_music(1).unwrap();
        manager.play_music(1).unwrap();

        let voice = manager.music_voice().unwrap();
        assert_eq!(voice.starts(), 1);
        assert!(voice.is_looping());

        manager.play_music(2).unwrap();
        assert_eq!(manager.music_voice().unwrap().starts(), 2);
        assert_eq!(manager.current_music().unwrap().name(), "boss");
    }

    #[test]
    fn test_play_music_out_of_range() {
        let mut manager = manager();
        assert!(matches!(
            manager.play_music(3),
            Err(PlayError::MusicIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(manager.current_music().is_none());
    }

    #[test]
    fn test_next_previous_wrap() {
        let mut manager = manager();
        manager.start();
        assert_eq!(manager.music_index(), 0);

        manager.previous_music().unwrap();
        assert_eq!(manager.music_index(), 2);
        manager.next_music().unwrap();
        assert_eq!(manager.music_index(), 0);
        manager.next_music().unwrap();
        assert_eq!(manager.music_index(), 1);
    }

    #[test]
    fn test_music_disabled_loads_without_playing() {
        let mut manager = manager();
        manager.set_enabled(Channel::Music, false);
        manager.play_music(1).unwrap();

        assert_eq!(manager.current_music().unwrap().name(), "level");
        assert!(!manager.is_music_playing());

        manager.set_enabled(Channel::Music, true);
        assert!(manager.is_music_playing());
    }

    #[test]
    fn test_music_toggle_stops_immediately() {
        let mut manager = manager();
        manager.start();
        assert!(manager.is_music_playing());

        manager.set_enabled(Channel::Music, false);
        assert_eq!(manager.music_voice().unwrap().state(), VoiceState::Stopped);
    }

    #[test]
    fn test_effect_toggle_does_not_stop_effects() {
        let mut manager = manager();
        manager.set_volume(Channel::Effect, 0.5);
        let handle = manager.play_effect("hook").unwrap();
        assert_eq!(manager.pool().voice(handle).unwrap().volume(), 0.5);

        manager.set_enabled(Channel::Effect, false);
        let voice = manager.pool().voice(handle).unwrap();
        assert!(voice.is_playing());
        assert_eq!(voice.volume(), 0.0);

        manager.set_enabled(Channel::Effect, true);
        assert_eq!(manager.pool().voice(handle).unwrap().volume(), 0.5);
    }

    #[test]
    fn test_master_volume_propagates() {
        let mut manager = manager();
        manager.start();
        let handle = manager.play_effect("hook").unwrap();

        manager.set_volume(Channel::Master, 0.5);
        assert!((manager.music_voice().unwrap().volume() - 0.35).abs() < 1e-6);
        assert_eq!(manager.pool().voice(handle).unwrap().volume(), 0.5);

        manager.set_volume(Channel::Music, 2.0);
        assert_eq!(manager.mixer().volume(Channel::Music), 1.0);
        assert_eq!(manager.music_voice().unwrap().volume(), 0.5);
        assert_eq!(manager.pool().voice(handle).unwrap().volume(), 0.5);
    }

    #[test]
    fn test_game_pause_holds_music_and_loops() {
        let mut manager = manager();
        manager.start();
        let looped = manager.start_loop("engine").unwrap();
        let one_shot = manager.play_effect("hook").unwrap();

        manager.pause_game();
        assert!(manager.is_game_paused());

        let music = manager.music_voice().unwrap();
        assert!(music.is_paused());
        assert_eq!(music.volume(), 0.0);

        let loop_voice = manager.pool().voice(looped).unwrap();
        assert!(loop_voice.is_paused());
        assert_eq!(loop_voice.volume(), 0.0);

        // One-shots are untouched and new ones may start
        assert!(manager.pool().voice(one_shot).unwrap().is_playing());
        let during = manager.play_effect("coin").unwrap();
        assert!(manager.pool().voice(during).unwrap().is_playing());

        // Volume changes don't leak through the pause
        manager.set_volume(Channel::Master, 0.8);
        assert_eq!(manager.music_voice().unwrap().volume(), 0.0);
        assert_eq!(manager.pool().voice(looped).unwrap().volume(), 0.0);

        assert!(matches!(manager.resume_loop(looped), Err(PlayError::GamePaused)));

        manager.resume_game();
        let music = manager.music_voice().unwrap();
        assert!(music.is_playing());
        assert_eq!(music.starts(), 1);
        assert!(manager.pool().voice(looped).unwrap().is_playing());
        assert!((manager.pool().voice(looped).unwrap().volume() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_resume_does_not_start_music_that_was_stopped() {
        let mut manager = manager();
        manager.play_music(0).unwrap();
        manager.stop_music();

        manager.pause_game();
        manager.resume_game();
        assert!(!manager.is_music_playing());
    }

    #[test]
    fn test_user_paused_loop_stays_paused_after_resume() {
        let mut manager = manager();
        let handle = manager.start_loop("engine").unwrap();
        manager.pause_loop(handle).unwrap();

        manager.pause_game();
        manager.resume_game();
        assert!(manager.pool().voice(handle).unwrap().is_paused());
    }

    #[test]
    fn test_loop_started_during_pause_waits_for_resume() {
        let mut manager = manager();
        manager.pause_game();
        let handle = manager.start_loop("engine").unwrap();
        assert!(manager.pool().voice(handle).unwrap().is_paused());

        manager.resume_game();
        assert!(manager.pool().voice(handle).unwrap().is_playing());
    }

    #[test]
    fn test_music_switch_during_pause() {
        let mut manager = manager();
        manager.start();
        manager.pause_game();

        manager.play_music(1).unwrap();
        assert!(!manager.is_music_playing());

        manager.resume_game();
        assert!(manager.is_music_playing());
        assert_eq!(manager.current_music().unwrap().name(), "level");
    }

    #[test]
    fn test_stop_all() {
        let mut manager = manager();
        manager.start();
        manager.play_effect("hook").unwrap();
        manager.start_loop("engine").unwrap();

        manager.stop_all();
        assert_eq!(manager.pool().active_count(), 0);
        assert!(!manager.is_music_playing());
    }

    #[test]
    fn test_stop_all_cancels_release_timers() {
        let mut manager = manager();
        let (rx, _id) = manager.subscribe();
        manager.play_effect("hook").unwrap();
        manager.play_effect("coin").unwrap();
        assert_eq!(manager.pending_releases(), 2);

        manager.stop_all();
        assert_eq!(manager.pending_releases(), 0);

        manager.tick(Duration::from_secs(1));
        assert!(!rx
            .try_iter()
            .any(|e| matches!(e, AudioEvent::EffectFinished { .. })));
    }

    #[test]
    fn test_fired_timer_is_forgotten() {
        let mut manager = manager();
        manager.play_effect("coin").unwrap();
        manager.tick(ms(250));
        assert_eq!(manager.pending_releases(), 0);
        assert!(manager.release_timers.is_empty());
    }

    #[test]
    fn test_master_reenable_starts_music_left_silent() {
        let mut prefs = PrefsStore::in_memory();
        AudioSettings {
            master_enabled: false,
            ..AudioSettings::default()
        }
        .store(&mut prefs);

        let mut manager =
            AudioSystemManager::init(HeadlessBackend::new(), catalog(), prefs, PoolLimits::default()).unwrap();
        manager.start();
        assert!(!manager.is_music_playing());

        manager.set_enabled(Channel::Master, true);
        assert!(manager.is_music_playing());
        assert!((manager.music_voice().unwrap().volume() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_master_toggle_does_not_restart_music() {
        let mut manager = manager();
        manager.start();

        manager.set_enabled(Channel::Master, false);
        assert!(manager.is_music_playing());
        assert_eq!(manager.music_voice().unwrap().volume(), 0.0);

        manager.set_enabled(Channel::Master, true);
        assert_eq!(manager.music_voice().unwrap().starts(), 1);
        assert!((manager.music_voice().unwrap().volume() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_master_reenable_during_pause_waits_for_resume() {
        let mut manager = manager();
        manager.set_enabled(Channel::Master, false);
        manager.start();
        manager.pause_game();

        manager.set_enabled(Channel::Master, true);
        assert!(!manager.is_music_playing());

        manager.resume_game();
        assert!(manager.is_music_playing());
        assert_eq!(manager.music_voice().unwrap().starts(), 1);
    }

    #[test]
    fn test_load_settings_starts_saved_track_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut manager = AudioSystemManager::init(
            HeadlessBackend::new(),
            catalog(),
            PrefsStore::open(&path).unwrap(),
            PoolLimits::default(),
        )
        .unwrap();
        manager.start();
        assert_eq!(manager.music_voice().unwrap().starts(), 1);

        let mut saved = PrefsStore::open(&path).unwrap();
        AudioSettings {
            music_index: 2,
            ..AudioSettings::default()
        }
        .store(&mut saved);
        saved.save().unwrap();

        manager.load_settings().unwrap();
        assert_eq!(manager.current_music().unwrap().name(), "boss");
        assert_eq!(manager.music_voice().unwrap().starts(), 2);
    }

    /// Voices that can be created but never decode anything
    struct BrokenBackend;

    struct BrokenVoice;

    impl Voice for BrokenVoice {
        fn start(&mut self, _clip: &Clip, _looping: bool) -> Result<(), AudioError> {
            Err(AudioError::InvalidFormat("unreadable".to_string()))
        }
        fn stop(&mut self) {}
        fn pause(&mut self) {}
        fn resume(&mut self) {}
        fn set_volume(&mut self, _volume: f32) {}
        fn volume(&self) -> f32 {
            0.0
        }
        fn state(&self) -> VoiceState {
            VoiceState::Stopped
        }
    }

    impl PlaybackBackend for BrokenBackend {
        type Voice = BrokenVoice;

        fn create_voice(&mut self) -> Result<BrokenVoice, AudioError> {
            Ok(BrokenVoice)
        }
    }

    #[test]
    fn test_failed_start_frees_slot() {
        let mut manager =
            AudioSystemManager::init(BrokenBackend, catalog(), PrefsStore::in_memory(), PoolLimits::default())
                .unwrap();

        assert!(matches!(manager.play_effect("hook"), Err(PlayError::Backend(_))));
        assert!(matches!(manager.start_loop("engine"), Err(PlayError::Backend(_))));
        assert_eq!(manager.pool().active_count(), 0);
        assert_eq!(manager.pending_releases(), 0);
    }

    #[test]
    fn test_save_and_load_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = PrefsStore::open(&path).unwrap();
        let mut manager =
            AudioSystemManager::init(HeadlessBackend::new(), catalog(), prefs, PoolLimits::default()).unwrap();
        manager.set_volume(Channel::Effect, 0.25);
        manager.set_enabled(Channel::Music, false);
        manager.play_music(2).unwrap();
        manager.save_settings().unwrap();

        let prefs = PrefsStore::open(&path).unwrap();
        let settings = AudioSettings::load(&prefs);
        assert_eq!(settings.effect_volume, 0.25);
        assert!(!settings.music_enabled);
        assert_eq!(settings.music_index, 2);

        manager.set_volume(Channel::Effect, 1.0);
        manager.load_settings().unwrap();
        assert_eq!(manager.mixer().volume(Channel::Effect), 0.25);
    }
}
