//! Audio system module
//!
//! Mixing and pooled playback for a game:
//! - A bounded pool of reusable voices for sound effects
//! - Master / music / effect channels with volume and enable flags
//! - One-shot effects that free their slot when the clip ends
//! - Loops that hold their slot until explicitly stopped
//! - A dedicated looping music session
//!
//! ## Architecture
//!
//! ```text
//! AudioSystemManager
//!   ├── ChannelMixer (Master × Music / Master × Effect)
//!   ├── MusicSession  (dedicated voice)
//!   ├── SourcePool
//!   │     ├── Slot 0  Idle
//!   │     ├── Slot 1  ActiveOneShot ──┐
//!   │     └── Slot 2  ActiveLoop      │
//!   └── Scheduler  ◄──────────────────┘ release at clock + clip duration
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let catalog = ClipCatalog::load_dir(Path::new("clips"))?;
//! let prefs = PrefsStore::open("prefs.json")?;
//! let mut audio = AudioSystemManager::init(RodioBackend::new()?, catalog, prefs, PoolLimits::default())?;
//! audio.start();
//!
//! audio.play_effect("hook")?;
//! let engine = audio.start_loop("engine")?;
//!
//! // Once per frame
//! audio.tick(frame_delta);
//!
//! audio.stop_loop(engine)?;
//! audio.shutdown();
//! ```

pub mod backend;
pub mod catalog;
pub mod channel;
pub mod manager;
pub mod mixer;
pub mod player;
pub mod pool;
pub mod scheduler;
pub mod settings;

// Re-export commonly used types
pub use backend::{HeadlessBackend, HeadlessVoice, PlaybackBackend, Voice, VoiceState};
pub use catalog::{Clip, ClipCatalog, ClipRef};
pub use channel::{Channel, ChannelState};
pub use manager::{AudioSystemManager, PoolLimits};
pub use mixer::ChannelMixer;
pub use player::{RodioBackend, RodioVoice};
pub use pool::{SessionKind, SlotHandle, SlotState, SourcePool};
pub use scheduler::{Scheduler, TimerId};
pub use settings::{AudioSettings, PrefValue, PrefsStore};
