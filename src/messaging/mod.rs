/// Messaging module for Event/Command architecture
///
/// This module implements the Event/Command segregation pattern:
/// - **Events**: Notifications of things the audio manager did (past tense, broadcast)
/// - **Commands**: Requests to the audio manager (imperative, queued)
///
/// ## Architecture
///
/// ```text
/// ┌──────────┐   AudioCommand   ┌──────────┐  calls   ┌──────────────┐
/// │ Console  │ ───────────────> │ Executor │ ───────> │ AudioSystem  │
/// │ / Menus  │                  │          │          │   Manager    │
/// └──────────┘                  └──────────┘          └──────────────┘
///                                                             │
///                                                             │ AudioEvent
///                                                             ▼
///                                                      ┌─────────────┐
///                                                      │  Event Bus  │ ──> UI, logs
///                                                      └─────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let (rx, _id) = manager.subscribe();
///
/// let executor = CommandExecutor::new();
/// let sender = executor.sender();
/// sender.send("effect hook".parse()?)?;
///
/// // On the tick thread
/// let running = executor.process_pending(&mut manager, |result| {
///     if let CommandResult::Error(e) = result {
///         eprintln!("{}", e);
///     }
/// });
///
/// while let Ok(event) = rx.try_recv() {
///     println!("{}", event.description());
/// }
/// ```

pub mod bus;
pub mod commands;
pub mod events;
pub mod executor;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::{AudioCommand, CommandResult};
pub use events::AudioEvent;
pub use executor::CommandExecutor;
