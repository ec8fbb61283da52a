//! Source pool
//!
//! Bounded freelist of reusable voices. Slots are created up front to an
//! initial count, grown on demand up to a hard maximum, and never shrunk.

use std::fmt;

use super::backend::{PlaybackBackend, Voice};
use super::catalog::Clip;
use crate::error::{AudioError, PlayError};

/// Reference to one acquisition of a slot.
///
/// The generation changes every time the slot is handed out, so a handle kept
/// past its session's end never aliases the next session on the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: u32,
    generation: u32,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    OneShot,
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    ActiveOneShot,
    /// `paused` tracks an explicit `pause_loop`, not game pause
    ActiveLoop { paused: bool },
}

impl SlotState {
    pub fn is_active(&self) -> bool {
        !matches!(self, SlotState::Idle)
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, SlotState::ActiveLoop { .. })
    }
}

struct Slot<V> {
    voice: V,
    state: SlotState,
    generation: u32,
    clip: Option<Clip>,
}

pub struct SourcePool<B: PlaybackBackend> {
    backend: B,
    slots: Vec<Slot<B::Voice>>,
    free: Vec<usize>,
    max_size: usize,
}

impl<B: PlaybackBackend> SourcePool<B> {
    /// Create the pool with `initial_size` voices ready to go
    pub fn new(mut backend: B, initial_size: usize, max_size: usize) -> Result<Self, AudioError> {
        let initial_size = if initial_size > max_size {
            tracing::warn!(
                "Initial pool size {} exceeds maximum {}, clamping",
                initial_size,
                max_size
            );
            max_size
        } else {
            initial_size
        };

        let mut slots = Vec::with_capacity(max_size);
        for _ in 0..initial_size {
            slots.push(Slot {
                voice: backend.create_voice()?,
                state: SlotState::Idle,
                generation: 0,
                clip: None,
            });
        }

        // Reversed so the first slots are handed out first
        let free = (0..initial_size).rev().collect();

        tracing::debug!("Source pool ready: {} of max {} slots", initial_size, max_size);

        Ok(Self {
            backend,
            slots,
            free,
            max_size,
        })
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Hand out an idle slot, growing the pool if allowed
    pub fn acquire(&mut self, kind: SessionKind) -> Result<SlotHandle, PlayError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.max_size => {
                let voice = self.backend.create_voice()?;
                self.slots.push(Slot {
                    voice,
                    state: SlotState::Idle,
                    generation: 0,
                    clip: None,
                });
                tracing::debug!("Grew source pool to {} slots", self.slots.len());
                self.slots.len() - 1
            }
            None => {
                tracing::warn!(
                    "Audio source pool exhausted: all {} slots active, request dropped",
                    self.max_size
                );
                return Err(PlayError::PoolExhausted { max: self.max_size });
            }
        };

        let slot = &mut self.slots[index];
        debug_assert_eq!(slot.state, SlotState::Idle);

        slot.generation = slot.generation.wrapping_add(1);
        slot.state = match kind {
            SessionKind::OneShot => SlotState::ActiveOneShot,
            SessionKind::Loop => SlotState::ActiveLoop { paused: false },
        };

        Ok(SlotHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Return a one-shot slot to the free list.
    ///
    /// Loop slots are left untouched; they must go through [`Self::release_loop`].
    pub fn release(&mut self, handle: SlotHandle) -> Result<(), PlayError> {
        let Some(slot) = self.active_slot_mut(handle) else {
            tracing::warn!("Release of unknown or inactive slot {}", handle);
            return Err(PlayError::UnknownHandle(handle));
        };

        if slot.state.is_loop() {
            tracing::warn!("Slot {} is looping; stop the loop before releasing it", handle);
            return Err(PlayError::LoopActive(handle));
        }

        self.free_slot(handle.index());
        Ok(())
    }

    /// Clear the loop marker and return the slot to the free list
    pub fn release_loop(&mut self, handle: SlotHandle) -> Result<(), PlayError> {
        match self.state(handle) {
            Some(SlotState::ActiveLoop { .. }) => {
                self.free_slot(handle.index());
                Ok(())
            }
            _ => Err(PlayError::UnknownHandle(handle)),
        }
    }

    fn free_slot(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.voice.stop();
        slot.clip = None;
        slot.state = SlotState::Idle;
        self.free.push(index);
    }

    fn active_slot(&self, handle: SlotHandle) -> Option<&Slot<B::Voice>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation && slot.state.is_active())
    }

    fn active_slot_mut(&mut self, handle: SlotHandle) -> Option<&mut Slot<B::Voice>> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation && slot.state.is_active())
    }

    /// State of the session behind `handle`, or `None` if the handle is stale
    pub fn state(&self, handle: SlotHandle) -> Option<SlotState> {
        self.active_slot(handle).map(|slot| slot.state)
    }

    pub fn voice(&self, handle: SlotHandle) -> Option<&B::Voice> {
        self.active_slot(handle).map(|slot| &slot.voice)
    }

    pub fn voice_mut(&mut self, handle: SlotHandle) -> Option<&mut B::Voice> {
        self.active_slot_mut(handle).map(|slot| &mut slot.voice)
    }

    pub fn clip(&self, handle: SlotHandle) -> Option<&Clip> {
        self.active_slot(handle).and_then(|slot| slot.clip.as_ref())
    }

    pub fn bind_clip(&mut self, handle: SlotHandle, clip: Clip) {
        if let Some(slot) = self.active_slot_mut(handle) {
            slot.clip = Some(clip);
        }
    }

    pub fn set_loop_paused(&mut self, handle: SlotHandle, paused: bool) {
        if let Some(slot) = self.active_slot_mut(handle) {
            if slot.state.is_loop() {
                slot.state = SlotState::ActiveLoop { paused };
            }
        }
    }

    /// Every active session
    pub fn active_mut(&mut self) -> impl Iterator<Item = (SlotHandle, SlotState, &mut B::Voice)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.state.is_active())
            .map(|(index, slot)| {
                let handle = SlotHandle {
                    index: index as u32,
                    generation: slot.generation,
                };
                (handle, slot.state, &mut slot.voice)
            })
    }

    pub fn active_handles(&self) -> Vec<SlotHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state.is_active())
            .map(|(index, slot)| SlotHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    /// Total slots created so far
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
