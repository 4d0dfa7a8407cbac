//! Input binding: turns key and pointer events into note on/off calls.
//!
//! The binding remembers which note each key or pointer press actually
//! triggered, so lifting a key after the octave changed releases the note that
//! is sounding rather than the note the key would play now.

pub mod keymap;

use std::collections::HashMap;

use tracing::warn;

use crate::{note::NoteId, synth::VoiceManager};

pub use keymap::{KeyBinding, KEY_MAP};

#[derive(Debug, Default)]
pub struct InputBinding {
    keys: HashMap<char, NoteId>,
    pointer: Option<(usize, NoteId)>,
}

impl InputBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key pressed. Auto-repeat presses are ignored. Returns the note
    /// triggered, if any.
    pub fn key_down(
        &mut self,
        manager: &mut VoiceManager,
        key: char,
        repeat: bool,
    ) -> Option<NoteId> {
        if repeat {
            return None;
        }
        let binding = keymap::lookup(key)?;
        if self.keys.contains_key(&binding.key) {
            return None;
        }

        let note = binding.note(manager.settings().octave());
        self.keys.insert(binding.key, note);
        trigger(manager, note);
        Some(note)
    }

    /// Key lifted. Returns the note released, if any.
    pub fn key_up(&mut self, manager: &mut VoiceManager, key: char) -> Option<NoteId> {
        let binding = keymap::lookup(key)?;
        let note = self.keys.remove(&binding.key)?;
        self.release_unless_held(manager, note);
        Some(note)
    }

    /// Pointer pressed on key region `region` (index into [`KEY_MAP`]).
    pub fn pointer_down(&mut self, manager: &mut VoiceManager, region: usize) -> Option<NoteId> {
        let binding = keymap::region(region)?;
        match self.pointer {
            Some((current, note)) if current == region => return Some(note),
            Some(_) => {
                self.pointer_up(manager);
            }
            None => {}
        }

        let note = binding.note(manager.settings().octave());
        self.pointer = Some((region, note));
        trigger(manager, note);
        Some(note)
    }

    /// Pointer lifted anywhere.
    pub fn pointer_up(&mut self, manager: &mut VoiceManager) -> Option<NoteId> {
        let (_, note) = self.pointer.take()?;
        self.release_unless_held(manager, note);
        Some(note)
    }

    /// Pointer dragged off the region it pressed. Same as lifting it.
    pub fn pointer_leave(&mut self, manager: &mut VoiceManager) -> Option<NoteId> {
        self.pointer_up(manager)
    }

    /// Region the pointer is currently holding.
    pub fn pointer_region(&self) -> Option<usize> {
        self.pointer.map(|(region, _)| region)
    }

    /// Release everything this binding is holding (focus lost, exit).
    pub fn release_all(&mut self, manager: &mut VoiceManager) {
        let keys: Vec<char> = self.keys.keys().copied().collect();
        for key in keys {
            self.key_up(manager, key);
        }
        self.pointer_up(manager);
    }

    /// Keys currently held down, with the note each one triggered.
    pub fn held_keys(&self) -> impl Iterator<Item = (char, NoteId)> + '_ {
        self.keys.iter().map(|(&key, &note)| (key, note))
    }

    fn is_held(&self, note: NoteId) -> bool {
        self.keys.values().any(|&n| n == note) || self.pointer.is_some_and(|(_, n)| n == note)
    }

    /// A note pressed by both a key and the pointer keeps sounding until the
    /// last of them lets go.
    fn release_unless_held(&self, manager: &mut VoiceManager, note: NoteId) {
        if self.is_held(note) {
            return;
        }
        if let Err(err) = manager.release(note) {
            warn!(%note, %err, "Note release was not delivered");
        }
    }
}

fn trigger(manager: &mut VoiceManager, note: NoteId) {
    if let Err(err) = manager.play(note) {
        warn!(%note, %err, "Note did not sound");
    }
}
