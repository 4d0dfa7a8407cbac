/*
Computer Keyboard Layout
========================

One visible octave plus the next C, laid out like a piano on the home row
(white keys) and the row above it (black keys):

      w   e       t   y   u
    a   s   d   f   g   h   j   k
    C C# D D# E F F# G G# A A# B C'

`k` plays C one octave above the current octave setting.
*/

use crate::note::{NoteId, PitchClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: char,
    pub pitch: PitchClass,
    /// Octaves above the current octave setting.
    pub octave_offset: u8,
}

impl KeyBinding {
    const fn new(key: char, pitch: PitchClass, octave_offset: u8) -> Self {
        Self {
            key,
            pitch,
            octave_offset,
        }
    }

    /// The note this key plays with the keyboard at `octave`.
    pub fn note(&self, octave: u8) -> NoteId {
        NoteId::new(self.pitch, octave.saturating_add(self.octave_offset))
    }
}

/// Fixed key table, in on-screen order. Pointer regions index into this.
pub const KEY_MAP: [KeyBinding; 13] = [
    KeyBinding::new('a', PitchClass::C, 0),
    KeyBinding::new('w', PitchClass::Cs, 0),
    KeyBinding::new('s', PitchClass::D, 0),
    KeyBinding::new('e', PitchClass::Ds, 0),
    KeyBinding::new('d', PitchClass::E, 0),
    KeyBinding::new('f', PitchClass::F, 0),
    KeyBinding::new('t', PitchClass::Fs, 0),
    KeyBinding::new('g', PitchClass::G, 0),
    KeyBinding::new('y', PitchClass::Gs, 0),
    KeyBinding::new('h', PitchClass::A, 0),
    KeyBinding::new('u', PitchClass::As, 0),
    KeyBinding::new('j', PitchClass::B, 0),
    KeyBinding::new('k', PitchClass::C, 1),
];

/// Binding for a typed character (case-insensitive).
pub fn lookup(key: char) -> Option<&'static KeyBinding> {
    let key = key.to_ascii_lowercase();
    KEY_MAP.iter().find(|b| b.key == key)
}

/// Binding for an on-screen key region.
pub fn region(index: usize) -> Option<&'static KeyBinding> {
    KEY_MAP.get(index)
}
