/*
Note Identity and Frequency Table
=================================

A note is a pitch class plus an octave number. The pair is the key the voice
manager uses to enforce one voice per sounding note.

Equal Temperament
-----------------

Each octave is split into twelve equal semitone steps. The reference pitch is
A4 = 440 Hz, and every other pitch is a power-of-two offset from it:

    f = 440 * 2^((semitone - 9) / 12) * 2^(octave - 4)

where semitone counts up from C (C=0, C#=1, ... A=9, ... B=11).

  Note   Semitone   Octave 4 (Hz)
  C      0          261.63
  C#     1          277.18
  D      2          293.66
  D#     3          311.13
  E      4          329.63
  F      5          349.23
  F#     6          369.99
  G      7          392.00
  G#     8          415.30
  A      9          440.00
  A#     10         466.16
  B      11         493.88

Moving up an octave doubles the frequency, so C5 = 523.25 Hz and A5 = 880 Hz.

MIDI numbering is provided for interop: note_number = 12 * (octave + 1) + semitone,
which puts middle C (C4) at 60 and A4 at 69.
*/

use std::fmt;
use std::ops::RangeInclusive;

/// Octaves the keyboard can be shifted across.
pub const OCTAVE_RANGE: RangeInclusive<u8> = 1..=7;

/// Octave that holds the A440 tuning reference.
pub const REFERENCE_OCTAVE: u8 = 4;

/// Tuning reference for A in the reference octave.
pub const REFERENCE_HZ: f64 = 440.0;

const A_SEMITONE: i32 = 9;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn from_semitone(semitone: u8) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Sharps sit on the black keys.
    pub fn is_black(self) -> bool {
        matches!(
            self,
            PitchClass::Cs | PitchClass::Ds | PitchClass::Fs | PitchClass::Gs | PitchClass::As
        )
    }
}

/// A playable pitch: pitch class within a specific octave.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId {
    // Field order gives Ord by octave first, so sets iterate low to high.
    pub octave: u8,
    pub pitch: PitchClass,
}

impl NoteId {
    pub const fn new(pitch: PitchClass, octave: u8) -> Self {
        Self { octave, pitch }
    }

    /// Fundamental frequency in Hz.
    pub fn frequency(self) -> f32 {
        frequency_of(self.pitch, self.octave)
    }

    /// MIDI note number (C4 = 60). `None` above G9, the top of the MIDI range.
    pub fn midi(self) -> Option<u8> {
        let number = 12 * (self.octave as u16 + 1) + self.pitch.semitone() as u16;
        u8::try_from(number).ok().filter(|&n| n <= 127)
    }

    /// Inverse of [`NoteId::midi`]. Notes below C0 (MIDI 12) have no octave
    /// number here and return `None`.
    pub fn from_midi(note: u8) -> Option<Self> {
        if note < 12 {
            return None;
        }
        Some(Self::new(PitchClass::from_semitone(note % 12), note / 12 - 1))
    }

    /// Same pitch class, shifted by whole octaves (saturating at 0).
    pub fn transpose_octaves(self, octaves: i8) -> Self {
        let octave = (self.octave as i16 + octaves as i16).clamp(0, u8::MAX as i16) as u8;
        Self::new(self.pitch, octave)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.name(), self.octave)
    }
}

/// Equal-tempered frequency for a pitch class in the given octave.
///
/// Pure and total. Octave range checks belong to the caller.
pub fn frequency_of(pitch: PitchClass, octave: u8) -> f32 {
    let semitones = pitch.semitone() as i32 - A_SEMITONE;
    let octaves = octave as i32 - REFERENCE_OCTAVE as i32;
    let exponent = semitones as f64 / 12.0 + octaves as f64;
    (REFERENCE_HZ * 2.0_f64.powf(exponent)) as f32
}
