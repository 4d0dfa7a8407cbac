//! Player-facing configuration: waveform, volume, envelope times and octave.
//!
//! Every setter clamps to the documented range, so values reaching the engine
//! are already valid. Voices copy what they need at trigger (and release)
//! time; changing a setting never alters a note that is already sounding.

use std::ops::RangeInclusive;

use crate::dsp::{EnvelopeParameters, Waveform};
use crate::note::OCTAVE_RANGE;

pub const PEAK_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const ATTACK_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const RELEASE_RANGE: RangeInclusive<f32> = 0.0..=2.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    waveform: Waveform,
    peak_level: f32,
    attack: f32,
    release: f32,
    octave: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            peak_level: 0.3,
            attack: 0.01,
            release: 0.3,
            octave: 4,
        }
    }
}

/// Clamp into `range`; NaN maps to the low end.
fn clamp_f32(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.set_waveform(waveform);
        self
    }

    pub fn with_peak_level(mut self, peak: f32) -> Self {
        self.set_peak_level(peak);
        self
    }

    pub fn with_attack(mut self, seconds: f32) -> Self {
        self.set_attack(seconds);
        self
    }

    pub fn with_release(mut self, seconds: f32) -> Self {
        self.set_release(seconds);
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.set_octave(octave);
        self
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn peak_level(&self) -> f32 {
        self.peak_level
    }

    pub fn set_peak_level(&mut self, peak: f32) {
        self.peak_level = clamp_f32(peak, &PEAK_RANGE);
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = clamp_f32(seconds, &ATTACK_RANGE);
    }

    pub fn release(&self) -> f32 {
        self.release
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release = clamp_f32(seconds, &RELEASE_RANGE);
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Takes a signed value so `octave - 1` from a UI button can't underflow.
    pub fn set_octave(&mut self, octave: i32) {
        let lo = *OCTAVE_RANGE.start() as i32;
        let hi = *OCTAVE_RANGE.end() as i32;
        self.octave = octave.clamp(lo, hi) as u8;
    }

    pub fn shift_octave(&mut self, delta: i32) {
        self.set_octave(self.octave as i32 + delta);
    }

    /// Envelope shape for a voice triggered now.
    pub fn envelope(&self) -> EnvelopeParameters {
        EnvelopeParameters::new(self.attack, self.release, self.peak_level)
    }
}
