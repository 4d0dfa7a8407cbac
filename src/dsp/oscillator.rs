use std::f32::consts::TAU;

use super::RenderCtx;

/*
Audio Oscillator
================

An oscillator is the sound source of every voice. It generates a repeating
waveform at the note's frequency; the envelope then shapes its loudness.

Waveform Types and Their Character:
-----------------------------------

Sine: The purest tone - a single frequency with no harmonics.
  - Sound: Smooth, hollow, flute-like

Square: Hollow but powerful - only odd harmonics (1/n falloff).
  - Sound: Hollow, woody, clarinet-like

Sawtooth: The richest waveform - all harmonics (1/n falloff).
  - Sound: Bright, buzzy, brassy

Triangle: Mellow and soft - odd harmonics falling off as 1/n².
  - Sound: Soft, between sine and square

Phase Accumulator
-----------------

The oscillator keeps a phase in [0, 1) that advances by frequency / sample_rate
every sample and wraps at 1. Each waveform is a function of that phase:

  sine      sin(2π·phase)
  square    +1 for phase < 0.5, -1 otherwise
  sawtooth  2·phase - 1
  triangle  1 - 4·|frac(phase + 0.25) - 0.5|   (in phase with the sine)

These shapes are not band-limited, so high notes alias. Fine for a keyboard
topping out around 4 kHz fundamentals.

Phase is reset on note start, so every sine voice begins at a zero crossing.
*/

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Cycle to the next shape (wraps).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&w| w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Value of this waveform at `phase` in [0, 1).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                let shifted = (phase + 0.25).fract();
                1.0 - 4.0 * (shifted - 0.5).abs()
            }
        }
    }
}

impl std::str::FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(format!("unknown waveform '{other}'")),
        }
    }
}

pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn square() -> Self {
        Self::new(Waveform::Square)
    }

    pub fn sawtooth() -> Self {
        Self::new(Waveform::Sawtooth)
    }

    pub fn triangle() -> Self {
        Self::new(Waveform::Triangle)
    }

    /// Restart with a new shape at phase zero.
    pub fn reset(&mut self, waveform: Waveform) {
        self.waveform = waveform;
        self.phase = 0.0;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Produce one sample and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, ctx: &RenderCtx) -> f32 {
        let value = self.waveform.sample(self.phase);
        self.phase += ctx.frequency / ctx.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }

    /// Fill `out` with one block of oscillator output.
    pub fn render(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(ctx);
        }
    }
}
