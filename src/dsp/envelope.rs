use std::time::Duration;

use super::RenderCtx;

/*
Attack/Sustain/Release Envelope
===============================

This module implements the amplitude envelope used by every voice: a linear
attack to a peak level, an indefinite hold at that peak while the key is
down, and a linear release to silence once the key is let go.

Vocabulary
----------

  level       The envelope's current output value (0.0 to peak). This
              multiplies the oscillator output to control loudness.

  peak        The level reached at the end of the attack and held while the
              note is sustained. This is the instrument's volume setting.

  stage       Which phase we're in: Idle, Attack, Sustain, or Release.

  gate        Note on/off. Gate high (note_on) starts Attack. Gate low
              (note_off) starts Release from wherever we are.


The Shape
---------

  Level
   peak ┐    ╱‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾╲
        │   ╱                 ╲
        │  ╱                   ╲
    0.0 └─╱─────────────────────╲──→ Time
         Attack    Sustain     Release
          (A)    (held gate)     (R)

There is no decay stage: this is a sustained-tone keyboard, so the level
sits at peak for as long as the key is held.


Release From the Current Level
------------------------------

A key released halfway through the attack has not reached peak yet. Release
always ramps down from the level actually reached, over the full release
time:

  Level
   peak ┐
        │
   0.5p │    ╱╲
        │   ╱  ╲
    0.0 └──╱────╲───→ Time
           A/2   R

Jumping to peak first (or ramping from peak) would click.


Time Model
----------

The pure functions on `EnvelopeParameters` map elapsed seconds to a level.
`Envelope` is the sample-driven version run on the audio thread: it counts
samples per stage and evaluates those same functions, so the attack lands on
peak exactly `attack * sample_rate` samples after note_on and the release
lands on zero exactly `release * sample_rate` samples after note_off.

Zero-length stages are instant: attack = 0 starts at peak, release = 0
drops to zero on the next sample.


The State Machine
-----------------

    ┌──────┐  note_on   ┌────────┐  t >= A   ┌─────────┐
    │ Idle │ ─────────→ │ Attack │ ────────→ │ Sustain │
    └──────┘            └────────┘           └─────────┘
        ↑                    │ note_off           │ note_off
        │                    ↓                    │
        │    t >= R     ┌─────────┐               │
        └────────────── │ Release │ ←─────────────┘
                        └─────────┘
*/

/// Shape of one voice's envelope. Copied into the voice when it starts so
/// later settings changes never reach notes already sounding.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParameters {
    /// Seconds to ramp 0 → peak.
    pub attack: f32,
    /// Seconds to ramp the release-start level → 0.
    pub release: f32,
    /// Level held while sustained (0.0 - 1.0).
    pub peak: f32,
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self {
            attack: 0.01,
            release: 0.3,
            peak: 0.3,
        }
    }
}

impl EnvelopeParameters {
    pub fn new(attack: f32, release: f32, peak: f32) -> Self {
        Self {
            attack,
            release,
            peak,
        }
    }

    /// Level `elapsed` seconds after note on, while the gate is still high.
    ///
    /// Covers both Attack and Sustain: the ramp ends at peak and stays there.
    pub fn attack_level(&self, elapsed: f32) -> f32 {
        let elapsed = non_negative(elapsed);
        if self.attack <= 0.0 || elapsed >= self.attack {
            self.peak
        } else {
            self.peak * (elapsed / self.attack)
        }
    }

    /// Level `elapsed` seconds after note off, given the level at note off.
    pub fn release_level(&self, start_level: f32, elapsed: f32) -> f32 {
        let elapsed = non_negative(elapsed);
        if self.release <= 0.0 || elapsed >= self.release {
            0.0
        } else {
            (start_level * (1.0 - elapsed / self.release)).max(0.0)
        }
    }

    /// How long a note keeps sounding after key-up.
    pub fn release_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.release.max(0.0)).unwrap_or(Duration::MAX)
    }
}

fn non_negative(elapsed: f32) -> f32 {
    debug_assert!(elapsed >= 0.0, "envelope time went backwards: {elapsed}");
    elapsed.max(0.0)
}

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate high, ramping up to peak
    Sustain, // Holding at peak while gate is high
    Release, // Gate went low, ramping down to 0
}

pub struct Envelope {
    params: EnvelopeParameters,

    // Runtime state (changes every sample)
    stage: EnvelopeState,
    level: f32,
    elapsed_samples: u32, // samples since the current stage began

    // Stage lengths, fixed when the stage starts
    attack_samples: u32,
    release_samples: u32,

    release_start_level: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            params: EnvelopeParameters::default(),
            stage: EnvelopeState::Idle,
            level: 0.0,
            elapsed_samples: 0,
            attack_samples: 0,
            release_samples: 0,
            release_start_level: 0.0,
        }
    }

    /// Gate high: start the attack phase from zero.
    pub fn note_on(&mut self, params: EnvelopeParameters, ctx: &RenderCtx) {
        self.params = params;
        self.level = 0.0;
        self.elapsed_samples = 0;
        self.attack_samples = ctx.samples(params.attack);
        self.stage = EnvelopeState::Attack;
    }

    /// Gate low: start the release phase from the current level.
    ///
    /// `release` is read now rather than at note_on, so the release time in
    /// effect when the key comes up is the one that applies.
    pub fn note_off(&mut self, release: f32, ctx: &RenderCtx) {
        if matches!(self.stage, EnvelopeState::Idle | EnvelopeState::Release) {
            return;
        }

        self.params.release = release;
        self.release_start_level = self.level;
        self.release_samples = ctx.samples(release);
        self.elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample. Called once per sample.
    pub fn next_sample(&mut self, ctx: &RenderCtx) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                if self.elapsed_samples >= self.attack_samples {
                    self.level = self.params.peak;
                    self.stage = EnvelopeState::Sustain;
                } else {
                    let t = self.elapsed_samples as f32 / ctx.sample_rate;
                    self.level = self.params.attack_level(t);
                    self.elapsed_samples += 1;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.params.peak;
            }

            EnvelopeState::Release => {
                if self.elapsed_samples >= self.release_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                } else {
                    let t = self.elapsed_samples as f32 / ctx.sample_rate;
                    self.level = self
                        .params
                        .release_level(self.release_start_level, t)
                        .min(self.release_start_level);
                    self.elapsed_samples += 1;
                }
            }
        }

        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(ctx);
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    /// Reset to idle state.
    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    /// Current envelope level (0.0 to peak)
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    /// Level captured when the release began.
    pub fn release_start_level(&self) -> f32 {
        self.release_start_level
    }

    pub fn params(&self) -> EnvelopeParameters {
        self.params
    }
}
