use std::fmt;

use crate::{
    dsp::{Envelope, EnvelopeParameters, EnvelopeState, Oscillator, RenderCtx, Waveform},
    note::{NoteId, PitchClass},
};

/// Identifies one voice lifetime. A new id is handed out on every trigger, so
/// a retirement notice for an old lifetime never matches a newer voice on
/// the same note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,       // Pool slot available for allocation
    Attacking,  // Gate high, ramping up to peak
    Sustaining, // Gate high, holding peak
    Releasing,  // Key released, ramping down from the level reached
    Retired,    // Silent, waiting for the retirement notice to go out
}

/// A single sounding note: oscillator times envelope.
pub struct Voice {
    note: NoteId,
    id: VoiceId,
    state: VoiceState,
    started_at: u64,
    frequency: f32,
    osc: Oscillator,
    env: Envelope,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        Self {
            note: NoteId::new(PitchClass::C, 0),
            id: VoiceId(0),
            state: VoiceState::Free,
            started_at: 0,
            frequency: 0.0,
            osc: Oscillator::sine(),
            env: Envelope::new(),
        }
    }

    /// Bind this slot to a note and start its attack from zero.
    pub fn start(
        &mut self,
        note: NoteId,
        id: VoiceId,
        waveform: Waveform,
        frequency: f32,
        envelope: EnvelopeParameters,
        started_at: u64,
        sample_rate: f32,
    ) {
        self.note = note;
        self.id = id;
        self.frequency = frequency;
        self.started_at = started_at;
        self.state = VoiceState::Attacking;

        self.osc.reset(waveform);
        self.env.note_on(envelope, &self.ctx(sample_rate));
    }

    /// Begin the release ramp from whatever level the envelope has reached.
    pub fn release(&mut self, release: f32, sample_rate: f32) {
        if matches!(self.state, VoiceState::Attacking | VoiceState::Sustaining) {
            self.state = VoiceState::Releasing;
            let ctx = self.ctx(sample_rate);
            self.env.note_off(release, &ctx);
        }
    }

    /// Render one block into `out` (overwrites).
    ///
    /// Moves `Attacking → Sustaining` and `Releasing → Retired` on the exact
    /// sample the envelope changes stage. Samples after retirement are silent.
    pub fn render(&mut self, out: &mut [f32], sample_rate: f32) {
        let ctx = self.ctx(sample_rate);

        for sample in out.iter_mut() {
            if !self.is_sounding() {
                *sample = 0.0;
                continue;
            }

            let level = self.env.next_sample(&ctx);
            *sample = self.osc.next_sample(&ctx) * level;

            match (self.state, self.env.state()) {
                (VoiceState::Attacking, EnvelopeState::Sustain) => {
                    self.state = VoiceState::Sustaining;
                }
                (VoiceState::Releasing, EnvelopeState::Idle) => {
                    self.state = VoiceState::Retired;
                }
                _ => {}
            }
        }
    }

    /// Cut the voice immediately, skipping any release. Used for shutdown
    /// and when the slot is reclaimed for another note.
    pub fn stop(&mut self) {
        self.env.reset();
        self.free();
    }

    /// Return the slot to the pool.
    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.id = VoiceId(0);
    }

    fn ctx(&self, sample_rate: f32) -> RenderCtx {
        RenderCtx::new(sample_rate, self.frequency)
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    /// Still producing (or about to produce) audio.
    pub fn is_sounding(&self) -> bool {
        matches!(
            self.state,
            VoiceState::Attacking | VoiceState::Sustaining | VoiceState::Releasing
        )
    }

    /// Holds a note, including one whose retirement hasn't been reported yet.
    pub fn is_active(&self) -> bool {
        self.state != VoiceState::Free
    }

    pub fn level(&self) -> f32 {
        self.env.level()
    }

    pub fn note(&self) -> NoteId {
        self.note
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Audio frame at which this voice started (its age).
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}
