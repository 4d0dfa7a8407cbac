//! Low-level DSP primitives used by the voices.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They stay focused on the
//! signal-processing math; lifecycle and allocation live in [`crate::synth`].

/// Attack/sustain/release envelope generator.
pub mod envelope;
/// Oscillator waveforms.
pub mod oscillator;

pub use envelope::{Envelope, EnvelopeParameters, EnvelopeState};
pub use oscillator::{Oscillator, Waveform};

/// Context passed to DSP primitives during rendering
///
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - frequency: Pitch to render (Hz)
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            sample_rate,
            frequency,
        }
    }

    /// Convert a duration in seconds to a whole number of samples.
    pub fn samples(&self, seconds: f32) -> u32 {
        (seconds.max(0.0) * self.sample_rate).round() as u32
    }
}
