pub mod dsp; // Oscillators and envelopes
pub mod error;
pub mod input; // Key/pointer events to note on/off
pub mod io; // Audio output
pub mod note;
pub mod settings;
pub mod synth; // Voice management and polyphony

pub use error::EngineError;
pub use note::{frequency_of, NoteId, PitchClass};
pub use settings::Settings;
pub use synth::{EngineConfig, PolySynth, VoiceManager};

pub const MAX_BLOCK_SIZE: usize = 2048;
