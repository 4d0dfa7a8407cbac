//! Real-world scenario benchmarks.
//!
//! These drive a whole PolySynth through a VoiceManager the way the keyboard
//! does: held chords, and notes starting and stopping every block.

mod chord;
mod churn;

use polyvoice::{EngineConfig, NoteId, PitchClass, PolySynth, Settings, VoiceManager};

pub use chord::bench_chord;
pub use churn::bench_churn;

pub(crate) fn engine(max_voices: usize) -> (VoiceManager, PolySynth) {
    VoiceManager::new(
        Settings::new().with_attack(0.005).with_release(0.05),
        EngineConfig {
            max_voices,
            ..EngineConfig::default()
        },
    )
}

pub(crate) fn chromatic(count: usize) -> Vec<NoteId> {
    (0..count as u8)
        .map(|i| NoteId::new(PitchClass::from_semitone(i % 12), 3 + i / 12))
        .collect()
}
