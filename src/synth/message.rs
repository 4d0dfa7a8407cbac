use crate::{
    dsp::{EnvelopeParameters, Waveform},
    note::NoteId,
    synth::voice::VoiceId,
};

/// Control thread → audio thread.
///
/// Every message carries the shutdown epoch it was sent under. The audio
/// thread drops messages from an older epoch, so nothing queued before a
/// shutdown can start or touch a voice after it.
#[derive(Debug, Copy, Clone)]
pub enum SynthMessage {
    NoteOn {
        note: NoteId,
        voice: VoiceId,
        waveform: Waveform,
        frequency: f32,
        envelope: EnvelopeParameters,
        /// Voice to stop before this one starts: the same note still
        /// releasing, or the oldest releasing voice when the pool is full.
        replaces: Option<VoiceId>,
        epoch: u64,
    },
    NoteOff {
        note: NoteId,
        voice: VoiceId,
        release: f32,
        epoch: u64,
    },
}

impl SynthMessage {
    pub fn epoch(&self) -> u64 {
        match *self {
            SynthMessage::NoteOn { epoch, .. } | SynthMessage::NoteOff { epoch, .. } => epoch,
        }
    }
}

/// Audio thread → control thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The voice finished its release (or was stolen) and its slot is free.
    Retired { note: NoteId, voice: VoiceId },
}
