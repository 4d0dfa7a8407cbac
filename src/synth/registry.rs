use std::collections::{BTreeSet, HashMap};

use crate::{dsp::Waveform, note::NoteId, synth::voice::VoiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePhase {
    /// Key down: attacking or sustaining.
    Held,
    /// Key up: ramping down, still sounding until retired.
    Releasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredVoice {
    pub id: VoiceId,
    pub phase: NotePhase,
    pub waveform: Waveform,
}

/// The set of currently sounding notes, keyed by note so each note maps to
/// at most one voice.
#[derive(Debug, Default)]
pub struct ActiveVoiceRegistry {
    entries: HashMap<NoteId, RegisteredVoice>,
}

impl ActiveVoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly triggered voice, returning whatever it displaced.
    pub fn insert(
        &mut self,
        note: NoteId,
        id: VoiceId,
        waveform: Waveform,
    ) -> Option<RegisteredVoice> {
        self.entries.insert(
            note,
            RegisteredVoice {
                id,
                phase: NotePhase::Held,
                waveform,
            },
        )
    }

    pub fn get(&self, note: NoteId) -> Option<&RegisteredVoice> {
        self.entries.get(&note)
    }

    /// Flip a held note to releasing. Returns its voice id, or `None` if the
    /// note isn't held.
    pub fn mark_releasing(&mut self, note: NoteId) -> Option<VoiceId> {
        let entry = self.entries.get_mut(&note)?;
        if entry.phase != NotePhase::Held {
            return None;
        }
        entry.phase = NotePhase::Releasing;
        Some(entry.id)
    }

    /// Remove `note` only if it still belongs to voice `id`. A stale id
    /// (voice replaced, or registry cleared by shutdown) is a no-op.
    pub fn remove_if(&mut self, note: NoteId, id: VoiceId) -> bool {
        match self.entries.get(&note) {
            Some(entry) if entry.id == id => {
                self.entries.remove(&note);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, note: NoteId) -> Option<RegisteredVoice> {
        self.entries.remove(&note)
    }

    /// Releasing entry with the oldest voice, the first candidate to steal.
    pub fn oldest_releasing(&self) -> Option<(NoteId, VoiceId)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.phase == NotePhase::Releasing)
            .min_by_key(|(_, entry)| entry.id)
            .map(|(note, entry)| (*note, entry.id))
    }

    /// Drop every entry, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn contains(&self, note: NoteId) -> bool {
        self.entries.contains_key(&note)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted snapshot of the registered notes.
    pub fn notes(&self) -> BTreeSet<NoteId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NoteId, &RegisteredVoice)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::PitchClass;

    const C4: NoteId = NoteId::new(PitchClass::C, 4);
    const D4: NoteId = NoteId::new(PitchClass::D, 4);

    #[test]
    fn stale_removal_is_ignored() {
        let mut registry = ActiveVoiceRegistry::new();
        registry.insert(C4, VoiceId(1), Waveform::Sine);
        registry.insert(C4, VoiceId(2), Waveform::Sine);

        assert!(!registry.remove_if(C4, VoiceId(1)));
        assert!(registry.contains(C4));
        assert!(registry.remove_if(C4, VoiceId(2)));
        assert!(!registry.remove_if(C4, VoiceId(2)));
    }

    #[test]
    fn release_only_from_held() {
        let mut registry = ActiveVoiceRegistry::new();
        registry.insert(C4, VoiceId(7), Waveform::Square);

        assert_eq!(registry.mark_releasing(C4), Some(VoiceId(7)));
        assert_eq!(registry.mark_releasing(C4), None);
        assert_eq!(registry.mark_releasing(D4), None);
    }

    #[test]
    fn oldest_releasing_skips_held_notes() {
        let mut registry = ActiveVoiceRegistry::new();
        registry.insert(C4, VoiceId(1), Waveform::Sine);
        registry.insert(D4, VoiceId(2), Waveform::Sine);
        assert_eq!(registry.oldest_releasing(), None);

        registry.mark_releasing(D4);
        assert_eq!(registry.oldest_releasing(), Some((D4, VoiceId(2))));
    }

    #[test]
    fn notes_snapshot_is_sorted() {
        let mut registry = ActiveVoiceRegistry::new();
        registry.insert(D4, VoiceId(1), Waveform::Sine);
        registry.insert(C4, VoiceId(2), Waveform::Sine);

        let notes: Vec<_> = registry.notes().into_iter().collect();
        assert_eq!(notes, vec![C4, D4]);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}
