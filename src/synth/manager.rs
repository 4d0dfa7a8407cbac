use std::{collections::BTreeSet, sync::Arc, time::Duration};

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, warn};

use crate::{
    dsp::Waveform,
    error::EngineError,
    note::NoteId,
    settings::Settings,
    synth::{
        link::SinkLink,
        message::{SynthMessage, VoiceEvent},
        poly::PolySynth,
        registry::{ActiveVoiceRegistry, NotePhase},
        voice::VoiceId,
    },
};

/// Upper bound on how long a note lingers in the registry after its release
/// ramp ends, when the control side polls at interactive rates.
pub const TEARDOWN_MARGIN: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Size of the audio thread's voice pool.
    pub max_voices: usize,
    /// Capacity of the control → audio message queue.
    pub queue_capacity: usize,
    /// Rate the renderer starts with; sinks overwrite it with the device rate.
    pub sample_rate: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_voices: 16,
            queue_capacity: 256,
            sample_rate: 48_000.0,
        }
    }
}

/// Control-thread half of the engine.
///
/// Owns the registry of sounding notes and talks to the [`PolySynth`] over
/// lock-free queues, so `trigger` and `release` never block on the audio
/// thread.
pub struct VoiceManager {
    settings: Settings,
    config: EngineConfig,
    registry: ActiveVoiceRegistry,
    tx: Producer<SynthMessage>,
    events: Consumer<VoiceEvent>,
    link: Arc<SinkLink>,
    next_id: u64,
}

impl VoiceManager {
    /// Create a manager and the renderer it drives. Hand the `PolySynth` to
    /// an audio sink (or render it directly for offline use).
    pub fn new(settings: Settings, config: EngineConfig) -> (Self, PolySynth) {
        let config = EngineConfig {
            max_voices: config.max_voices.max(1),
            queue_capacity: config.queue_capacity.max(1),
            ..config
        };
        let (tx, events, link, synth) = channel(&config);

        let manager = Self {
            settings,
            config,
            registry: ActiveVoiceRegistry::new(),
            tx,
            events,
            link,
            next_id: 1,
        };
        (manager, synth)
    }

    /// Start `note` with the given waveform.
    ///
    /// Already held: no-op, the existing voice keeps its envelope. Still
    /// releasing: the old voice is cut and a fresh one starts from zero.
    /// Envelope settings are copied now.
    pub fn trigger(&mut self, note: NoteId, waveform: Waveform) -> Result<(), EngineError> {
        self.poll();

        if !self.link.is_connected() {
            return Err(EngineError::SinkUnavailable(
                "audio output is not running".to_string(),
            ));
        }

        let replaces = match self.registry.get(note) {
            Some(entry) if entry.phase == NotePhase::Held => return Ok(()),
            Some(entry) => Some((note, entry.id)),
            None if self.registry.len() >= self.config.max_voices => {
                match self.registry.oldest_releasing() {
                    Some(victim) => Some(victim),
                    None => {
                        return Err(EngineError::PolyphonyExhausted {
                            max_voices: self.config.max_voices,
                        })
                    }
                }
            }
            None => None,
        };

        let id = VoiceId(self.next_id);
        let msg = SynthMessage::NoteOn {
            note,
            voice: id,
            waveform,
            frequency: note.frequency(),
            envelope: self.settings.envelope(),
            replaces: replaces.map(|(_, old)| old),
            epoch: self.link.epoch(),
        };
        self.tx.push(msg).map_err(|_| EngineError::QueueFull)?;
        self.next_id += 1;

        if let Some((old_note, old_id)) = replaces {
            if old_note != note {
                self.registry.remove(old_note);
            }
            debug!(%note, %id, replaced = %old_id, stolen_from = %old_note, "Voice replaced");
        }
        self.registry.insert(note, id, waveform);
        debug!(%note, %id, waveform = waveform.label(), "Note on");
        Ok(())
    }

    /// Trigger with the currently selected waveform.
    pub fn play(&mut self, note: NoteId) -> Result<(), EngineError> {
        self.trigger(note, self.settings.waveform())
    }

    /// Start the release ramp for `note`. Not held: no-op.
    pub fn release(&mut self, note: NoteId) -> Result<(), EngineError> {
        let Some(entry) = self.registry.get(note) else {
            return Ok(());
        };
        if entry.phase != NotePhase::Held {
            return Ok(());
        }

        let msg = SynthMessage::NoteOff {
            note,
            voice: entry.id,
            release: self.settings.release(),
            epoch: self.link.epoch(),
        };
        self.tx.push(msg).map_err(|_| EngineError::QueueFull)?;

        if let Some(id) = self.registry.mark_releasing(note) {
            debug!(%note, %id, release = self.settings.release(), "Note off");
        }
        Ok(())
    }

    /// Silence everything now, whatever phase it is in.
    ///
    /// Infallible: it bumps the shared epoch instead of queueing a message,
    /// so the audio thread cuts every voice at its next block and ignores
    /// anything queued before this call.
    pub fn shutdown(&mut self) {
        let cleared = self.registry.clear();
        let epoch = self.link.advance_epoch();
        // Notices from before the cut refer to voices that no longer exist.
        while self.events.pop().is_ok() {}
        debug!(cleared, epoch, "Voices shut down");
    }

    /// Snapshot of sounding notes (attacking, sustaining or releasing).
    pub fn active_notes(&mut self) -> BTreeSet<NoteId> {
        self.poll();
        self.registry.notes()
    }

    /// Apply retirement notices from the audio thread. Returns how many
    /// notes left the registry.
    pub fn poll(&mut self) -> usize {
        if !self.link.is_connected() && !self.registry.is_empty() {
            let lost = self.registry.clear();
            warn!(lost, "Audio output stopped; dropping sounding notes");
            return lost;
        }

        let mut retired = 0;
        while let Ok(event) = self.events.pop() {
            match event {
                VoiceEvent::Retired { note, voice } => {
                    if self.registry.remove_if(note, voice) {
                        debug!(%note, id = %voice, "Voice retired");
                        retired += 1;
                    }
                }
            }
        }
        retired
    }

    /// Build a fresh renderer after the old one was lost (device unplugged,
    /// stream error). The old renderer, if still alive, is cut silent and
    /// orphaned: its queues and link are no longer connected to this manager.
    pub fn reconnect(&mut self) -> PolySynth {
        let dropped = self.registry.clear();
        // Silence the old renderer in case something still drives it.
        self.link.advance_epoch();
        let (tx, events, link, synth) = channel(&self.config);
        self.tx = tx;
        self.events = events;
        self.link = link;
        debug!(dropped, "Voice engine reconnected");
        synth
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn is_active(&self, note: NoteId) -> bool {
        self.registry.contains(note)
    }

    pub fn phase(&self, note: NoteId) -> Option<NotePhase> {
        self.registry.get(note).map(|entry| entry.phase)
    }

    pub fn voice_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &ActiveVoiceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes apply to notes triggered (or released) afterwards.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for VoiceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn channel(
    config: &EngineConfig,
) -> (
    Producer<SynthMessage>,
    Consumer<VoiceEvent>,
    Arc<SinkLink>,
    PolySynth,
) {
    let link = SinkLink::new();
    let (tx, rx) = RingBuffer::<SynthMessage>::new(config.queue_capacity);
    // Room for every voice to retire twice over between polls.
    let (events_tx, events) = RingBuffer::<VoiceEvent>::new(config.max_voices * 2);
    let synth = PolySynth::new(
        config.sample_rate,
        config.max_voices,
        rx,
        events_tx,
        Arc::clone(&link),
    );
    (tx, events, link, synth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{note::PitchClass, synth::voice::VoiceState};

    const SAMPLE_RATE: f32 = 1_000.0;
    const C4: NoteId = NoteId::new(PitchClass::C, 4);
    const E4: NoteId = NoteId::new(PitchClass::E, 4);
    const G4: NoteId = NoteId::new(PitchClass::G, 4);

    fn engine(settings: Settings, max_voices: usize) -> (VoiceManager, PolySynth) {
        VoiceManager::new(
            settings,
            EngineConfig {
                max_voices,
                queue_capacity: 16,
                sample_rate: SAMPLE_RATE,
            },
        )
    }

    fn render(synth: &mut PolySynth, frames: usize) {
        let mut out = vec![0.0; frames];
        synth.render_block(&mut out);
    }

    #[test]
    fn double_trigger_keeps_one_voice() {
        let settings = Settings::new().with_attack(0.1).with_peak_level(1.0);
        let (mut manager, mut synth) = engine(settings, 4);

        manager.trigger(C4, Waveform::Sine).unwrap();
        render(&mut synth, 20);
        let level = synth.voice_level(C4).unwrap();

        manager.trigger(C4, Waveform::Square).unwrap();
        render(&mut synth, 1);

        assert_eq!(manager.voice_count(), 1);
        assert_eq!(synth.active_voice_count(), 1);
        assert!(synth.voice_level(C4).unwrap() > level, "attack was not restarted");
    }

    #[test]
    fn release_without_voice_is_noop() {
        let (mut manager, mut synth) = engine(Settings::new(), 4);
        manager.release(C4).unwrap();
        manager.release(C4).unwrap();
        render(&mut synth, 8);
        assert!(manager.active_notes().is_empty());
    }

    #[test]
    fn retrigger_while_releasing_replaces_voice() {
        let settings = Settings::new().with_attack(0.0).with_release(1.0);
        let (mut manager, mut synth) = engine(settings, 4);

        manager.trigger(C4, Waveform::Sine).unwrap();
        render(&mut synth, 10);
        manager.release(C4).unwrap();
        render(&mut synth, 10);
        let old = synth.voice_id(C4).unwrap();

        manager.trigger(C4, Waveform::Sine).unwrap();
        render(&mut synth, 1);

        let new = synth.voice_id(C4).unwrap();
        assert_ne!(old, new);
        assert_eq!(synth.active_voice_count(), 1);
        assert_eq!(synth.voice_state(C4), Some(VoiceState::Sustaining));
        assert_eq!(manager.phase(C4), Some(NotePhase::Held));
    }

    #[test]
    fn full_pool_steals_releasing_note() {
        let settings = Settings::new().with_release(2.0);
        let (mut manager, mut synth) = engine(settings, 2);

        manager.trigger(C4, Waveform::Sine).unwrap();
        manager.trigger(E4, Waveform::Sine).unwrap();
        render(&mut synth, 5);
        manager.release(C4).unwrap();
        render(&mut synth, 5);

        manager.trigger(G4, Waveform::Sine).unwrap();
        render(&mut synth, 5);

        let notes: Vec<_> = manager.active_notes().into_iter().collect();
        assert_eq!(notes, vec![E4, G4]);
        assert_eq!(synth.voice_state(C4), None);
    }

    #[test]
    fn full_pool_of_held_notes_rejects() {
        let (mut manager, _synth) = engine(Settings::new(), 2);
        manager.trigger(C4, Waveform::Sine).unwrap();
        manager.trigger(E4, Waveform::Sine).unwrap();

        let err = manager.trigger(G4, Waveform::Sine).unwrap_err();
        assert!(matches!(err, EngineError::PolyphonyExhausted { max_voices: 2 }));
        assert!(!manager.is_active(G4));
    }

    #[test]
    fn full_queue_leaves_registry_untouched() {
        let (mut manager, _synth) = VoiceManager::new(
            Settings::new(),
            EngineConfig {
                max_voices: 8,
                queue_capacity: 1,
                sample_rate: SAMPLE_RATE,
            },
        );
        manager.trigger(C4, Waveform::Sine).unwrap();

        let err = manager.trigger(E4, Waveform::Sine).unwrap_err();
        assert!(matches!(err, EngineError::QueueFull));
        assert_eq!(manager.voice_count(), 1);
        assert!(!manager.is_active(E4));
    }

    #[test]
    fn lost_renderer_rejects_notes_until_reconnected() {
        let (mut manager, synth) = engine(Settings::new(), 4);
        manager.trigger(C4, Waveform::Sine).unwrap();
        drop(synth);

        assert!(matches!(
            manager.trigger(E4, Waveform::Sine),
            Err(EngineError::SinkUnavailable(_))
        ));
        assert!(manager.active_notes().is_empty());

        let mut synth = manager.reconnect();
        assert!(manager.is_connected());
        manager.trigger(E4, Waveform::Sine).unwrap();
        render(&mut synth, 4);
        assert!(synth.voice_state(E4).is_some());
    }

    #[test]
    fn reconnect_silences_the_old_renderer() {
        let settings = Settings::new().with_attack(0.0);
        let (mut manager, mut old) = engine(settings, 4);
        manager.trigger(C4, Waveform::Sine).unwrap();
        render(&mut old, 4);
        assert_eq!(old.active_voice_count(), 1);

        let mut synth = manager.reconnect();
        let mut out = vec![0.0; 16];
        old.render_block(&mut out);
        assert_eq!(old.active_voice_count(), 0);
        assert!(out.iter().all(|&s| s == 0.0));

        manager.trigger(E4, Waveform::Sine).unwrap();
        render(&mut synth, 4);
        assert!(synth.voice_state(E4).is_some());
    }

    #[test]
    fn waveform_change_leaves_held_voice_alone() {
        let (mut manager, mut synth) = engine(Settings::new(), 4);

        manager.play(C4).unwrap();
        render(&mut synth, 4);
        manager.settings_mut().set_waveform(Waveform::Square);
        manager.play(C4).unwrap();
        manager.play(E4).unwrap();
        render(&mut synth, 4);

        assert_eq!(synth.voice_waveform(C4), Some(Waveform::Sine));
        assert_eq!(synth.voice_waveform(E4), Some(Waveform::Square));
        assert_eq!(manager.registry().get(C4).map(|e| e.waveform), Some(Waveform::Sine));
    }

    #[test]
    fn settings_changes_do_not_touch_live_voices() {
        let settings = Settings::new().with_attack(0.0).with_peak_level(0.5);
        let (mut manager, mut synth) = engine(settings, 4);

        manager.trigger(C4, Waveform::Sine).unwrap();
        render(&mut synth, 4);
        manager.settings_mut().set_peak_level(1.0);
        manager.trigger(E4, Waveform::Sine).unwrap();
        render(&mut synth, 4);

        assert_eq!(synth.voice_level(C4), Some(0.5));
        assert_eq!(synth.voice_level(E4), Some(1.0));
    }

    #[test]
    fn shutdown_with_no_voices_is_safe() {
        let (mut manager, mut synth) = engine(Settings::new(), 4);
        manager.shutdown();
        manager.shutdown();
        render(&mut synth, 4);
        assert!(manager.active_notes().is_empty());
    }
}
