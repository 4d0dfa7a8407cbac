use std::sync::Arc;

use rtrb::{Consumer, Producer};

use crate::{
    dsp::Waveform,
    note::NoteId,
    synth::{
        link::SinkLink,
        message::{SynthMessage, VoiceEvent},
        voice::{Voice, VoiceId, VoiceState},
    },
    MAX_BLOCK_SIZE,
};

/// Audio-thread half of the engine: owns the voice pool and mixes it.
///
/// Never allocates after construction. Control messages are drained at the
/// start of each block; retirements are reported back at the end.
pub struct PolySynth {
    voices: Vec<Voice>,
    rx: Consumer<SynthMessage>,
    events: Producer<VoiceEvent>,
    link: Arc<SinkLink>,
    epoch: u64,
    sample_rate: f32,
    temp_buffer: Vec<f32>,
    frame_counter: u64,
}

impl PolySynth {
    pub(crate) fn new(
        sample_rate: f32,
        max_voices: usize,
        rx: Consumer<SynthMessage>,
        events: Producer<VoiceEvent>,
        link: Arc<SinkLink>,
    ) -> Self {
        let voices = (0..max_voices).map(|_| Voice::new()).collect();
        let epoch = link.epoch();

        Self {
            voices,
            rx,
            events,
            link,
            epoch,
            sample_rate,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
            frame_counter: 0,
        }
    }

    /// Must be called before rendering starts; voices already sounding keep
    /// the rate they were started with for their envelope lengths.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Shared link, for sinks that need to report a dead stream.
    pub fn link(&self) -> Arc<SinkLink> {
        Arc::clone(&self.link)
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        // Shutdown may have happened with nothing queued behind it.
        let epoch = self.link.epoch();
        if epoch > self.epoch {
            self.stop_all(epoch);
        }

        // Process control messages
        while let Ok(msg) = self.rx.pop() {
            let epoch = msg.epoch();
            if epoch < self.epoch {
                continue;
            }
            if epoch > self.epoch {
                self.stop_all(epoch);
            }

            match msg {
                SynthMessage::NoteOn {
                    note,
                    voice,
                    waveform,
                    frequency,
                    envelope,
                    replaces,
                    ..
                } => {
                    if let Some(old) = replaces {
                        if let Some(v) = self.find_by_id(old) {
                            v.stop();
                        }
                    }
                    // A voice still holding this note would break uniqueness.
                    if let Some(v) = self.find_voice(note) {
                        v.stop();
                    }

                    let age = self.frame_counter;
                    let sample_rate = self.sample_rate;
                    if let Some(slot) = self.allocate_voice() {
                        slot.start(note, voice, waveform, frequency, envelope, age, sample_rate);
                    }
                }
                SynthMessage::NoteOff { voice, release, .. } => {
                    let sample_rate = self.sample_rate;
                    if let Some(v) = self.find_by_id(voice) {
                        v.release(release, sample_rate);
                    }
                }
            }
        }

        // Mix voices
        out.fill(0.0);
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            let temp = &mut self.temp_buffer[..chunk.len()];
            for voice in self.voices.iter_mut().filter(|v| v.is_sounding()) {
                voice.render(temp, self.sample_rate);

                for (o, v) in chunk.iter_mut().zip(temp.iter()) {
                    *o += v;
                }
            }
        }

        self.frame_counter += out.len() as u64;
        self.report_retirements();
    }

    /// Hard stop of every voice for a new shutdown epoch. No retirement
    /// notices: the control side already cleared its registry.
    fn stop_all(&mut self, epoch: u64) {
        self.epoch = epoch;
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.stop();
            }
        }
    }

    /// Send one notice per retired voice, then free its slot. If the event
    /// queue is full the voice stays `Retired` and is retried next block.
    fn report_retirements(&mut self) {
        for voice in &mut self.voices {
            if voice.state() != VoiceState::Retired {
                continue;
            }
            let event = VoiceEvent::Retired {
                note: voice.note(),
                voice: voice.id(),
            };
            if self.events.push(event).is_err() {
                break;
            }
            voice.free();
        }
    }

    fn allocate_voice(&mut self) -> Option<&mut Voice> {
        // First pass: find free voice index
        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return Some(&mut self.voices[idx]);
        }

        // Second pass: steal oldest, preferring voices already on their way out
        let steal_idx = self
            .voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| {
                let held = matches!(v.state(), VoiceState::Attacking | VoiceState::Sustaining);
                (held, v.started_at())
            })
            .map(|(idx, _)| idx)?;

        let stolen = &mut self.voices[steal_idx];
        let event = VoiceEvent::Retired {
            note: stolen.note(),
            voice: stolen.id(),
        };
        // Without the notice the control side would keep a registry entry
        // with no voice behind it, so a full event queue means no steal.
        if self.events.push(event).is_err() {
            return None;
        }
        stolen.stop();
        Some(stolen)
    }

    fn find_voice(&mut self, note: NoteId) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.note() == note && v.is_active())
    }

    fn find_by_id(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.id() == id && v.is_active())
    }

    /// Envelope level of the voice holding `note`.
    pub fn voice_level(&self, note: NoteId) -> Option<f32> {
        self.voice(note).map(Voice::level)
    }

    pub fn voice_state(&self, note: NoteId) -> Option<VoiceState> {
        self.voice(note).map(Voice::state)
    }

    pub fn voice_id(&self, note: NoteId) -> Option<VoiceId> {
        self.voice(note).map(Voice::id)
    }

    /// Waveform the voice holding `note` was started with.
    pub fn voice_waveform(&self, note: NoteId) -> Option<Waveform> {
        self.voice(note).map(Voice::waveform)
    }

    fn voice(&self, note: NoteId) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|v| v.note() == note && v.is_active())
    }

    /// Number of voices holding a note (any state but `Free`).
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    /// Frames rendered so far: the engine's audio clock.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    /// Seconds rendered so far.
    pub fn time(&self) -> f64 {
        self.frame_counter as f64 / self.sample_rate as f64
    }
}

impl Drop for PolySynth {
    fn drop(&mut self) {
        self.link.set_connected(false);
    }
}

#[cfg(test)]
mod tests {
    use rtrb::RingBuffer;

    use super::*;
    use crate::{dsp::EnvelopeParameters, note::PitchClass};

    const SAMPLE_RATE: f32 = 1_000.0;
    const C4: NoteId = NoteId::new(PitchClass::C, 4);
    const E4: NoteId = NoteId::new(PitchClass::E, 4);

    struct Rig {
        tx: Producer<SynthMessage>,
        events: Consumer<VoiceEvent>,
        link: Arc<SinkLink>,
        synth: PolySynth,
    }

    fn rig(max_voices: usize) -> Rig {
        rig_with_events(max_voices, 64)
    }

    fn rig_with_events(max_voices: usize, event_capacity: usize) -> Rig {
        let link = SinkLink::new();
        let (tx, rx) = RingBuffer::new(64);
        let (events_tx, events) = RingBuffer::new(event_capacity);
        let synth = PolySynth::new(SAMPLE_RATE, max_voices, rx, events_tx, Arc::clone(&link));
        Rig {
            tx,
            events,
            link,
            synth,
        }
    }

    fn note_on(note: NoteId, id: u64, epoch: u64) -> SynthMessage {
        SynthMessage::NoteOn {
            note,
            voice: VoiceId(id),
            waveform: Waveform::Sine,
            frequency: note.frequency(),
            envelope: EnvelopeParameters::new(0.0, 0.01, 0.5),
            replaces: None,
            epoch,
        }
    }

    fn render(synth: &mut PolySynth, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        synth.render_block(&mut out);
        out
    }

    #[test]
    fn renders_silence_with_no_voices() {
        let mut rig = rig(4);
        let out = render(&mut rig.synth, 256);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(rig.synth.frames(), 256);
    }

    #[test]
    fn mixes_voices_and_reports_retirement_once() {
        let mut rig = rig(4);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        rig.tx.push(note_on(E4, 2, 0)).unwrap();

        let out = render(&mut rig.synth, 64);
        assert_eq!(rig.synth.active_voice_count(), 2);
        assert!(out.iter().any(|s| s.abs() > 0.5), "two voices at 0.5 should sum above one");

        rig.tx
            .push(SynthMessage::NoteOff {
                note: C4,
                voice: VoiceId(1),
                release: 0.01,
                epoch: 0,
            })
            .unwrap();
        render(&mut rig.synth, 32);

        assert_eq!(
            rig.events.pop().ok(),
            Some(VoiceEvent::Retired {
                note: C4,
                voice: VoiceId(1)
            })
        );
        render(&mut rig.synth, 32);
        assert!(rig.events.pop().is_err());
        assert_eq!(rig.synth.active_voice_count(), 1);
    }

    #[test]
    fn large_blocks_are_rendered_in_chunks() {
        let mut rig = rig(1);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        let out = render(&mut rig.synth, MAX_BLOCK_SIZE * 2 + 7);
        assert!(out[MAX_BLOCK_SIZE * 2..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn epoch_change_stops_everything_and_drops_stale_messages() {
        let mut rig = rig(4);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        render(&mut rig.synth, 8);

        // Queued under the old epoch, then shutdown happens.
        rig.tx.push(note_on(E4, 2, 0)).unwrap();
        rig.link.advance_epoch();

        let out = render(&mut rig.synth, 8);
        assert_eq!(rig.synth.active_voice_count(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(rig.events.pop().is_err(), "shutdown sends no notices");
    }

    #[test]
    fn newer_epoch_message_applies_pending_shutdown() {
        let mut rig = rig(4);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        render(&mut rig.synth, 8);

        rig.link.advance_epoch();
        rig.tx.push(note_on(E4, 2, 1)).unwrap();
        render(&mut rig.synth, 8);

        assert_eq!(rig.synth.voice_state(C4), None);
        assert_eq!(rig.synth.voice_id(E4), Some(VoiceId(2)));
    }

    #[test]
    fn steals_oldest_releasing_voice_when_full() {
        let mut rig = rig(2);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        render(&mut rig.synth, 4);
        rig.tx.push(note_on(E4, 2, 0)).unwrap();
        rig.tx
            .push(SynthMessage::NoteOff {
                note: E4,
                voice: VoiceId(2),
                release: 1.0,
                epoch: 0,
            })
            .unwrap();
        render(&mut rig.synth, 4);

        let g4 = NoteId::new(PitchClass::G, 4);
        rig.tx.push(note_on(g4, 3, 0)).unwrap();
        render(&mut rig.synth, 4);

        assert_eq!(
            rig.events.pop().ok(),
            Some(VoiceEvent::Retired {
                note: E4,
                voice: VoiceId(2)
            })
        );
        assert!(rig.synth.voice_state(C4).is_some());
        assert!(rig.synth.voice_state(g4).is_some());
    }

    #[test]
    fn no_steal_when_retirement_cannot_be_reported() {
        let mut rig = rig_with_events(1, 1);
        let g4 = NoteId::new(PitchClass::G, 4);

        // C4 retires and its notice fills the event queue.
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        rig.tx
            .push(SynthMessage::NoteOff {
                note: C4,
                voice: VoiceId(1),
                release: 0.0,
                epoch: 0,
            })
            .unwrap();
        render(&mut rig.synth, 4);
        assert_eq!(rig.synth.active_voice_count(), 0);

        rig.tx.push(note_on(E4, 2, 0)).unwrap();
        render(&mut rig.synth, 4);
        rig.tx.push(note_on(g4, 3, 0)).unwrap();
        render(&mut rig.synth, 4);

        // E4 keeps its slot rather than vanishing without a notice.
        assert_eq!(rig.synth.voice_id(E4), Some(VoiceId(2)));
        assert_eq!(rig.synth.voice_state(g4), None);
        assert_eq!(
            rig.events.pop().ok(),
            Some(VoiceEvent::Retired {
                note: C4,
                voice: VoiceId(1)
            })
        );
        assert!(rig.events.pop().is_err());
    }

    #[test]
    fn voice_keeps_the_waveform_it_started_with() {
        let mut rig = rig(2);
        rig.tx.push(note_on(C4, 1, 0)).unwrap();
        rig.tx
            .push(SynthMessage::NoteOn {
                note: E4,
                voice: VoiceId(2),
                waveform: Waveform::Triangle,
                frequency: E4.frequency(),
                envelope: EnvelopeParameters::new(0.0, 0.01, 0.5),
                replaces: None,
                epoch: 0,
            })
            .unwrap();
        render(&mut rig.synth, 4);

        assert_eq!(rig.synth.voice_waveform(C4), Some(Waveform::Sine));
        assert_eq!(rig.synth.voice_waveform(E4), Some(Waveform::Triangle));
    }

    #[test]
    fn dropping_marks_link_disconnected() {
        let rig = rig(1);
        let link = Arc::clone(&rig.link);
        assert!(link.is_connected());
        drop(rig);
        assert!(!link.is_connected());
    }
}
