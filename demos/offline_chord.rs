/// Demonstrates the voice engine without real-time audio.
/// Shows note triggering, release ramps, pool limits and shutdown.
use polyvoice::{EngineConfig, EngineError, NoteId, PitchClass, PolySynth, Settings, VoiceManager};

const BLOCK_SIZE: usize = 256;

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

/// Render roughly `seconds` of audio, returning the loudest sample.
fn run(synth: &mut PolySynth, seconds: f32) -> f32 {
    let blocks = (seconds * synth.sample_rate() / BLOCK_SIZE as f32).ceil() as usize;
    let mut buffer = vec![0.0; BLOCK_SIZE];
    let mut loudest = 0.0f32;
    for _ in 0..blocks {
        synth.render_block(&mut buffer);
        loudest = loudest.max(peak(&buffer));
    }
    loudest
}

fn show(manager: &mut VoiceManager) {
    let notes: Vec<String> = manager
        .active_notes()
        .iter()
        .map(NoteId::to_string)
        .collect();
    println!("  Active notes: [{}]", notes.join(", "));
}

fn main() {
    println!("=== Voice Engine Demo (Offline) ===\n");

    let settings = Settings::new()
        .with_attack(0.05)
        .with_release(0.2)
        .with_peak_level(0.3);
    let config = EngineConfig {
        max_voices: 4,
        ..EngineConfig::default()
    };
    let (mut manager, mut synth) = VoiceManager::new(settings, config);
    println!(
        "Created engine with {} voices at {} Hz\n",
        config.max_voices,
        synth.sample_rate()
    );

    // Play a C major chord (C4, E4, G4)
    println!("Playing C major chord:");
    for pitch in [PitchClass::C, PitchClass::E, PitchClass::G] {
        let note = NoteId::new(pitch, 4);
        println!("  Note On: {note} ({:.2} Hz)", note.frequency());
        let _ = manager.play(note);
    }
    let loudest = run(&mut synth, 0.5);
    show(&mut manager);
    println!("  Peak amplitude: {loudest:.3}");

    // Fill the pool, then ask for one more held note
    println!("\nAdding B4, then D5 with every voice held:");
    let _ = manager.play(NoteId::new(PitchClass::B, 4));
    match manager.play(NoteId::new(PitchClass::D, 5)) {
        Ok(()) => println!("  D5 sounded"),
        Err(EngineError::PolyphonyExhausted { max_voices }) => {
            println!("  D5 rejected: all {max_voices} voices are held")
        }
        Err(err) => println!("  D5 failed: {err}"),
    }
    run(&mut synth, 0.1);
    show(&mut manager);

    // Release one note; its slot can be stolen while it fades
    println!("\nReleasing C4 and playing D5 again:");
    let _ = manager.release(NoteId::new(PitchClass::C, 4));
    run(&mut synth, 0.05);
    let _ = manager.play(NoteId::new(PitchClass::D, 5));
    run(&mut synth, 0.05);
    show(&mut manager);

    // Release the rest and let the ramps finish
    println!("\nReleasing everything:");
    for note in manager.active_notes() {
        let _ = manager.release(note);
    }
    run(&mut synth, 0.1);
    show(&mut manager);
    let tail = run(&mut synth, 0.2);
    show(&mut manager);
    println!("  Peak amplitude after release: {tail:.3}");

    // Shutdown cuts notes mid-release
    println!("\nShutdown during a release:");
    let _ = manager.play(NoteId::new(PitchClass::A, 4));
    run(&mut synth, 0.1);
    let _ = manager.release(NoteId::new(PitchClass::A, 4));
    run(&mut synth, 0.05);
    manager.shutdown();
    show(&mut manager);
    println!("  Peak amplitude after shutdown: {:.3}", run(&mut synth, 0.2));

    println!("\nRendered {:.2}s of audio", synth.time());
}
