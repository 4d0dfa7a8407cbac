//! Benchmarks for the voice engine's render path.
//!
//! Run with: cargo bench
//!
//! Everything here runs on the audio thread in real use, so it has to finish
//! well inside the buffer deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Oscillator and envelope primitives
//!   - scenarios/*  Full PolySynth blocks with chords and note churn

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_oscillator,
    dsp::bench_envelope,
    scenarios::bench_chord,
    scenarios::bench_churn,
);
criterion_main!(benches);
