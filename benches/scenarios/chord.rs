//! Benchmarks for full polyphonic blocks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

use super::{chromatic, engine};

pub fn bench_chord(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chord");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Held chords of growing size: the cost should scale with voices
        for voices in [1, 4, 16] {
            let (mut manager, mut synth) = engine(16);
            for note in chromatic(voices) {
                let _ = manager.play(note);
            }
            synth.render_block(&mut buffer);

            group.bench_with_input(
                BenchmarkId::new(format!("held_{voices}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        synth.render_block(black_box(&mut buffer));
                    })
                },
            );
        }

        // Full pool allocated but silent: the cost of skipping idle slots
        let (_manager, mut synth) = engine(64);
        group.bench_with_input(BenchmarkId::new("idle_pool_64", size), &size, |b, _| {
            b.iter(|| {
                synth.render_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
