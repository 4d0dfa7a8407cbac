//! Benchmarks for note traffic: voices starting, releasing and retiring
//! while blocks render.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

use super::{chromatic, engine};

pub fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/churn");
    let notes = chromatic(24);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let (mut manager, mut synth) = engine(16);
        let mut step = 0usize;

        // One note on and one note off per block, plus retirement traffic
        group.bench_with_input(BenchmarkId::new("on_off_per_block", size), &size, |b, _| {
            b.iter(|| {
                let on = notes[step % notes.len()];
                let off = notes[(step + notes.len() - 8) % notes.len()];
                let _ = manager.play(on);
                let _ = manager.release(off);
                synth.render_block(black_box(&mut buffer));
                manager.poll();
                step += 1;
            })
        });
    }

    group.finish();
}
