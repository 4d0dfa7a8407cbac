//! Benchmarks for the attack/sustain/release envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polyvoice::dsp::{Envelope, EnvelopeParameters, RenderCtx};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let ctx = RenderCtx::new(48_000.0, 440.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up). Long enough to stay in attack for the run.
        let mut env = Envelope::new();
        env.note_on(EnvelopeParameters::new(1000.0, 0.3, 0.7), &ctx);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Sustain phase (holding at peak)
        let mut env = Envelope::new();
        env.note_on(EnvelopeParameters::new(0.001, 0.3, 0.7), &ctx);
        for _ in 0..200 {
            env.next_sample(&ctx);
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Release phase (ramping down)
        let mut env = Envelope::new();
        env.note_on(EnvelopeParameters::new(0.001, 1000.0, 0.7), &ctx);
        for _ in 0..200 {
            env.next_sample(&ctx);
        }
        env.note_off(1000.0, &ctx);
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }

    group.finish();
}
