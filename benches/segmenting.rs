//! Benchmarks for segment derivation and extraction
//!
//! Covers the per-edit cost of deriving segments from split points and the
//! per-export cost of slicing decoded audio.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use splitforge::sp_av::{extract, AudioBuffer, MediaSource};
use splitforge::sp_core::Timeline;

/// Timeline of `duration` seconds with `n` evenly spaced split points,
/// added in reverse so every insert lands at the front.
fn timeline_with(duration: f64, n: usize) -> Timeline {
    let mut t = Timeline::new(duration).unwrap();
    for i in (1..=n).rev() {
        t.add(duration * i as f64 / (n + 1) as f64);
    }
    t
}

fn bench_segments(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_segments");

    for n in [0usize, 10, 100, 1000] {
        let t = timeline_with(3600.0, n);
        group.bench_with_input(BenchmarkId::new("derive", n), &t, |b, t| {
            b.iter(|| black_box(t).segments());
        });
    }

    group.bench_function("add_reverse/100", |b| {
        b.iter(|| timeline_with(black_box(3600.0), 100));
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_audio");

    // Ten minutes of 48 kHz stereo.
    let pcm = AudioBuffer::silent(48_000, 2, 600 * 48_000).unwrap();
    let source = MediaSource::audio("long.wav", Bytes::new(), pcm);
    let t = timeline_with(source.duration(), 9);
    let segments = t.segments();

    group.bench_function("one_minute_span", |b| {
        b.iter(|| extract(black_box(&source), black_box(&segments[4])));
    });

    group.bench_function("all_ten_spans", |b| {
        b.iter(|| {
            for segment in &segments {
                black_box(extract(&source, segment));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_segments, bench_extract);
criterion_main!(benches);
