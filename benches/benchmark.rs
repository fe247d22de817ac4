//! Benchmarks for the play engine.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use playchalk::{MemoryStore, ObjectKind, PlayEngine, PlayFile, PlayLibrary, PlayObject};

/// Engine with `frames` frames of `tokens` tokens each.
fn populated(frames: usize, tokens: usize) -> PlayEngine {
    let mut engine = PlayEngine::new();
    let objects = (0..tokens)
        .map(|i| {
            PlayObject::new(format!("p{i}"), ObjectKind::OffensePlayer, i as f64 * 10.0, 100.0)
        })
        .collect();
    engine.add_objects(objects).unwrap();
    for _ in 1..frames {
        engine.add_frame();
    }
    engine
}

fn bench_new(c: &mut Criterion) {
    c.bench_function("new", |b| b.iter(|| black_box(PlayEngine::new())));
}

fn bench_move_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_object");

    for num_frames in [1, 10, 50].iter() {
        let mut engine = populated(*num_frames, 10);
        let mut x = 0.0;
        group.bench_with_input(BenchmarkId::from_parameter(num_frames), num_frames, |b, _| {
            b.iter(|| {
                x += 1.0;
                engine.move_object(0, "p3", x, 200.0).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_drag_gesture(c: &mut Criterion) {
    c.bench_function("drag_gesture_60_moves", |b| {
        let mut engine = populated(20, 10);
        b.iter(|| {
            engine.begin_gesture("drag");
            for step in 0..60 {
                engine.move_object(5, "p1", step as f64, step as f64).unwrap();
            }
            engine.end_gesture();
        })
    });
}

fn bench_undo_redo(c: &mut Criterion) {
    c.bench_function("undo_redo", |b| {
        let mut engine = populated(20, 10);
        for i in 0..40 {
            engine.move_object(i % 20, "p0", i as f64, 0.0).unwrap();
        }
        b.iter(|| {
            engine.undo();
            engine.redo();
        })
    });
}

fn bench_add_frame(c: &mut Criterion) {
    c.bench_function("add_frame", |b| {
        b.iter_batched(
            || populated(1, 10),
            |mut engine| {
                for _ in 0..20 {
                    engine.add_frame();
                }
                engine
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_playback_tick(c: &mut Criterion) {
    c.bench_function("playback_tick_16ms", |b| {
        let mut engine = populated(10, 11);
        engine.set_loop(true);
        engine.toggle_playback();
        b.iter(|| {
            let sample = engine.tick(16.0).unwrap();
            black_box(engine.poses(&sample));
        })
    });
}

fn bench_export_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_import");

    for num_frames in [1, 10, 50].iter() {
        let engine = populated(*num_frames, 11);
        let json = engine.export_play().to_json_pretty().unwrap();
        group.bench_with_input(BenchmarkId::new("export", num_frames), num_frames, |b, _| {
            b.iter(|| black_box(engine.export_play().to_json_pretty().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("parse", num_frames), num_frames, |b, _| {
            b.iter(|| black_box(PlayFile::parse(&json).unwrap()))
        });
    }

    group.finish();
}

fn bench_save_play(c: &mut Criterion) {
    c.bench_function("save_play", |b| {
        let mut engine = populated(10, 11);
        let mut library = PlayLibrary::new(MemoryStore::new());
        b.iter(|| black_box(engine.save_play(&mut library).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_new,
    bench_move_object,
    bench_drag_gesture,
    bench_undo_redo,
    bench_add_frame,
    bench_playback_tick,
    bench_export_import,
    bench_save_play,
);

criterion_main!(benches);
