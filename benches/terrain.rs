use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec3;

use mathterrain::streaming::{ChunkCoord, ChunkStore, InlineWorker, MergedTerrain, TerrainStreamer};
use mathterrain::terrain::{ChunkGenerator, EquationSpec, HeightField, TerrainSettings, compile_equations};

const HILLS: &str = "sin(x*0.1)*cos(y*0.1)*8 + sin(x*0.37+y*0.21)*2";

fn hills_field() -> Arc<HeightField> {
    let equations = compile_equations(&[
        EquationSpec::new(HILLS, "#4a7c3a"),
        EquationSpec::new("sqrt(x^2+y^2)*0.05", "#8a7a5a"),
    ]);
    Arc::new(HeightField::new(equations))
}

fn bench_field_sampling(c: &mut Criterion) {
    let field = hills_field();

    c.bench_function("field_height_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..100 {
                for j in 0..100 {
                    sum += field.height_at(black_box(i as f64 * 0.5), black_box(j as f64 * 0.5));
                }
            }
            sum
        });
    });

    c.bench_function("field_interpolated_height_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..100 {
                for j in 0..100 {
                    sum += field.interpolated_height(black_box(i as f64 * 0.37), black_box(j as f64 * 0.37));
                }
            }
            sum
        });
    });
}

fn bench_chunk_build(c: &mut Criterion) {
    let settings = TerrainSettings::default();
    let generator = ChunkGenerator::new(hills_field(), &settings);

    c.bench_function("chunk_build_60", |b| {
        b.iter(|| generator.build(black_box(ChunkCoord::new(1, -2, 0))));
    });

    c.bench_function("chunk_content_test", |b| {
        b.iter(|| generator.has_content(black_box(ChunkCoord::new(3, 3, 1))));
    });
}

fn bench_merge(c: &mut Criterion) {
    let settings = TerrainSettings::default();
    let generator = ChunkGenerator::new(hills_field(), &settings);

    let mut store = ChunkStore::new();
    let mut keys = Vec::new();
    for x in -3..=3 {
        for y in -3..=3 {
            let coord = ChunkCoord::new(x, y, 0);
            store.insert_built(coord, generator.build(coord));
            keys.push(coord);
        }
    }
    store.set_active(keys);

    c.bench_function("merge_49_chunks", |b| {
        b.iter(|| {
            let mut merged = MergedTerrain::new();
            merged.merge(black_box(&store), Vec3::ZERO);
            merged.version()
        });
    });
}

fn bench_streaming_tick(c: &mut Criterion) {
    let settings = TerrainSettings {
        chunk_resolution: 30,
        ..Default::default()
    };

    c.bench_function("streaming_walk_120_frames", |b| {
        b.iter(|| {
            let Ok(mut streamer) = TerrainStreamer::new(settings.clone(), Box::new(InlineWorker::new())) else {
                return 0;
            };
            streamer.set_equations(compile_equations(&[EquationSpec::new(HILLS, "#4a7c3a")]));
            for frame in 0..120 {
                streamer.update_chunks(Vec3::new(frame as f32 * 0.5, 0.0, 10.0));
            }
            streamer.stats().active_chunks
        });
    });
}

criterion_group!(
    benches,
    bench_field_sampling,
    bench_chunk_build,
    bench_merge,
    bench_streaming_tick,
);
criterion_main!(benches);
