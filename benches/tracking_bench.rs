use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facewatch::{
    core::{
        detection::{BoundingBox, Detection, Point},
        tracking::{GreedyMatcher, MatchStrategy, OptimalMatcher, TrackStore},
    },
    utils::config::TrackingConfig,
};

fn crowd(faces: usize, offset: f32) -> Vec<Detection> {
    (0..faces)
        .map(|i| {
            let x = 60.0 + (i % 8) as f32 * 120.0 + offset;
            let y = 60.0 + (i / 8) as f32 * 120.0 + offset;
            Detection::new(BoundingBox::around(Point::new(x, y), 40.0, 40.0), vec![0.1; 512])
        })
        .collect()
}

fn bench_track_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_update");

    for faces in [1usize, 8, 32].iter() {
        let frames: Vec<Vec<Detection>> = (0..16).map(|f| crowd(*faces, f as f32 * 2.0)).collect();

        group.bench_with_input(BenchmarkId::new("greedy", faces), &frames, |b, frames| {
            b.iter(|| {
                let mut store = TrackStore::new(&TrackingConfig::default());
                for detections in frames {
                    black_box(store.update(black_box(detections), 1.0));
                }
            })
        });
    }

    group.finish();
}

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("assignment");

    for size in [4usize, 16, 48].iter() {
        let tracks: Vec<Point> = crowd(*size, 0.0).iter().map(|d| d.bbox.centroid()).collect();
        let detections: Vec<Point> = crowd(*size, 5.0).iter().map(|d| d.bbox.centroid()).collect();

        group.bench_with_input(BenchmarkId::new("greedy", size), size, |b, _| {
            b.iter(|| GreedyMatcher.assign(black_box(&detections), black_box(&tracks), 150.0))
        });
        group.bench_with_input(BenchmarkId::new("optimal", size), size, |b, _| {
            b.iter(|| OptimalMatcher.assign(black_box(&detections), black_box(&tracks), 150.0))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_track_update, bench_assignment);
criterion_main!(benches);
