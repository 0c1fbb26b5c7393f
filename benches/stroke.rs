use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use paint_rig::{
    find_intersections, BrushConfig, BrushEngine, CubicBezier, PointD, PointerSample,
    RenderingBuffer, Rgba8, StampEngine,
};

fn long_stroke(engine: StampEngine) -> usize {
    let mut brush: BrushEngine = BrushEngine::with_rng(StdRng::seed_from_u64(1));
    brush.set_target(RenderingBuffer::new(512, 512));
    brush.set_color(Rgba8::new_opaque(200, 40, 40));
    let config = BrushConfig {
        engine,
        size: 24.0,
        hardness: 0.6,
        pressure_affects_size: true,
        ..Default::default()
    };
    brush.start_stroke(&PointerSample::new(20.0, 256.0, 0.5, 0.0), &config);
    for i in 1..=200 {
        let t = i as f64 / 200.0;
        let sample = PointerSample::new(
            20.0 + 470.0 * t,
            256.0 + 180.0 * (t * 12.0).sin(),
            0.5 + 0.5 * t,
            i as f64 * 8.0,
        );
        brush.draw_stroke(&sample, &config);
    }
    brush.end_stroke().map_or(0, |s| s.stamps)
}

fn bench_strokes(c: &mut Criterion) {
    c.bench_function("stroke_standard", |b| {
        b.iter(|| black_box(long_stroke(StampEngine::Standard)))
    });
    c.bench_function("stroke_hairy", |b| {
        b.iter(|| black_box(long_stroke(StampEngine::Hairy)))
    });
}

fn bench_intersections(c: &mut Criterion) {
    let a = CubicBezier::new(
        PointD::new(0.0, 0.0),
        PointD::new(100.0, 300.0),
        PointD::new(200.0, -200.0),
        PointD::new(300.0, 100.0),
    );
    let b = CubicBezier::new(
        PointD::new(0.0, 100.0),
        PointD::new(100.0, -200.0),
        PointD::new(200.0, 300.0),
        PointD::new(300.0, 0.0),
    );
    c.bench_function("find_intersections", |bench| {
        bench.iter(|| black_box(find_intersections(black_box(&a), black_box(&b))))
    });
}

criterion_group!(benches, bench_strokes, bench_intersections);
criterion_main!(benches);
