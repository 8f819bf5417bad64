use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::sync::Arc;

use terrastream::core::camera::Definition;
use terrastream::core::types::{DVec2, DVec3, UVec2};
use terrastream::streaming::{refine_functor, Cache};
use terrastream::tile::bounds::AabbDecoratorPtr;
use terrastream::tile::{quadtree, GpuCacheInfo, PlanarBounds, TileId};

fn decorator() -> AabbDecoratorPtr {
    Arc::new(PlanarBounds::new(DVec2::ZERO, DVec2::splat(1000.0), 0.0, 100.0))
}

fn overhead_camera() -> Definition {
    let mut camera = Definition::look_at(
        DVec3::new(500.0, 500.0, 250.0),
        DVec3::new(500.0, 500.0, 0.0),
        DVec3::Y,
    );
    camera.viewport = UVec2::new(1920, 1080);
    camera
}

fn bench_traverse(c: &mut Criterion) {
    let camera = overhead_camera();
    let decorator = decorator();

    c.bench_function("quadtree_traverse", |b| {
        b.iter(|| {
            let refine = refine_functor(black_box(&camera), &decorator, 2.0, 256);
            let mut inner = Vec::new();
            quadtree::traverse(TileId::ROOT, refine, |id| {
                inner.push(id);
                id.children()
            });
            inner
        });
    });
}

fn bench_cache_insert_visit_purge(c: &mut Criterion) {
    let entries: Vec<GpuCacheInfo> = (0..4096u32)
        .map(|i| GpuCacheInfo {
            id: TileId::new(12, i % 64, i / 64),
        })
        .collect();

    c.bench_function("cache_insert_visit_purge_4096", |b| {
        b.iter(|| {
            let mut cache = Cache::new(1024);
            cache.insert(black_box(entries.clone()));
            cache.visit(|info| info.id.x % 2 == 0);
            cache.purge()
        });
    });
}

criterion_group!(benches, bench_traverse, bench_cache_insert_visit_purge);
criterion_main!(benches);
