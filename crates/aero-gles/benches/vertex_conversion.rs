use std::sync::Arc;
use std::time::Duration;

use aero_gles::abi;
use aero_gles::recording::RecordingDispatch;
use aero_gles::vertex::conversion::DrawRange;
use aero_gles::vertex::IndexType;
use aero_gles::{ContextConfig, GlesContext, GlesVersion, HostGl, ShareGroup, VecGuestMemory};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const POSITIONS_GPA: u64 = 0x1000;

fn criterion_config() -> Criterion {
    match std::env::var("AERO_BENCH_PROFILE").as_deref() {
        Ok("ci") => Criterion::default()
            .warm_up_time(Duration::from_millis(150))
            .measurement_time(Duration::from_millis(400))
            .sample_size(10)
            .noise_threshold(0.05),
        _ => Criterion::default()
            .warm_up_time(Duration::from_secs(1))
            .measurement_time(Duration::from_secs(2))
            .sample_size(50)
            .noise_threshold(0.03),
    }
}

fn fixed_context(vertices: u32) -> (GlesContext, VecGuestMemory) {
    let host = Arc::new(HostGl::new(Arc::new(RecordingDispatch::desktop(""))));
    let mut ctx = GlesContext::new(
        GlesVersion::Gles1,
        host,
        ShareGroup::new(),
        ContextConfig::default(),
    );
    ctx.init();

    let len = vertices as usize * 3 * 4;
    let mut mem = VecGuestMemory::new(POSITIONS_GPA as usize + len);
    let data: Vec<u8> = (0..vertices * 3)
        .flat_map(|i| abi::float_to_fixed(i as f32 * 0.25).to_le_bytes())
        .collect();
    mem.write(POSITIONS_GPA, &data)
        .expect("positions fit in guest memory");

    ctx.set_pointer(abi::GL_VERTEX_ARRAY, 3, abi::GL_FIXED, 0, POSITIONS_GPA, false);
    ctx.enable_arr(abi::GL_VERTEX_ARRAY, true);
    (ctx, mem)
}

fn bench_fixed_to_float(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_to_float");

    for vertices in [64u32, 1024, 16384] {
        let (ctx, mem) = fixed_context(vertices);
        group.throughput(Throughput::Bytes(u64::from(vertices) * 12));

        group.bench_function(BenchmarkId::new("direct", vertices), |b| {
            b.iter(|| {
                let arrays = ctx
                    .setup_arrays_pointers(
                        &mem,
                        DrawRange::Direct {
                            first: 0,
                            count: black_box(vertices),
                        },
                    )
                    .expect("conversion succeeds");
                black_box(arrays.allocated_bytes());
            })
        });

        // Quads as two triangles each: every vertex is referenced, max index is the last one.
        let indices: Vec<u8> = (0..vertices / 4)
            .flat_map(|q| {
                let v = (q * 4) as u16;
                [v, v + 1, v + 2, v, v + 2, v + 3]
            })
            .flat_map(u16::to_le_bytes)
            .collect();
        let count = (indices.len() / 2) as u32;

        group.bench_function(BenchmarkId::new("indexed_u16", vertices), |b| {
            b.iter(|| {
                let arrays = ctx
                    .setup_arrays_pointers(
                        &mem,
                        DrawRange::Indexed {
                            count,
                            index_type: IndexType::U16,
                            indices: black_box(&indices),
                        },
                    )
                    .expect("conversion succeeds");
                black_box(arrays.allocated_bytes());
            })
        });
    }

    group.finish();
}

fn bench_find_max_index(c: &mut Criterion) {
    let indices: Vec<u8> = (0..65536u32)
        .flat_map(|i| (i.wrapping_mul(2_654_435_761) % 100_000).to_le_bytes())
        .collect();
    let mut group = c.benchmark_group("find_max_index");
    group.throughput(Throughput::Bytes(indices.len() as u64));
    group.bench_function("u32_65536", |b| {
        b.iter(|| aero_gles::find_max_index(65536, IndexType::U32, black_box(&indices)))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_fixed_to_float, bench_find_max_index
}
criterion_main!(benches);
