use alias_model::{
    AliasModel, AnimateOutput, BoneScratch, FrameBlend, LoadContext, NullMaterialLibrary,
    TraceMasks, load_model,
};
use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec3;
use std::hint::black_box;

const GRID: usize = 32;

fn push_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// A GRID x GRID vertex sheet with two frames, the second one rippled
fn create_test_mdl() -> Vec<u8> {
    let num_verts = GRID * GRID;
    let num_tris = (GRID - 1) * (GRID - 1) * 2;
    let mut data = b"IDPO".to_vec();
    push_i32(&mut data, 6);
    for v in [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 64.0, 0.0, 0.0, 0.0] {
        push_f32(&mut data, v);
    }
    for v in [1, 8, 8, num_verts as i32, num_tris as i32, 2, 0, 0] {
        push_i32(&mut data, v);
    }
    push_f32(&mut data, 0.0);
    push_i32(&mut data, 0);
    data.extend_from_slice(&[0u8; 64]);

    for i in 0..num_verts {
        push_i32(&mut data, 0);
        push_i32(&mut data, (i % 8) as i32);
        push_i32(&mut data, (i / GRID % 8) as i32);
    }
    for y in 0..GRID - 1 {
        for x in 0..GRID - 1 {
            let i = (y * GRID + x) as i32;
            let g = GRID as i32;
            for tri in [[i, i + 1, i + g + 1], [i, i + g + 1, i + g]] {
                push_i32(&mut data, 1);
                tri.iter().for_each(|&v| push_i32(&mut data, v));
            }
        }
    }
    for frame in 0..2u8 {
        push_i32(&mut data, 0);
        data.extend_from_slice(&[0u8; 8]);
        let mut name = [0u8; 16];
        name[..5].copy_from_slice(b"frame");
        name[5] = b'0' + frame;
        data.extend_from_slice(&name);
        for i in 0..num_verts {
            let (x, y) = ((i % GRID) as u8, (i / GRID) as u8);
            let z = if frame == 0 { 0 } else { (x + y) % 7 };
            data.extend_from_slice(&[x * 4, y * 4, z, 0]);
        }
    }
    data
}

fn load_test_model(data: &[u8]) -> AliasModel {
    let mut materials = NullMaterialLibrary;
    let mut ctx = LoadContext::new(&mut materials);
    load_model("bench.mdl", data, &mut ctx).unwrap()
}

fn bench_model_load(c: &mut Criterion) {
    let data = create_test_mdl();

    c.bench_function("load_mdl", |b| {
        b.iter(|| {
            let _model = load_test_model(black_box(&data));
        })
    });
}

fn bench_morph_animate(c: &mut Criterion) {
    let model = load_test_model(&create_test_mdl());
    let n = model.mesh.num_vertices();
    let mut vertices = vec![Vec3::ZERO; n];
    let mut normals = vec![Vec3::ZERO; n];
    let mut scratch = BoneScratch::for_model(&model);
    let blend = FrameBlend::lerp(0, 1, 0.3);

    c.bench_function("animate_mdl_lerp", |b| {
        b.iter(|| {
            let mut output = AnimateOutput::new()
                .with_vertices(&mut vertices)
                .with_normals(&mut normals);
            model.animate(black_box(&blend), None, &mut output, &mut scratch);
        })
    });
}

fn bench_trace(c: &mut Criterion) {
    let model = load_test_model(&create_test_mdl());
    let start = Vec3::new(60.0, 60.0, -20.0);
    let end = Vec3::new(60.0, 60.0, 20.0);

    c.bench_function("trace_line_static", |b| {
        b.iter(|| {
            model.trace_line(&FrameBlend::single(0), None, black_box(start), end, TraceMasks::default())
        })
    });
    c.bench_function("trace_line_animated", |b| {
        b.iter(|| {
            model.trace_line(&FrameBlend::lerp(0, 1, 0.5), None, black_box(start), end, TraceMasks::default())
        })
    });
}

criterion_group!(benches, bench_model_load, bench_morph_animate, bench_trace);
criterion_main!(benches);
