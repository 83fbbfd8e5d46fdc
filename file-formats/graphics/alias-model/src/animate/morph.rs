//! Linear vertex morphing for MDL, MD2 and MD3
//!
//! The first blend entry overwrites the outputs and later entries add to
//! them. Normals are weighted sums and stay unnormalized.

use glam::Vec3;

use super::AnimateOutput;
use crate::frame_blend::FrameBlend;
use crate::model::{AliasModel, TexVecVertex};
use crate::normals::{byte_normal, md3_normal};

fn frame_slice<T>(all: &[T], frame: usize, n: usize) -> Option<&[T]> {
    all.get(frame * n..(frame + 1) * n)
}

#[inline]
fn write(out: &mut Vec3, value: Vec3, first: bool) {
    if first {
        *out = value;
    } else {
        *out += value;
    }
}

fn blend_texture_vectors(
    output: &mut AnimateOutput<'_>,
    texvecs: &[TexVecVertex],
    lerp: f32,
    first: bool,
) {
    let f = lerp * (1.0 / 127.0);
    let decode = |v: [i8; 3]| Vec3::new(f32::from(v[0]), f32::from(v[1]), f32::from(v[2])) * f;
    if let Some(svectors) = output.svectors.as_deref_mut() {
        for (out, tv) in svectors.iter_mut().zip(texvecs) {
            write(out, decode(tv.svec), first);
        }
    }
    if let Some(tvectors) = output.tvectors.as_deref_mut() {
        for (out, tv) in tvectors.iter_mut().zip(texvecs) {
            write(out, decode(tv.tvec), first);
        }
    }
}

/// MDL and MD2: byte positions with per-frame scale and translate
pub(super) fn animate_mdl(model: &AliasModel, blend: &FrameBlend, output: &mut AnimateOutput<'_>) {
    let mesh = &model.mesh;
    let n = mesh.num_vertices();
    let blend = blend.clamped(mesh.num_morph_frames);
    let entries = blend.effective_entries();

    // Blending the translates once is cheaper than per vertex.
    let translate = entries.iter().fold(Vec3::ZERO, |acc, e| {
        mesh.morph_frame_transforms
            .get(e.subframe)
            .map_or(acc, |t| acc + t.translate * e.lerp)
    });

    for (k, entry) in entries.iter().enumerate() {
        let first = k == 0;
        let Some(verts) = frame_slice(&mesh.morph_mdl_vertices, entry.subframe, n) else {
            continue;
        };
        if let Some(vertices) = output.vertices.as_deref_mut() {
            let scale = mesh
                .morph_frame_transforms
                .get(entry.subframe)
                .map_or(Vec3::ZERO, |t| t.scale * entry.lerp);
            for (out, v) in vertices.iter_mut().zip(verts) {
                let p = Vec3::new(
                    f32::from(v.v[0]) * scale.x,
                    f32::from(v.v[1]) * scale.y,
                    f32::from(v.v[2]) * scale.z,
                );
                if first {
                    *out = translate + p;
                } else {
                    *out += p;
                }
            }
        }
        if let Some(normals) = output.normals.as_deref_mut() {
            for (out, v) in normals.iter_mut().zip(verts) {
                write(out, byte_normal(v.normal_index) * entry.lerp, first);
            }
        }
        if let Some(texvecs) = frame_slice(&mesh.morph_texvecs, entry.subframe, n) {
            blend_texture_vectors(output, texvecs, entry.lerp, first);
        }
    }
}

/// MD3: short positions in 1/64 units and polar normals
pub(super) fn animate_md3(model: &AliasModel, blend: &FrameBlend, output: &mut AnimateOutput<'_>) {
    let mesh = &model.mesh;
    let n = mesh.num_vertices();
    let blend = blend.clamped(mesh.num_morph_frames);

    for (k, entry) in blend.effective_entries().iter().enumerate() {
        let first = k == 0;
        let Some(verts) = frame_slice(&mesh.morph_md3_vertices, entry.subframe, n) else {
            continue;
        };
        if let Some(vertices) = output.vertices.as_deref_mut() {
            let scale = entry.lerp * (1.0 / 64.0);
            for (out, v) in vertices.iter_mut().zip(verts) {
                let p = Vec3::new(
                    f32::from(v.origin[0]) * scale,
                    f32::from(v.origin[1]) * scale,
                    f32::from(v.origin[2]) * scale,
                );
                write(out, p, first);
            }
        }
        if let Some(normals) = output.normals.as_deref_mut() {
            for (out, v) in normals.iter_mut().zip(verts) {
                write(out, md3_normal(v.pitch, v.yaw, entry.lerp), first);
            }
        }
        if let Some(texvecs) = frame_slice(&mesh.morph_texvecs, entry.subframe, n) {
            blend_texture_vectors(output, texvecs, entry.lerp, first);
        }
    }
}
