//! Skeletal vertex blending
//!
//! Bone deformation matrices are built once per evaluation, followed by one
//! matrix per stored blend combination (the influence-weighted sum of its
//! bones). Every vertex is then transformed by the single matrix its blend
//! index selects.

use glam::{Affine3A, Vec3, Vec3A};

use super::{AnimateOutput, BoneScratch, copy_rest_pose};
use crate::blend_weights::BlendWeights;
use crate::config::SkinningBackend;
use crate::frame_blend::FrameBlend;
use crate::matrix::Matrix3x4;
use crate::model::AliasModel;
use crate::pose::{Skeleton, build_bone_transforms};
use crate::simd::resolve_backend;

pub(super) fn animate(
    model: &AliasModel,
    blend: &FrameBlend,
    skeleton: Option<&Skeleton>,
    output: &mut AnimateOutput<'_>,
    scratch: &mut BoneScratch,
) {
    let num_bones = model.num_bones();
    if num_bones == 0 {
        copy_rest_pose(model, output);
        return;
    }
    let blends = &model.mesh.blends;
    let blend = blend.clamped(model.num_poses());

    let matrices = scratch.matrices(2 * num_bones + blends.len());
    let (bone_pose, relative) = matrices.split_at_mut(num_bones);
    {
        let (relative_bones, combinations) = relative.split_at_mut(num_bones);
        build_bone_transforms(model, &blend, skeleton, &model.config, bone_pose, relative_bones);
        combine_blends(relative_bones, blends, combinations);
    }

    match resolve_backend(model.config.skinning_backend) {
        SkinningBackend::Generic => skin_generic(model, relative, output),
        SkinningBackend::Vectorized => {
            scratch.columns.clear();
            scratch
                .columns
                .extend(scratch.matrices[num_bones..2 * num_bones + blends.len()].iter().map(to_affine));
            skin_vectorized(model, &scratch.columns, output);
        }
    }
}

/// Influence-weighted matrix for every stored blend combination
fn combine_blends(relative: &[Matrix3x4], blends: &[BlendWeights], out: &mut [Matrix3x4]) {
    for (combined, weights) in out.iter_mut().zip(blends) {
        *combined = Matrix3x4::ZERO;
        // Slot 0 always contributes; a zero influence ends the list after it
        for (k, (&index, &influence)) in weights.index.iter().zip(weights.influence.iter()).enumerate() {
            if k > 0 && influence == 0 {
                break;
            }
            if let Some(bone) = relative.get(usize::from(index)) {
                combined.accumulate(bone, f32::from(influence) * (1.0 / 255.0));
            }
        }
    }
}

fn to_affine(m: &Matrix3x4) -> Affine3A {
    let r = &m.rows;
    Affine3A::from_cols(
        Vec3A::new(r[0][0], r[1][0], r[2][0]),
        Vec3A::new(r[0][1], r[1][1], r[2][1]),
        Vec3A::new(r[0][2], r[1][2], r[2][2]),
        Vec3A::new(r[0][3], r[1][3], r[2][3]),
    )
}

fn skin_generic(model: &AliasModel, matrices: &[Matrix3x4], output: &mut AnimateOutput<'_>) {
    let mesh = &model.mesh;
    let select = |i: usize| {
        mesh.blend_indices
            .get(i)
            .and_then(|&b| matrices.get(b as usize))
            .unwrap_or(&Matrix3x4::IDENTITY)
    };
    if let Some(out) = output.vertices.as_deref_mut() {
        for (i, (o, v)) in out.iter_mut().zip(&mesh.vertices).enumerate() {
            *o = select(i).transform_point(*v);
        }
    }
    for (dst, src) in [
        (output.normals.as_deref_mut(), &mesh.normals),
        (output.svectors.as_deref_mut(), &mesh.svectors),
        (output.tvectors.as_deref_mut(), &mesh.tvectors),
    ] {
        if let Some(out) = dst {
            for (i, (o, v)) in out.iter_mut().zip(src).enumerate() {
                *o = select(i).transform_vector(*v);
            }
        }
    }
}

fn skin_vectorized(model: &AliasModel, matrices: &[Affine3A], output: &mut AnimateOutput<'_>) {
    let mesh = &model.mesh;
    let select = |i: usize| {
        mesh.blend_indices
            .get(i)
            .and_then(|&b| matrices.get(b as usize))
            .unwrap_or(&Affine3A::IDENTITY)
    };
    if let Some(out) = output.vertices.as_deref_mut() {
        for (i, (o, v)) in out.iter_mut().zip(&mesh.vertices).enumerate() {
            *o = Vec3::from(select(i).transform_point3a(Vec3A::from(*v)));
        }
    }
    for (dst, src) in [
        (output.normals.as_deref_mut(), &mesh.normals),
        (output.svectors.as_deref_mut(), &mesh.svectors),
        (output.tvectors.as_deref_mut(), &mesh.tvectors),
    ] {
        if let Some(out) = dst {
            for (i, (o, v)) in out.iter_mut().zip(src).enumerate() {
                *o = Vec3::from(select(i).transform_vector3a(Vec3A::from(*v)));
            }
        }
    }
}
