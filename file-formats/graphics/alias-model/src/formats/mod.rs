//! Format loaders
//!
//! Each submodule parses one on-disk layout into an [`AliasModel`]. The
//! finishing steps every loader shares (per-frame texture vectors, bounds,
//! the static collision tree) live here.

pub mod iqm;
pub mod md2;
pub mod md3;
pub mod mdl;

use glam::Vec3;

use crate::animate::{AnimateOutput, BoneScratch};
use crate::collision::Bih;
use crate::error::{AliasError, Result};
use crate::frame_blend::FrameBlend;
use crate::model::{AliasModel, TexVecVertex};
use crate::reader::ModelData;
use crate::tangents::build_texture_vectors;

/// Reject a file whose identifier is not `expected`
pub(crate) fn check_ident(data: &ModelData<'_>, expected: &[u8]) -> Result<()> {
    let actual = data.region("identifier", 0, expected.len())?;
    if actual == expected {
        return Ok(());
    }
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string();
    Err(AliasError::InvalidMagic {
        expected: text(expected),
        actual: text(actual),
    })
}

fn quantize_unit(v: Vec3) -> [i8; 3] {
    [(v.x * 127.0) as i8, (v.y * 127.0) as i8, (v.z * 127.0) as i8]
}

/// Build the per-frame texture vectors of a morph model
///
/// Frames are evaluated from last to first so the plain attribute arrays end
/// up holding frame 0.
pub(crate) fn compile_frames(model: &mut AliasModel) {
    let n = model.mesh.num_vertices();
    let frames = model.mesh.num_morph_frames;
    if n == 0 || frames == 0 {
        return;
    }
    let area_weighting = model.config.smooth_normals_area_weighting;
    let mut texvecs = vec![TexVecVertex::default(); n * frames];
    let mut vertices = vec![Vec3::ZERO; n];
    let mut normals = vec![Vec3::ZERO; n];
    let mut svectors = vec![Vec3::ZERO; n];
    let mut tvectors = vec![Vec3::ZERO; n];
    let mut scratch = BoneScratch::new();

    for frame in (0..frames).rev() {
        let mut output = AnimateOutput::new()
            .with_vertices(&mut vertices)
            .with_normals(&mut normals);
        model.animate(&FrameBlend::single(frame), None, &mut output, &mut scratch);
        build_texture_vectors(
            &vertices,
            &model.mesh.texcoords,
            &normals,
            &model.mesh.triangles,
            area_weighting,
            &mut svectors,
            &mut tvectors,
        );
        for (j, out) in texvecs[frame * n..(frame + 1) * n].iter_mut().enumerate() {
            *out = TexVecVertex {
                svec: quantize_unit(svectors[j]),
                tvec: quantize_unit(tvectors[j]),
            };
        }
    }

    let mesh = &mut model.mesh;
    mesh.morph_texvecs = texvecs;
    mesh.vertices = vertices;
    mesh.normals = normals;
    mesh.svectors = svectors;
    mesh.tvectors = tvectors;
}

/// Build the static collision tree and the 16-bit element copy
///
/// The tree always holds the geometry of frame 0 at full weight, which for
/// skeletal models differs from the stored bind pose.
pub(crate) fn finish_geometry(model: &mut AliasModel) {
    let mut scratch = BoneScratch::for_model(model);
    let frame0 = model.animate_vertices(&FrameBlend::single(0), None, &mut scratch);
    model.bih = Bih::build(&frame0, &model.mesh.triangles, &model.surfaces);
    model.mesh.build_short_triangles();
    log::debug!(
        "{}: {} {} vertices, {} triangles, {} surfaces, {} poses, animated: {}",
        model.name,
        model.format,
        model.mesh.num_vertices(),
        model.mesh.num_triangles(),
        model.surfaces.len(),
        model.num_poses,
        model.is_animated
    );
}
