//! Quake `.mdl` (IDPO version 6)
//!
//! Vertices are bytes scaled by one model-wide transform. Skins are embedded
//! 8-bit images, optionally grouped into animated sequences, and frames may
//! likewise be grouped into timed sequences.
//!
//! Texture coordinates belong to the vertex, not the triangle corner, so a
//! vertex on the seam between the front and back halves of the skin is
//! duplicated: back-facing triangles use a copy shifted half a skin width to
//! the right. Copies no triangle uses are dropped again.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3};

use crate::bounds::apply_sampled_bounds;
use crate::error::{AliasError, Result};
use crate::formats::{compile_frames, finish_geometry};
use crate::loader::LoadContext;
use crate::material::{Material, materials_for_mesh};
use crate::model::{
    AliasModel, AnimScene, Animator, FrameTransform, ModelFormat, Surface, SyncType, TriVertex,
};
use crate::reader::{ByteStream, ModelData, ReadAliasExt};

/// File identifier
pub const IDENT: [u8; 4] = *b"IDPO";
/// Only supported version
pub const VERSION: i32 = 6;

const HEADER_SIZE: usize = 84;
const STVERT_SIZE: usize = 12;
const TRIANGLE_SIZE: usize = 16;
const TRIVERTX_SIZE: usize = 4;
/// bboxmin, bboxmax and a 16 byte name
const FRAME_HEADER_SIZE: usize = 24;
/// numframes, bboxmin and bboxmax
const GROUP_HEADER_SIZE: usize = 12;
const MAX_COUNT: i64 = 65536;
/// Surface name matched against skin file entries
const MESH_NAME: &str = "default";

/// Fixed header at the start of the file
#[derive(Debug, Clone)]
struct MdlHeader {
    scale: Vec3,
    scale_origin: Vec3,
    num_skins: usize,
    skin_width: usize,
    skin_height: usize,
    num_verts: usize,
    num_tris: usize,
    num_frames: usize,
    sync_type: SyncType,
    flags: i32,
}

impl MdlHeader {
    fn parse(data: &ModelData<'_>) -> Result<Self> {
        let mut r = data.region("header", 0, HEADER_SIZE)?;
        let mut ident = [0u8; 4];
        r.read_exact(&mut ident)?;
        let version = r.read_i32::<LittleEndian>()?;
        if version != VERSION {
            return Err(AliasError::UnsupportedVersion {
                model: data.name().to_string(),
                version: i64::from(version),
                expected: VERSION.to_string(),
            });
        }

        let scale = r.read_vec3()?;
        let scale_origin = r.read_vec3()?;
        let _bounding_radius = r.read_f32::<LittleEndian>()?;
        let _eye_position = r.read_vec3()?;
        let num_skins = r.read_i32::<LittleEndian>()?;
        let skin_width = r.read_i32::<LittleEndian>()?;
        let skin_height = r.read_i32::<LittleEndian>()?;
        let num_verts = r.read_i32::<LittleEndian>()?;
        let num_tris = r.read_i32::<LittleEndian>()?;
        let num_frames = r.read_i32::<LittleEndian>()?;
        let sync_type = r.read_i32::<LittleEndian>()?;
        let flags = r.read_i32::<LittleEndian>()?;

        let sync_type = match data.count("synctype", i64::from(sync_type), 0, 2)? {
            0 => SyncType::Sync,
            _ => SyncType::Rand,
        };

        let header = Self {
            scale,
            scale_origin,
            num_skins: data.count("numskins", i64::from(num_skins), 0, MAX_COUNT)?,
            skin_width: data.count("skinwidth", i64::from(skin_width), 0, MAX_COUNT)?,
            skin_height: data.count("skinheight", i64::from(skin_height), 0, MAX_COUNT)?,
            num_verts: data.count("numverts", i64::from(num_verts), 0, MAX_COUNT)?,
            num_tris: data.count("numtris", i64::from(num_tris), 0, MAX_COUNT)?,
            num_frames: data.count("numframes", i64::from(num_frames), 0, MAX_COUNT)?,
            sync_type,
            flags,
        };
        // Invalid corners are reset to vertex 0, which must exist
        if header.num_verts == 0 && header.num_tris > 0 {
            return Err(data.validation(format!(
                "{} triangles but no vertices",
                header.num_tris
            )));
        }
        Ok(header)
    }
}

/// Rendering effects from the header flags: the low byte moves to the top
pub(crate) fn effects_from_flags(flags: i32) -> u32 {
    let flags = flags as u32;
    ((flags & 0xFF) << 24) | (flags & 0x00FF_FF00)
}

/// First interval of a group, replaced when too small to be meaningful
fn group_interval(model: &str, interval: f32) -> f32 {
    if interval < 0.01 {
        log::warn!("{model} has an invalid interval {interval}, changing to 0.1");
        0.1
    } else {
        interval
    }
}

/// One skin entry: a single image or an animated group
struct SkinGroup<'a> {
    interval: f32,
    images: Vec<&'a [u8]>,
}

fn read_skins<'a>(
    data: &ModelData<'a>,
    stream: &mut ByteStream<'a>,
    header: &MdlHeader,
) -> Result<Vec<SkinGroup<'a>>> {
    let image_size = header.skin_width * header.skin_height;
    let mut skins = Vec::with_capacity(header.num_skins);
    for _ in 0..header.num_skins {
        let kind = stream.read_i32("skin type")?;
        let (count, interval) = if kind == 0 {
            (1, 0.1)
        } else {
            let count = stream.read_i32("skin group")?;
            let count = data.count("skin group size", i64::from(count), 1, MAX_COUNT)?;
            let mut intervals = stream.take_table("skin intervals", count, 4)?;
            let first = intervals.read_f32::<LittleEndian>()?;
            (count, group_interval(data.name(), first))
        };
        let images = (0..count)
            .map(|_| stream.take("skin image", image_size))
            .collect::<Result<Vec<_>>>()?;
        skins.push(SkinGroup { interval, images });
    }
    Ok(skins)
}

/// A triangle as stored: facing flag plus source vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MdlTriangle {
    pub faces_front: bool,
    pub vertices: [i32; 3],
}

/// Result of seam duplication and compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeamLayout {
    /// For each of the `2 * num_verts` provisional vertices, its compacted
    /// index or -1 when unused
    pub remap: Vec<i32>,
    pub triangles: Vec<[u32; 3]>,
    pub num_vertices: usize,
}

/// Duplicate on-seam vertices for back-facing triangles, then compact
///
/// Provisional vertex `i + num_verts` is the back-side copy of vertex `i`.
/// Invalid source indices are replaced by 0 with a warning.
pub(crate) fn build_seam_layout(
    model: &str,
    num_verts: usize,
    on_seam: &[bool],
    triangles: &[MdlTriangle],
) -> SeamLayout {
    let mut provisional = Vec::with_capacity(triangles.len());
    for (t, tri) in triangles.iter().enumerate() {
        let mut out = [0usize; 3];
        for (corner, &index) in out.iter_mut().zip(tri.vertices.iter()) {
            let mut v = match usize::try_from(index) {
                Ok(v) if v < num_verts => v,
                _ => {
                    log::warn!("{model}: triangle {t} has invalid vertex index {index}");
                    0
                }
            };
            if !tri.faces_front && on_seam.get(v).copied().unwrap_or(false) {
                v += num_verts;
            }
            *corner = v;
        }
        provisional.push(out);
    }

    let mut used = vec![false; num_verts * 2];
    for tri in &provisional {
        for &v in tri {
            used[v] = true;
        }
    }
    let mut remap = vec![-1i32; num_verts * 2];
    let mut num_vertices = 0usize;
    for (slot, &is_used) in remap.iter_mut().zip(&used) {
        if is_used {
            *slot = num_vertices as i32;
            num_vertices += 1;
        }
    }
    let triangles = provisional
        .iter()
        .map(|tri| tri.map(|v| remap[v] as u32))
        .collect();

    SeamLayout {
        remap,
        triangles,
        num_vertices,
    }
}

fn read_trivertex(bytes: &[u8]) -> TriVertex {
    TriVertex {
        v: [bytes[0], bytes[1], bytes[2]],
        normal_index: bytes[3],
    }
}

/// Scatter one stored frame into compacted order, feeding both seam copies
fn convert_frame(raw: &[u8], layout: &SeamLayout, num_verts: usize, out: &mut [TriVertex]) {
    for (i, bytes) in raw.chunks_exact(TRIVERTX_SIZE).enumerate() {
        let vertex = read_trivertex(bytes);
        for source in [i, i + num_verts] {
            if let Some(slot) = layout
                .remap
                .get(source)
                .and_then(|&r| usize::try_from(r).ok())
                .and_then(|r| out.get_mut(r))
            {
                *slot = vertex;
            }
        }
    }
}

fn read_frames(
    data: &ModelData<'_>,
    stream: &mut ByteStream<'_>,
    header: &MdlHeader,
    layout: &SeamLayout,
    model: &mut AliasModel,
) -> Result<()> {
    let frame_vertex_bytes = header.num_verts * TRIVERTX_SIZE;
    for _ in 0..header.num_frames {
        let kind = stream.read_i32("frame type")?;
        let (count, interval) = if kind == 0 {
            (1, 0.1)
        } else {
            let mut group = stream.take("frame group", GROUP_HEADER_SIZE)?;
            let count = group.read_i32::<LittleEndian>()?;
            let count = data.count("frame group size", i64::from(count), 1, MAX_COUNT)?;
            let mut intervals = stream.take_table("frame intervals", count, 4)?;
            let first = intervals.read_f32::<LittleEndian>()?;
            (count, group_interval(data.name(), first))
        };

        let first_pose = model.mesh.num_morph_frames;
        let mut scene_name = String::new();
        for j in 0..count {
            let mut frame_header = stream.take("frame header", FRAME_HEADER_SIZE)?;
            let mut bbox = [0u8; 8];
            frame_header.read_exact(&mut bbox)?;
            let name = frame_header.read_name(16)?;
            if j == 0 {
                scene_name = name;
            }
            let raw = stream.take("frame vertices", frame_vertex_bytes)?;
            let mut vertices = vec![TriVertex::default(); layout.num_vertices];
            convert_frame(raw, layout, header.num_verts, &mut vertices);
            model.mesh.morph_mdl_vertices.extend(vertices);
            model.mesh.num_morph_frames += 1;
        }
        model
            .frame_scenes
            .push(AnimScene::new(scene_name, first_pose, count, 1.0 / interval));
    }
    Ok(())
}

/// Resolve the skin table from skin files or the embedded images
fn build_skins(
    name: &str,
    skins: &[SkinGroup<'_>],
    header: &MdlHeader,
    ctx: &mut LoadContext<'_>,
    model: &mut AliasModel,
) {
    let skin_files = ctx.materials.load_skin_files(name);
    if !skin_files.is_empty() {
        let materials = materials_for_mesh(ctx.materials, name, &skin_files, MESH_NAME, "");
        for (i, material) in materials.into_iter().enumerate() {
            model.skin_scenes.push(AnimScene::new(format!("skin {i}"), i, 1, 10.0));
            model.textures.push(material);
        }
        return;
    }

    for (i, group) in skins.iter().enumerate() {
        model.skin_scenes.push(AnimScene::new(
            format!("skin {i}"),
            model.textures.len(),
            group.images.len(),
            1.0 / group.interval,
        ));
        for (j, pixels) in group.images.iter().enumerate() {
            let skin_name = if group.images.len() > 1 {
                format!("{name}_{i}_{j}")
            } else {
                format!("{name}_{i}")
            };
            let material = match ctx.materials.load_shader(name, &skin_name) {
                Some(material) => material,
                None => ctx.materials.load_internal_skin(
                    &skin_name,
                    pixels,
                    header.skin_width,
                    header.skin_height,
                ),
            };
            model.textures.push(material);
        }
    }

    // Numbered images next to the model add skins the file does not carry.
    let cap = ctx.config.max_external_skins;
    let mut found = 0;
    loop {
        if found >= cap {
            log::debug!("{name}: stopped probing external skins after {cap}");
            break;
        }
        let skin_name = format!("{name}_{}", model.skin_scenes.len());
        let Some(material) = ctx.materials.load_external_skin(&skin_name) else {
            break;
        };
        let scene = AnimScene::new(skin_name, model.textures.len(), 1, 10.0);
        model.skin_scenes.push(scene);
        model.textures.push(material);
        found += 1;
    }

    if model.textures.is_empty() {
        model.skin_scenes.push(AnimScene::new("skin 0", 0, 1, 10.0));
        model.textures.push(Material::missing(name));
    }
}

/// Load an MDL file
pub fn load(name: &str, bytes: &[u8], ctx: &mut LoadContext<'_>) -> Result<AliasModel> {
    let data = ModelData::new(name, bytes);
    super::check_ident(&data, &IDENT)?;
    let header = MdlHeader::parse(&data)?;
    log::debug!(
        "{name}: {} skins of {}x{}, {} vertices, {} triangles, {} frames",
        header.num_skins,
        header.skin_width,
        header.skin_height,
        header.num_verts,
        header.num_tris,
        header.num_frames
    );

    let mut stream = data.stream(HEADER_SIZE);
    let skins = read_skins(&data, &mut stream, &header)?;

    // Texture coordinates, with the back-side copy half a skin to the right
    let stverts = stream.take_table("texcoords", header.num_verts, STVERT_SIZE)?;
    let inv_width = if header.skin_width > 0 { 1.0 / header.skin_width as f32 } else { 0.0 };
    let inv_height = if header.skin_height > 0 { 1.0 / header.skin_height as f32 } else { 0.0 };
    let mut on_seam = Vec::with_capacity(header.num_verts);
    let mut texcoords = vec![Vec2::ZERO; header.num_verts * 2];
    for (i, mut record) in stverts.chunks_exact(STVERT_SIZE).enumerate() {
        on_seam.push(record.read_i32::<LittleEndian>()? != 0);
        let s = record.read_i32::<LittleEndian>()? as f32 * inv_width;
        let t = record.read_i32::<LittleEndian>()? as f32 * inv_height;
        texcoords[i] = Vec2::new(s, t);
        texcoords[i + header.num_verts] = Vec2::new(s + 0.5, t);
    }

    let raw_triangles = stream.take_table("triangles", header.num_tris, TRIANGLE_SIZE)?;
    let mut triangles = Vec::with_capacity(header.num_tris);
    for mut record in raw_triangles.chunks_exact(TRIANGLE_SIZE) {
        let faces_front = record.read_i32::<LittleEndian>()? != 0;
        let mut vertices = [0i32; 3];
        record.read_i32_into::<LittleEndian>(&mut vertices)?;
        triangles.push(MdlTriangle {
            faces_front,
            vertices,
        });
    }
    let layout = build_seam_layout(name, header.num_verts, &on_seam, &triangles);

    let mut model = AliasModel::empty(name, ModelFormat::Mdl, ctx.config.clone());
    model.sync_type = header.sync_type;
    model.effects = effects_from_flags(header.flags);
    model.animator = Animator::MdlMorph;
    model.mesh.vertices = vec![Vec3::ZERO; layout.num_vertices];
    model.mesh.texcoords = vec![Vec2::ZERO; layout.num_vertices];
    for (source, &target) in layout.remap.iter().enumerate() {
        if let Ok(target) = usize::try_from(target) {
            model.mesh.texcoords[target] = texcoords[source];
        }
    }
    model.mesh.triangles = layout.triangles.clone();

    read_frames(&data, &mut stream, &header, &layout, &mut model)?;
    model.num_poses = model.mesh.num_morph_frames;
    model.mesh.morph_frame_transforms = vec![
        FrameTransform {
            scale: header.scale,
            translate: header.scale_origin,
        };
        model.num_poses
    ];

    model.surfaces.push(Surface {
        name: MESH_NAME.to_string(),
        first_triangle: 0,
        num_triangles: model.mesh.num_triangles(),
        first_vertex: 0,
        num_vertices: model.mesh.num_vertices(),
        texture_index: 0,
    });
    build_skins(name, &skins, &header, ctx, &mut model);

    apply_sampled_bounds(&mut model);
    compile_frames(&mut model);
    finish_geometry(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tri(faces_front: bool, vertices: [i32; 3]) -> MdlTriangle {
        MdlTriangle {
            faces_front,
            vertices,
        }
    }

    #[test]
    fn test_effects_move_low_byte_to_top() {
        assert_eq!(effects_from_flags(0x01), 0x0100_0000);
        assert_eq!(effects_from_flags(0x0012_3480), 0x8012_3400);
        assert_eq!(effects_from_flags(-1), 0xFFFF_FF00);
    }

    #[test]
    fn test_front_facing_seam_keeps_original() {
        let layout = build_seam_layout("m", 3, &[true, false, false], &[tri(true, [0, 1, 2])]);
        assert_eq!(layout.num_vertices, 3);
        assert_eq!(layout.triangles, vec![[0, 1, 2]]);
        assert_eq!(layout.remap[3..], [-1, -1, -1]);
    }

    #[test]
    fn test_back_facing_seam_vertex_is_duplicated() {
        // Vertex 0 is on the seam and used by both sides.
        let triangles = [tri(true, [0, 1, 2]), tri(false, [0, 2, 3])];
        let layout = build_seam_layout("m", 4, &[true, false, false, false], &triangles);
        assert_eq!(layout.num_vertices, 5);
        assert_eq!(layout.triangles, vec![[0, 1, 2], [4, 2, 3]]);
        assert_eq!(layout.remap, vec![0, 1, 2, 3, 4, -1, -1, -1]);
    }

    #[test]
    fn test_unused_vertices_are_compacted_away() {
        let triangles = [tri(false, [3, 4, 1])];
        let layout = build_seam_layout("m", 5, &[false, false, false, true, false], &triangles);
        // 1, 4 and the back copy of 3 survive, in index order.
        assert_eq!(layout.num_vertices, 3);
        assert_eq!(layout.triangles, vec![[2, 1, 0]]);
        assert_eq!(layout.remap[1], 0);
        assert_eq!(layout.remap[4], 1);
        assert_eq!(layout.remap[8], 2);
    }

    #[test]
    fn test_invalid_index_becomes_zero() {
        let layout = build_seam_layout("m", 3, &[false; 3], &[tri(true, [0, 7, -2])]);
        assert_eq!(layout.triangles, vec![[0, 0, 0]]);
        assert_eq!(layout.num_vertices, 1);
    }

    #[test]
    fn test_convert_frame_feeds_both_copies() {
        let layout = build_seam_layout("m", 2, &[true, false], &[tri(false, [0, 1, 0])]);
        // provisional 1 and 2 (back copy of 0) survive
        let raw = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut out = vec![TriVertex::default(); layout.num_vertices];
        convert_frame(&raw, &layout, 2, &mut out);
        assert_eq!(out[0], TriVertex { v: [5, 6, 7], normal_index: 8 });
        assert_eq!(out[1], TriVertex { v: [1, 2, 3], normal_index: 4 });
    }
}
