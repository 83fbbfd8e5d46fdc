//! Quake II `.md2` (IDP2 version 8)
//!
//! Triangle corners index positions and texture coordinates separately.
//! Every distinct `(position, texcoord)` pair becomes one output vertex that
//! remembers its source position, which is how per-frame vertex data is
//! expanded.

use std::collections::HashMap;
use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3};

use crate::bounds::apply_sampled_bounds;
use crate::error::{AliasError, Result};
use crate::formats::{compile_frames, finish_geometry};
use crate::loader::LoadContext;
use crate::material::{Material, materials_for_mesh, strip_image_extension};
use crate::model::{AliasModel, AnimScene, Animator, FrameTransform, ModelFormat, Surface, TriVertex};
use crate::reader::{ModelData, ReadAliasExt, c_string};

/// File identifier
pub const IDENT: [u8; 4] = *b"IDP2";
/// Only supported version
pub const VERSION: i32 = 8;

const HEADER_SIZE: usize = 68;
const SKIN_NAME_SIZE: usize = 64;
const ST_SIZE: usize = 4;
const TRIANGLE_SIZE: usize = 12;
/// scale, translate and a 16 byte name
const FRAME_HEADER_SIZE: usize = 40;
const TRIVERTX_SIZE: usize = 4;
const MESH_NAME: &str = "default";

#[derive(Debug, Clone)]
struct Md2Header {
    skin_width: i32,
    skin_height: i32,
    num_skins: usize,
    num_xyz: usize,
    num_st: usize,
    num_tris: usize,
    num_frames: usize,
    ofs_skins: usize,
    ofs_st: usize,
    ofs_tris: usize,
    ofs_frames: usize,
}

impl Md2Header {
    fn parse(data: &ModelData<'_>) -> Result<Self> {
        let mut r = data.region("header", 0, HEADER_SIZE)?;
        let mut fields = [0i32; 17];
        r.read_i32_into::<LittleEndian>(&mut fields)?;
        let [
            _ident,
            version,
            skin_width,
            skin_height,
            _frame_size,
            num_skins,
            num_xyz,
            num_st,
            num_tris,
            _num_glcmds,
            num_frames,
            ofs_skins,
            ofs_st,
            ofs_tris,
            ofs_frames,
            ofs_glcmds,
            ofs_end,
        ] = fields;

        if version != VERSION {
            return Err(AliasError::UnsupportedVersion {
                model: data.name().to_string(),
                version: i64::from(version),
                expected: VERSION.to_string(),
            });
        }

        let num_tris = data.count("num_tris", i64::from(num_tris), 1, 65537)?;
        let num_xyz = data.count("num_xyz", i64::from(num_xyz), 1, 65537)?;
        let num_frames = data.count("num_frames", i64::from(num_frames), 1, 65537)?;
        let num_skins = data.count("num_skins", i64::from(num_skins), 0, 257)?;
        let num_st = data.count("num_st", i64::from(num_st), 0, 65537)?;

        let end = data.offset("ofs_end", i64::from(ofs_end))?;
        if end > data.len() {
            return Err(AliasError::OutOfBounds {
                model: data.name().to_string(),
                what: "ofs_end",
                offset: end,
                size: 0,
                len: data.len(),
            });
        }
        let check = |what: &'static str, ofs: i32| -> Result<usize> {
            match usize::try_from(ofs) {
                Ok(ofs) if ofs > 0 && ofs < end => Ok(ofs),
                _ => Err(data.validation(format!("{what} {ofs} is outside 1..{end}"))),
            }
        };
        let ofs_skins = if num_skins >= 1 { check("ofs_skins", ofs_skins)? } else { 0 };
        check("ofs_glcmds", ofs_glcmds)?;

        Ok(Self {
            skin_width,
            skin_height,
            num_skins,
            num_xyz,
            num_st,
            num_tris,
            num_frames,
            ofs_skins,
            ofs_st: check("ofs_st", ofs_st)?,
            ofs_tris: check("ofs_tris", ofs_tris)?,
            ofs_frames: check("ofs_frames", ofs_frames)?,
        })
    }
}

/// Triangle corners as stored: position indices then texcoord indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Md2Triangle {
    pub xyz: [u16; 3],
    pub st: [u16; 3],
}

/// Output vertices keyed by their source pair, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct VertexPairs {
    /// `(xyz, st)` of every output vertex
    pub pairs: Vec<(u16, u16)>,
    pub triangles: Vec<[u32; 3]>,
}

/// Merge identical `(xyz, st)` corners into shared vertices
///
/// Out-of-range indices are reset to 0 with a warning.
pub(crate) fn dedup_vertices(
    model: &str,
    num_xyz: usize,
    num_st: usize,
    triangles: &[Md2Triangle],
) -> VertexPairs {
    let mut lookup: HashMap<(u16, u16), u32> = HashMap::with_capacity(triangles.len() * 3);
    let mut out = VertexPairs {
        pairs: Vec::new(),
        triangles: Vec::with_capacity(triangles.len()),
    };
    for (t, tri) in triangles.iter().enumerate() {
        let mut elements = [0u32; 3];
        for (j, element) in elements.iter_mut().enumerate() {
            let mut xyz = tri.xyz[j];
            let mut st = tri.st[j];
            if usize::from(xyz) >= num_xyz {
                log::warn!("{model} has an invalid xyz index ({xyz}) on triangle {t}, resetting to 0");
                xyz = 0;
            }
            if usize::from(st) >= num_st {
                log::warn!("{model} has an invalid st index ({st}) on triangle {t}, resetting to 0");
                st = 0;
            }
            *element = *lookup.entry((xyz, st)).or_insert_with(|| {
                out.pairs.push((xyz, st));
                (out.pairs.len() - 1) as u32
            });
        }
        out.triangles.push(elements);
    }
    out
}

fn read_skins(
    name: &str,
    data: &ModelData<'_>,
    header: &Md2Header,
    ctx: &mut LoadContext<'_>,
) -> Result<Vec<Material>> {
    let skin_files = ctx.materials.load_skin_files(name);
    if !skin_files.is_empty() {
        return Ok(materials_for_mesh(ctx.materials, name, &skin_files, MESH_NAME, ""));
    }
    if header.num_skins == 0 {
        return Ok(vec![ctx.materials.missing(name)]);
    }
    let table = data.table("skins", header.ofs_skins, header.num_skins, SKIN_NAME_SIZE)?;
    Ok(table
        .chunks_exact(SKIN_NAME_SIZE)
        .map(|raw| {
            let skin = c_string(raw);
            ctx.materials.resolve(name, strip_image_extension(&skin))
        })
        .collect())
}

/// Load an MD2 file
pub fn load(name: &str, bytes: &[u8], ctx: &mut LoadContext<'_>) -> Result<AliasModel> {
    let data = ModelData::new(name, bytes);
    super::check_ident(&data, &IDENT)?;
    let header = Md2Header::parse(&data)?;
    log::debug!(
        "{name}: {} skins, {} positions, {} texcoords, {} triangles, {} frames",
        header.num_skins,
        header.num_xyz,
        header.num_st,
        header.num_tris,
        header.num_frames
    );

    let mut model = AliasModel::empty(name, ModelFormat::Md2, ctx.config.clone());
    model.animator = Animator::MdlMorph;

    let textures = read_skins(name, &data, &header, ctx)?;
    for i in 0..textures.len() {
        model.skin_scenes.push(AnimScene::new(format!("skin {i}"), i, 1, 10.0));
    }
    model.textures = textures;

    let raw_tris = data.table("triangles", header.ofs_tris, header.num_tris, TRIANGLE_SIZE)?;
    let mut triangles = Vec::with_capacity(header.num_tris);
    for mut record in raw_tris.chunks_exact(TRIANGLE_SIZE) {
        let mut xyz = [0u16; 3];
        let mut st = [0u16; 3];
        record.read_u16_into::<LittleEndian>(&mut xyz)?;
        record.read_u16_into::<LittleEndian>(&mut st)?;
        triangles.push(Md2Triangle { xyz, st });
    }
    let vertices = dedup_vertices(name, header.num_xyz, header.num_st, &triangles);
    let num_vertices = vertices.pairs.len();

    // Texture coordinates
    let st_table = data.table("texcoords", header.ofs_st, header.num_st, ST_SIZE)?;
    let inv_width = 1.0 / header.skin_width as f32;
    let inv_height = 1.0 / header.skin_height as f32;
    model.mesh.texcoords = Vec::with_capacity(num_vertices);
    for (i, &(_, st)) in vertices.pairs.iter().enumerate() {
        let offset = usize::from(st) * ST_SIZE;
        let (mut s, mut t) = match st_table.get(offset..offset + ST_SIZE) {
            Some(mut record) => (
                i32::from(record.read_i16::<LittleEndian>()?),
                i32::from(record.read_i16::<LittleEndian>()?),
            ),
            None => (0, 0),
        };
        if s < 0 || s >= header.skin_width || t < 0 || t >= header.skin_height {
            log::warn!("{name} has an invalid skin coordinate ({s} {t}) on vert {i}, changing to 0 0");
            s = 0;
            t = 0;
        }
        model
            .mesh
            .texcoords
            .push(Vec2::new(s as f32 * inv_width, t as f32 * inv_height));
    }

    // Frames, expanded through each vertex's source position
    let mut stream = data.stream(header.ofs_frames);
    let frame_vertex_bytes = header.num_xyz * TRIVERTX_SIZE;
    model.mesh.morph_mdl_vertices = Vec::with_capacity(num_vertices * header.num_frames);
    for i in 0..header.num_frames {
        let mut frame_header = stream.take("frame header", FRAME_HEADER_SIZE)?;
        let scale = frame_header.read_vec3()?;
        let translate = frame_header.read_vec3()?;
        let frame_name = frame_header.read_name(16)?;
        let raw = stream.take("frame vertices", frame_vertex_bytes)?;
        for &(xyz, _) in &vertices.pairs {
            let offset = usize::from(xyz) * TRIVERTX_SIZE;
            let mut record = [0u8; TRIVERTX_SIZE];
            if let Some(mut source) = raw.get(offset..offset + TRIVERTX_SIZE) {
                source.read_exact(&mut record)?;
            }
            model.mesh.morph_mdl_vertices.push(TriVertex {
                v: [record[0], record[1], record[2]],
                normal_index: record[3],
            });
        }
        model
            .mesh
            .morph_frame_transforms
            .push(FrameTransform { scale, translate });
        model.frame_scenes.push(AnimScene::new(frame_name, i, 1, 10.0));
    }
    model.mesh.num_morph_frames = header.num_frames;
    model.num_poses = header.num_frames;
    model.mesh.vertices = vec![Vec3::ZERO; num_vertices];
    model.mesh.triangles = vertices.triangles;

    model.surfaces.push(Surface {
        name: MESH_NAME.to_string(),
        first_triangle: 0,
        num_triangles: model.mesh.num_triangles(),
        first_vertex: 0,
        num_vertices,
        texture_index: 0,
    });

    apply_sampled_bounds(&mut model);
    compile_frames(&mut model);
    finish_geometry(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tri(xyz: [u16; 3], st: [u16; 3]) -> Md2Triangle {
        Md2Triangle { xyz, st }
    }

    #[test]
    fn test_identical_pairs_share_a_vertex() {
        let triangles = [tri([5, 1, 2], [12, 0, 0]), tri([2, 5, 3], [0, 12, 1])];
        let out = dedup_vertices("m", 6, 13, &triangles);
        assert_eq!(out.triangles[0][0], out.triangles[1][1]);
        assert_eq!(out.pairs, vec![(5, 12), (1, 0), (2, 0), (3, 1)]);
        assert_eq!(out.triangles, vec![[0, 1, 2], [2, 0, 3]]);
    }

    #[test]
    fn test_same_position_different_texcoord_splits() {
        let triangles = [tri([5, 5, 0], [12, 13, 0])];
        let out = dedup_vertices("m", 6, 14, &triangles);
        assert_ne!(out.triangles[0][0], out.triangles[0][1]);
        assert_eq!(out.pairs[0].0, out.pairs[1].0);
    }

    #[test]
    fn test_invalid_indices_reset_to_zero() {
        let out = dedup_vertices("m", 2, 2, &[tri([0, 9, 1], [1, 0, 7])]);
        assert_eq!(out.pairs, vec![(0, 1), (0, 0), (1, 0)]);
    }
}
