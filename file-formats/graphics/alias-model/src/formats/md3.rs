//! Quake III `.md3` (IDP3 version 15)
//!
//! A model is a list of meshes, each a self-contained block with its own
//! identifier and lump table. Vertex data is stored per frame as 1/64 unit
//! shorts with a polar normal. Tags are explicit per-frame matrices.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3};

use crate::bounds::apply_sampled_bounds;
use crate::error::{AliasError, Result};
use crate::formats::{compile_frames, finish_geometry};
use crate::loader::LoadContext;
use crate::material::{Material, materials_for_mesh};
use crate::model::{AliasModel, AliasTag, AnimScene, Animator, Md3Vertex, ModelFormat, Surface};
use crate::reader::{ModelData, ReadAliasExt, c_string};

use super::mdl::effects_from_flags;

/// File and mesh identifier
pub const IDENT: [u8; 4] = *b"IDP3";
/// Only supported version
pub const VERSION: i32 = 15;

const HEADER_SIZE: usize = 108;
const FRAMEINFO_SIZE: usize = 56;
const TAG_SIZE: usize = 112;
const MESH_HEADER_SIZE: usize = 108;
const SHADER_SIZE: usize = 68;
const ELEMENT_SIZE: usize = 12;
const TEXCOORD_SIZE: usize = 8;
const VERTEX_SIZE: usize = 8;
const NAME_SIZE: usize = 64;
const MAX_COUNT: i64 = 65536;

#[derive(Debug, Clone)]
struct Md3Header {
    flags: i32,
    num_frames: usize,
    num_tags: usize,
    num_meshes: usize,
    lump_frameinfo: usize,
    lump_tags: usize,
    lump_meshes: usize,
}

impl Md3Header {
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
        let _name = r.read_name(NAME_SIZE)?;
        let flags = r.read_i32::<LittleEndian>()?;
        let mut fields = [0i32; 8];
        r.read_i32_into::<LittleEndian>(&mut fields)?;
        let [num_frames, num_tags, num_meshes, _num_skins, lump_frameinfo, lump_tags, lump_meshes, _lump_end] =
            fields;

        Ok(Self {
            flags,
            num_frames: data.count("num_frames", i64::from(num_frames), 1, MAX_COUNT)?,
            num_tags: data.count("num_tags", i64::from(num_tags), 0, MAX_COUNT)?,
            num_meshes: data.count("num_meshes", i64::from(num_meshes), 0, MAX_COUNT)?,
            lump_frameinfo: data.offset("lump_frameinfo", i64::from(lump_frameinfo))?,
            lump_tags: data.offset("lump_tags", i64::from(lump_tags))?,
            lump_meshes: data.offset("lump_meshes", i64::from(lump_meshes))?,
        })
    }
}

/// Mesh block header, lumps resolved to absolute offsets
#[derive(Debug, Clone)]
struct MeshHeader {
    name: String,
    num_shaders: usize,
    num_vertices: usize,
    num_triangles: usize,
    elements: usize,
    shaders: usize,
    texcoords: usize,
    frame_vertices: usize,
    end: usize,
}

impl MeshHeader {
    fn parse(data: &ModelData<'_>, start: usize, num_frames: usize) -> Result<Self> {
        let mut r = data.region("mesh header", start, MESH_HEADER_SIZE)?;
        let mut ident = [0u8; 4];
        r.read_exact(&mut ident)?;
        if ident != IDENT {
            return Err(data.validation("invalid mesh identifier (not IDP3)"));
        }
        let name = r.read_name(NAME_SIZE)?;
        let _flags = r.read_i32::<LittleEndian>()?;
        let mut fields = [0i32; 9];
        r.read_i32_into::<LittleEndian>(&mut fields)?;
        let [frames, num_shaders, num_vertices, num_triangles, elements, shaders, texcoords, frame_vertices, end] =
            fields;

        if usize::try_from(frames).ok() != Some(num_frames) {
            return Err(data.validation(format!(
                "mesh {name} has {frames} frames, header has {num_frames}"
            )));
        }
        let lump = |what: &'static str, ofs: i32| -> Result<usize> {
            let ofs = data.offset(what, i64::from(ofs))?;
            start.checked_add(ofs).ok_or(AliasError::OutOfBounds {
                model: data.name().to_string(),
                what,
                offset: ofs,
                size: 0,
                len: data.len(),
            })
        };
        let end = data.offset("mesh lump_end", i64::from(end))?;
        if end < MESH_HEADER_SIZE {
            return Err(data.validation(format!("mesh {name} ends inside its own header")));
        }

        Ok(Self {
            num_shaders: data.count("mesh num_shaders", i64::from(num_shaders), 0, MAX_COUNT)?,
            num_vertices: data.count("mesh num_vertices", i64::from(num_vertices), 0, MAX_COUNT + 1)?,
            num_triangles: data.count("mesh num_triangles", i64::from(num_triangles), 0, MAX_COUNT)?,
            elements: lump("mesh lump_elements", elements)?,
            shaders: lump("mesh lump_shaders", shaders)?,
            texcoords: lump("mesh lump_texcoords", texcoords)?,
            frame_vertices: lump("mesh lump_framevertices", frame_vertices)?,
            end,
            name,
        })
    }

    /// Name of the first shader, or empty when the mesh lists none
    fn default_shader(&self, data: &ModelData<'_>) -> Result<String> {
        if self.num_shaders == 0 {
            return Ok(String::new());
        }
        let record = data.region("mesh shader", self.shaders, SHADER_SIZE)?;
        Ok(c_string(&record[..NAME_SIZE]))
    }
}

fn read_tags(data: &ModelData<'_>, header: &Md3Header) -> Result<Vec<AliasTag>> {
    let count = header.num_frames * header.num_tags;
    let table = data.table("tags", header.lump_tags, count, TAG_SIZE)?;
    let mut tags = Vec::with_capacity(count);
    for mut record in table.chunks_exact(TAG_SIZE) {
        let name = record.read_name(NAME_SIZE)?;
        let origin: [f32; 3] = record.read_f32_array()?;
        let rotation: [f32; 9] = record.read_f32_array()?;
        let mut matrix_gl = [0.0; 12];
        matrix_gl[..9].copy_from_slice(&rotation);
        matrix_gl[9..].copy_from_slice(&origin);
        tags.push(AliasTag { name, matrix_gl });
    }
    Ok(tags)
}

fn read_frame_scenes(data: &ModelData<'_>, header: &Md3Header) -> Result<Vec<AnimScene>> {
    let table = data.table("frameinfo", header.lump_frameinfo, header.num_frames, FRAMEINFO_SIZE)?;
    Ok(table
        .chunks_exact(FRAMEINFO_SIZE)
        .enumerate()
        .map(|(i, record)| AnimScene::new(c_string(&record[40..]), i, 1, 10.0))
        .collect())
}

/// Load an MD3 file
pub fn load(name: &str, bytes: &[u8], ctx: &mut LoadContext<'_>) -> Result<AliasModel> {
    let data = ModelData::new(name, bytes);
    super::check_ident(&data, &IDENT)?;
    let header = Md3Header::parse(&data)?;

    let mut model = AliasModel::empty(name, ModelFormat::Md3, ctx.config.clone());
    model.animator = Animator::Md3Morph;
    model.effects = effects_from_flags(header.flags);

    let skin_files = ctx.materials.load_skin_files(name);
    let num_skins = skin_files.len().max(1);
    for i in 0..num_skins {
        model.skin_scenes.push(AnimScene::new(format!("skin {i}"), i, 1, 10.0));
    }

    model.frame_scenes = read_frame_scenes(&data, &header)?;
    model.num_tags = header.num_tags;
    model.tags = read_tags(&data, &header)?;

    // Walk the mesh chain once to size the shared arrays
    let mut meshes = Vec::with_capacity(header.num_meshes);
    let mut start = header.lump_meshes;
    for _ in 0..header.num_meshes {
        let mesh = MeshHeader::parse(&data, start, header.num_frames)?;
        start = start.checked_add(mesh.end).ok_or_else(|| data.validation("mesh chain overflows"))?;
        meshes.push(mesh);
    }
    let total_vertices: usize = meshes.iter().map(|m| m.num_vertices).sum();
    let total_triangles: usize = meshes.iter().map(|m| m.num_triangles).sum();
    log::debug!(
        "{name}: {} frames, {} tags, {} meshes, {total_vertices} vertices, {total_triangles} triangles",
        header.num_frames,
        header.num_tags,
        header.num_meshes
    );

    let mesh_data = &mut model.mesh;
    mesh_data.triangles = Vec::with_capacity(total_triangles);
    mesh_data.texcoords = Vec::with_capacity(total_vertices);
    mesh_data.morph_md3_vertices = vec![Md3Vertex::default(); total_vertices * header.num_frames];
    mesh_data.num_morph_frames = header.num_frames;

    let mut skins_per_surface: Vec<Vec<Material>> = Vec::with_capacity(meshes.len());
    let mut first_vertex = 0;
    for (i, mesh) in meshes.iter().enumerate() {
        let first_triangle = mesh_data.triangles.len();

        let elements = data.table("mesh elements", mesh.elements, mesh.num_triangles, ELEMENT_SIZE)?;
        for mut record in elements.chunks_exact(ELEMENT_SIZE) {
            let mut triangle = [0u32; 3];
            for out in &mut triangle {
                let e = record.read_i32::<LittleEndian>()?;
                match usize::try_from(e) {
                    Ok(e) if e < mesh.num_vertices => *out = (first_vertex + e) as u32,
                    _ => {
                        return Err(data.invalid_reference(
                            "mesh element",
                            i64::from(e),
                            mesh.num_vertices as i64,
                        ));
                    }
                }
            }
            mesh_data.triangles.push(triangle);
        }

        let texcoords = data.table("mesh texcoords", mesh.texcoords, mesh.num_vertices, TEXCOORD_SIZE)?;
        for mut record in texcoords.chunks_exact(TEXCOORD_SIZE) {
            let [s, t] = record.read_f32_array()?;
            mesh_data.texcoords.push(Vec2::new(s, t));
        }

        let frame_vertices = data.table(
            "mesh frame vertices",
            mesh.frame_vertices,
            mesh.num_vertices * header.num_frames,
            VERTEX_SIZE,
        )?;
        for (k, mut record) in frame_vertices.chunks_exact(VERTEX_SIZE).enumerate() {
            let frame = k / mesh.num_vertices;
            let vertex = k % mesh.num_vertices;
            let mut origin = [0i16; 3];
            record.read_i16_into::<LittleEndian>(&mut origin)?;
            mesh_data.morph_md3_vertices[frame * total_vertices + first_vertex + vertex] = Md3Vertex {
                origin,
                pitch: record.read_u8()?,
                yaw: record.read_u8()?,
            };
        }

        let shader = mesh.default_shader(&data)?;
        skins_per_surface.push(materials_for_mesh(ctx.materials, name, &skin_files, &mesh.name, &shader));

        model.surfaces.push(Surface {
            name: mesh.name.clone(),
            first_triangle,
            num_triangles: mesh.num_triangles,
            first_vertex,
            num_vertices: mesh.num_vertices,
            texture_index: i,
        });
        first_vertex += mesh.num_vertices;
    }
    mesh_data.vertices = vec![Vec3::ZERO; total_vertices];
    model.num_poses = header.num_frames;

    // Skin-major: every skin holds one material per surface
    for skin in 0..num_skins {
        for materials in &skins_per_surface {
            let material = materials
                .get(skin)
                .or_else(|| materials.first())
                .cloned()
                .unwrap_or_else(|| ctx.materials.missing(name));
            model.textures.push(material);
        }
    }

    compile_frames(&mut model);
    apply_sampled_bounds(&mut model);
    finish_geometry(&mut model);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::NullMaterialLibrary;

    fn header_bytes(version: i32, num_frames: i32) -> Vec<u8> {
        let mut b = IDENT.to_vec();
        b.extend_from_slice(&version.to_le_bytes());
        b.extend_from_slice(&[0u8; NAME_SIZE]);
        for v in [0, num_frames, 0, 0, 0, 108, 108, 108, 108] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        b
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut library = NullMaterialLibrary;
        let mut ctx = LoadContext::new(&mut library);
        let err = load("old.md3", &header_bytes(14, 1), &mut ctx).unwrap_err();
        assert!(matches!(err, AliasError::UnsupportedVersion { version: 14, .. }));
    }

    #[test]
    fn test_zero_frames_is_invalid() {
        let mut library = NullMaterialLibrary;
        let mut ctx = LoadContext::new(&mut library);
        let err = load("empty.md3", &header_bytes(VERSION, 0), &mut ctx).unwrap_err();
        assert!(matches!(err, AliasError::InvalidCount { field: "num_frames", .. }));
    }

    #[test]
    fn test_tag_matrix_puts_origin_last() {
        let mut b = header_bytes(VERSION, 1);
        // one tag, one frame: num_tags lives right after num_frames
        b[4 + 4 + NAME_SIZE + 8..4 + 4 + NAME_SIZE + 12].copy_from_slice(&1i32.to_le_bytes());
        let mut name = [0u8; NAME_SIZE];
        name[..10].copy_from_slice(b"tag_weapon");
        b.extend_from_slice(&name);
        for v in [1.0f32, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        let data = ModelData::new("tag.md3", &b);
        let header = Md3Header::parse(&data).unwrap();
        let tags = read_tags(&data, &header).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "tag_weapon");
        assert_eq!(&tags[0].matrix_gl[9..], &[1.0, 2.0, 3.0]);
        assert_eq!(tags[0].matrix_gl[0], 1.0);
    }
}
