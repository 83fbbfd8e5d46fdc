//! Inter-Quake Model (versions 1 and 2)
//!
//! Geometry is stored once in the bind pose together with up to four bone
//! influences per vertex. Animation is a joint hierarchy sampled per frame
//! through quantized channels: every pose record declares which of its
//! channels vary, and only those consume a 16-bit sample from the frame data.

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3, Vec4};

use crate::blend_weights::{BlendTable, BlendWeights};
use crate::bounds::{classify_animated, sample_bounds};
use crate::error::{AliasError, Result};
use crate::formats::finish_geometry;
use crate::loader::LoadContext;
use crate::material::{Material, materials_for_mesh};
use crate::matrix::Matrix3x4;
use crate::model::{AliasModel, AnimScene, Animator, Bone, ModelBounds, ModelFormat, Surface};
use crate::pose::{BonePose7s, canonical_quat, reconstruct_w};
use crate::reader::{ModelData, ReadAliasExt, c_string};
use crate::tangents::{build_normals, build_texture_vectors};

/// File identifier, including the terminating NUL
pub const MAGIC: &[u8; 16] = b"INTERQUAKEMODEL\0";

const HEADER_SIZE: usize = 124;
const MESH_SIZE: usize = 24;
const VERTEX_ARRAY_SIZE: usize = 20;
const TRIANGLE_SIZE: usize = 12;
const ANIM_SIZE: usize = 20;
const BOUNDS_SIZE: usize = 32;

const IQM_POSITION: u32 = 0;
const IQM_TEXCOORD: u32 = 1;
const IQM_NORMAL: u32 = 2;
const IQM_TANGENT: u32 = 3;
const IQM_BLENDINDEXES: u32 = 4;
const IQM_BLENDWEIGHTS: u32 = 5;
const IQM_COLOR: u32 = 6;

const IQM_UBYTE: u32 = 1;
const IQM_FLOAT: u32 = 7;

const IQM_LOOP: u32 = 1;

/// Largest stored translation magnitude
const POSE_RANGE: f32 = 32767.0;

/// Joint and pose record layouts differ between the two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IqmVersion {
    /// Rotation stored as xyz, w rebuilt
    V1,
    /// Full quaternion rotation
    V2,
}

impl IqmVersion {
    fn joint_size(self) -> usize {
        match self {
            Self::V1 => 44,
            Self::V2 => 48,
        }
    }

    fn pose_size(self) -> usize {
        match self {
            Self::V1 => 80,
            Self::V2 => 88,
        }
    }

    /// Channels per pose: translation, rotation, scale
    fn num_channels(self) -> usize {
        match self {
            Self::V1 => 9,
            Self::V2 => 10,
        }
    }
}

#[derive(Debug, Clone)]
struct IqmHeader {
    version: IqmVersion,
    num_text: usize,
    ofs_text: usize,
    num_meshes: usize,
    ofs_meshes: usize,
    num_vertexarrays: usize,
    num_vertexes: usize,
    ofs_vertexarrays: usize,
    num_triangles: usize,
    ofs_triangles: usize,
    num_joints: usize,
    ofs_joints: usize,
    num_poses: usize,
    ofs_poses: usize,
    num_anims: usize,
    ofs_anims: usize,
    num_frames: usize,
    num_framechannels: usize,
    ofs_frames: usize,
    ofs_bounds: usize,
}

impl IqmHeader {
    fn parse(data: &ModelData<'_>) -> Result<Self> {
        let mut r = &data.region("header", 0, HEADER_SIZE)?[MAGIC.len()..];
        let mut fields = [0u32; 27];
        r.read_u32_into::<LittleEndian>(&mut fields)?;
        let [
            version,
            _filesize,
            _flags,
            num_text,
            ofs_text,
            num_meshes,
            ofs_meshes,
            num_vertexarrays,
            num_vertexes,
            ofs_vertexarrays,
            num_triangles,
            ofs_triangles,
            ofs_neighbors,
            num_joints,
            ofs_joints,
            num_poses,
            ofs_poses,
            num_anims,
            ofs_anims,
            num_frames,
            num_framechannels,
            ofs_frames,
            ofs_bounds,
            num_comment,
            ofs_comment,
            _num_extensions,
            _ofs_extensions,
        ] = fields.map(|v| v as usize);

        let version = match version {
            1 => IqmVersion::V1,
            2 => IqmVersion::V2,
            other => {
                return Err(AliasError::UnsupportedVersion {
                    model: data.name().to_string(),
                    version: other as i64,
                    expected: "1 or 2".to_string(),
                });
            }
        };

        // Every lump must lie inside the file before anything is read
        data.table("joints", ofs_joints, num_joints, version.joint_size())?;
        data.table("poses", ofs_poses, num_poses, version.pose_size())?;
        data.region("text", ofs_text, num_text)?;
        data.table("meshes", ofs_meshes, num_meshes, MESH_SIZE)?;
        data.table("vertex arrays", ofs_vertexarrays, num_vertexarrays, VERTEX_ARRAY_SIZE)?;
        data.table("triangles", ofs_triangles, num_triangles, TRIANGLE_SIZE)?;
        if ofs_neighbors != 0 {
            data.table("neighbors", ofs_neighbors, num_triangles, TRIANGLE_SIZE)?;
        }
        data.table("anims", ofs_anims, num_anims, ANIM_SIZE)?;
        let samples = num_frames.checked_mul(num_framechannels).ok_or(AliasError::OutOfBounds {
            model: data.name().to_string(),
            what: "frames",
            offset: ofs_frames,
            size: usize::MAX,
            len: data.len(),
        })?;
        data.table("frames", ofs_frames, samples, 2)?;
        if ofs_bounds != 0 {
            data.table("bounds", ofs_bounds, num_frames, BOUNDS_SIZE)?;
        }
        data.region("comment", ofs_comment, num_comment)?;

        Ok(Self {
            version,
            num_text,
            ofs_text,
            num_meshes,
            ofs_meshes,
            num_vertexarrays,
            num_vertexes,
            ofs_vertexarrays,
            num_triangles,
            ofs_triangles,
            num_joints,
            ofs_joints,
            num_poses,
            ofs_poses,
            num_anims,
            ofs_anims,
            num_frames,
            num_framechannels,
            ofs_frames,
            ofs_bounds,
        })
    }
}

/// Vertex attribute streams found in the file
#[derive(Debug, Default)]
struct VertexArrays<'a> {
    position: Option<&'a [u8]>,
    texcoord: Option<&'a [u8]>,
    normal: Option<&'a [u8]>,
    tangent: Option<&'a [u8]>,
    blend_indexes: Option<&'a [u8]>,
    blend_weights: Option<&'a [u8]>,
    color_float: Option<&'a [u8]>,
    color_ubyte: Option<&'a [u8]>,
}

impl<'a> VertexArrays<'a> {
    /// Pick up every array with a supported type and shape
    ///
    /// Arrays in other formats, or whose data lies outside the file, are
    /// ignored.
    fn read(data: &ModelData<'a>, header: &IqmHeader) -> Result<Self> {
        let table = data.table(
            "vertex arrays",
            header.ofs_vertexarrays,
            header.num_vertexarrays,
            VERTEX_ARRAY_SIZE,
        )?;
        let mut arrays = Self::default();
        for mut record in table.chunks_exact(VERTEX_ARRAY_SIZE) {
            let kind = record.read_u32::<LittleEndian>()?;
            let _flags = record.read_u32::<LittleEndian>()?;
            let format = record.read_u32::<LittleEndian>()?;
            let size = record.read_u32::<LittleEndian>()? as usize;
            let offset = record.read_u32::<LittleEndian>()? as usize;

            let component = match format {
                IQM_FLOAT => 4,
                IQM_UBYTE => 1,
                _ => continue,
            };
            let Ok(bytes) = data.table("vertex array", offset, header.num_vertexes, size * component) else {
                log::debug!("{}: skipping vertex array {kind} outside the file", data.name());
                continue;
            };
            let slot = match (kind, format, size) {
                (IQM_POSITION, IQM_FLOAT, 3) => &mut arrays.position,
                (IQM_TEXCOORD, IQM_FLOAT, 2) => &mut arrays.texcoord,
                (IQM_NORMAL, IQM_FLOAT, 3) => &mut arrays.normal,
                (IQM_TANGENT, IQM_FLOAT, 4) => &mut arrays.tangent,
                (IQM_BLENDINDEXES, IQM_UBYTE, 4) => &mut arrays.blend_indexes,
                (IQM_BLENDWEIGHTS, IQM_UBYTE, 4) => &mut arrays.blend_weights,
                (IQM_COLOR, IQM_FLOAT, 4) => &mut arrays.color_float,
                (IQM_COLOR, IQM_UBYTE, 4) => &mut arrays.color_ubyte,
                _ => continue,
            };
            *slot = Some(bytes);
        }
        Ok(arrays)
    }

    fn has_blends(&self) -> bool {
        self.blend_indexes.is_some() && self.blend_weights.is_some()
    }
}

fn read_floats<const N: usize>(bytes: &[u8]) -> Result<Vec<[f32; N]>> {
    bytes
        .chunks_exact(N * 4)
        .map(|mut chunk| chunk.read_f32_array::<N>().map_err(AliasError::from))
        .collect()
}

/// NUL-terminated string at `offset` in the text lump
fn text_at(text: &[u8], offset: u32) -> String {
    text.get(offset as usize..).map(c_string).unwrap_or_default()
}

/// A joint in bind pose, rotation in the stored convention
#[derive(Debug, Clone)]
struct Joint {
    name: u32,
    parent: i32,
    origin: Vec3,
    rotation: [f32; 4],
}

fn read_joints(data: &ModelData<'_>, header: &IqmHeader) -> Result<Vec<Joint>> {
    let size = header.version.joint_size();
    let table = data.table("joints", header.ofs_joints, header.num_joints, size)?;
    let mut joints = Vec::with_capacity(header.num_joints);
    for (i, mut record) in table.chunks_exact(size).enumerate() {
        let name = record.read_u32::<LittleEndian>()?;
        let parent = record.read_i32::<LittleEndian>()?;
        if i64::from(parent) >= i as i64 {
            return Err(data.invalid_reference("bone parent", i64::from(parent), i as i64));
        }
        let origin = record.read_vec3()?;
        let rotation = match header.version {
            IqmVersion::V1 => {
                let [x, y, z] = record.read_f32_array::<3>()?;
                [x, y, z, reconstruct_w(x, y, z)]
            }
            IqmVersion::V2 => canonical_quat(record.read_f32_array::<4>()?),
        };
        joints.push(Joint {
            name,
            parent,
            origin,
            rotation,
        });
    }
    Ok(joints)
}

/// Bones with their inverse bind matrices, parents resolved first
fn build_bones(joints: &[Joint], text: &[u8]) -> Vec<Bone> {
    let mut bones: Vec<Bone> = Vec::with_capacity(joints.len());
    for joint in joints {
        let relative = Matrix3x4::from_quat_translation(joint.rotation, joint.origin);
        let relative_inverse = relative.invert_simple();
        let base_pose_inverse = match usize::try_from(joint.parent).ok().and_then(|p| bones.get(p)) {
            Some(parent) => relative_inverse.concat(&parent.base_pose_inverse),
            None => relative_inverse,
        };
        bones.push(Bone {
            name: text_at(text, joint.name),
            parent: joint.parent,
            base_pose_inverse,
        });
    }
    bones
}

/// Channel layout of one pose record
#[derive(Debug, Clone)]
struct PoseChannels {
    mask: u32,
    offset: [f32; 10],
    scale: [f32; 10],
}

fn read_pose_channels(data: &ModelData<'_>, header: &IqmHeader) -> Result<Vec<PoseChannels>> {
    let size = header.version.pose_size();
    let channels = header.version.num_channels();
    let table = data.table("poses", header.ofs_poses, header.num_poses, size)?;
    let mut poses = Vec::with_capacity(header.num_poses);
    for mut record in table.chunks_exact(size) {
        let _parent = record.read_i32::<LittleEndian>()?;
        let mask = record.read_u32::<LittleEndian>()?;
        let mut offset = [0.0; 10];
        let mut scale = [0.0; 10];
        record.read_f32_into::<LittleEndian>(&mut offset[..channels])?;
        record.read_f32_into::<LittleEndian>(&mut scale[..channels])?;
        poses.push(PoseChannels { mask, offset, scale });
    }
    Ok(poses)
}

/// Largest translation any frame can express, in model units
fn biggest_origin(poses: &[PoseChannels], joints: &[Joint], has_frames: bool) -> f32 {
    let mut biggest = 0.0f32;
    for pose in poses {
        for c in 0..3 {
            biggest = biggest
                .max(pose.offset[c].abs())
                .max((pose.offset[c] + 65535.0 * pose.scale[c]).abs());
        }
    }
    if !has_frames {
        for joint in joints {
            biggest = biggest.max(joint.origin.abs().max_element());
        }
    }
    biggest
}

/// Sequential reader over the 16-bit frame samples
struct FrameSamples<'a> {
    bytes: &'a [u8],
}

impl FrameSamples<'_> {
    fn next(&mut self, data: &ModelData<'_>) -> Result<f32> {
        self.bytes
            .read_u16::<LittleEndian>()
            .map(f32::from)
            .map_err(|_| data.validation("frame data ends before every pose channel is read"))
    }
}

/// Decode every frame into quantized bone poses, frame-major
fn decode_frames(
    data: &ModelData<'_>,
    header: &IqmHeader,
    channels: &[PoseChannels],
    inv_pose_scale: f32,
) -> Result<Vec<BonePose7s>> {
    let samples = header.num_frames * header.num_framechannels;
    let mut reader = FrameSamples {
        bytes: data.table("frames", header.ofs_frames, samples, 2)?,
    };
    let (rotation_channels, scale_bits) = match header.version {
        IqmVersion::V1 => (3, 6..9),
        IqmVersion::V2 => (4, 7..10),
    };

    let mut poses = Vec::with_capacity(header.num_frames * channels.len());
    for _ in 0..header.num_frames {
        for pose in channels {
            let mut channel = |c: usize| -> Result<f32> {
                let mut value = pose.offset[c];
                if pose.mask & (1 << c) != 0 {
                    value += reader.next(data)? * pose.scale[c];
                }
                Ok(value)
            };
            let translation = Vec3::new(channel(0)?, channel(1)?, channel(2)?);
            let mut q = [0.0f32; 4];
            for (i, out) in q.iter_mut().take(rotation_channels).enumerate() {
                *out = channel(3 + i)?;
            }
            let rotation = match header.version {
                IqmVersion::V1 => [q[0], q[1], q[2], reconstruct_w(q[0], q[1], q[2])],
                IqmVersion::V2 => canonical_quat(q),
            };
            // Scale channels are consumed but not applied
            for bit in scale_bits.clone() {
                if pose.mask & (1 << bit) != 0 {
                    reader.next(data)?;
                }
            }
            poses.push(BonePose7s::quantize(translation, rotation, inv_pose_scale));
        }
    }
    Ok(poses)
}

fn read_scenes(data: &ModelData<'_>, header: &IqmHeader, text: &[u8], num_poses: usize) -> Result<Vec<AnimScene>> {
    if header.num_anims == 0 {
        return Ok(vec![AnimScene::new("static", 0, 1, 10.0)]);
    }
    let table = data.table("anims", header.ofs_anims, header.num_anims, ANIM_SIZE)?;
    let mut scenes = Vec::with_capacity(header.num_anims);
    for mut record in table.chunks_exact(ANIM_SIZE) {
        let name = text_at(text, record.read_u32::<LittleEndian>()?);
        let first_frame = record.read_u32::<LittleEndian>()? as usize;
        let frame_count = record.read_u32::<LittleEndian>()? as usize;
        let frame_rate = record.read_f32::<LittleEndian>()?;
        let flags = record.read_u32::<LittleEndian>()?;

        let mut scene = AnimScene::new(name, first_frame, frame_count, frame_rate);
        scene.looping = flags & IQM_LOOP != 0;
        if first_frame.saturating_add(frame_count) > num_poses {
            log::warn!(
                "{}: anim {} covers frames {first_frame}+{frame_count} of {num_poses}, clamping",
                data.name(),
                scene.name
            );
            scene.first_frame = first_frame.min(num_poses - 1);
            scene.frame_count = frame_count.min(num_poses - scene.first_frame).max(1);
        }
        scenes.push(scene);
    }
    Ok(scenes)
}

fn read_bounds(data: &ModelData<'_>, header: &IqmHeader) -> Result<ModelBounds> {
    let table = data.table("bounds", header.ofs_bounds, header.num_frames, BOUNDS_SIZE)?;
    let mut mins = Vec3::ZERO;
    let mut maxs = Vec3::ZERO;
    let mut xy_radius = 0.0f32;
    let mut radius = 0.0f32;
    for (i, mut record) in table.chunks_exact(BOUNDS_SIZE).enumerate() {
        let frame_mins = record.read_vec3()?;
        let frame_maxs = record.read_vec3()?;
        if i == 0 {
            mins = frame_mins;
            maxs = frame_maxs;
        } else {
            mins = mins.min(frame_mins);
            maxs = maxs.max(frame_maxs);
        }
        xy_radius = xy_radius.max(record.read_f32::<LittleEndian>()?);
        radius = radius.max(record.read_f32::<LittleEndian>()?);
    }
    Ok(ModelBounds::from_extents(mins, maxs, xy_radius, radius))
}

fn read_triangles(data: &ModelData<'_>, header: &IqmHeader) -> Result<Vec<[u32; 3]>> {
    let table = data.table("triangles", header.ofs_triangles, header.num_triangles, TRIANGLE_SIZE)?;
    let mut triangles = Vec::with_capacity(header.num_triangles);
    for mut record in table.chunks_exact(TRIANGLE_SIZE) {
        let mut triangle = [0u32; 3];
        record.read_u32_into::<LittleEndian>(&mut triangle)?;
        if let Some(&bad) = triangle.iter().find(|&&e| e as usize >= header.num_vertexes) {
            return Err(data.invalid_reference("element", i64::from(bad), header.num_vertexes as i64));
        }
        triangles.push(triangle);
    }
    Ok(triangles)
}

/// Load an IQM file
pub fn load(name: &str, bytes: &[u8], ctx: &mut LoadContext<'_>) -> Result<AliasModel> {
    let data = ModelData::new(name, bytes);
    super::check_ident(&data, MAGIC)?;
    let header = IqmHeader::parse(&data)?;
    log::debug!(
        "{name}: IQM {:?}, {} meshes, {} vertexes, {} triangles, {} joints, {} frames, {} anims",
        header.version,
        header.num_meshes,
        header.num_vertexes,
        header.num_triangles,
        header.num_joints,
        header.num_frames,
        header.num_anims
    );

    let arrays = VertexArrays::read(&data, &header)?;
    if header.num_vertexes > 0 {
        if arrays.position.is_none() || arrays.texcoord.is_none() {
            return Err(AliasError::MissingData {
                model: name.to_string(),
                what: "position or texcoord vertex arrays",
            });
        }
        if (header.num_frames > 0 || header.num_anims > 0) && !arrays.has_blends() {
            return Err(AliasError::MissingData {
                model: name.to_string(),
                what: "blend vertex arrays",
            });
        }
    }
    if header.num_frames > 0 && header.num_poses != header.num_joints {
        return Err(data.validation(format!(
            "{} poses per frame for {} joints",
            header.num_poses, header.num_joints
        )));
    }

    let text = if header.num_text > 0 && header.ofs_text != 0 {
        data.region("text", header.ofs_text, header.num_text)?
    } else {
        &[]
    };

    let mut model = AliasModel::empty(name, ModelFormat::Iqm, ctx.config.clone());
    model.num_poses = header.num_frames.max(1);

    // Skeleton
    let joints = read_joints(&data, &header)?;
    model.bones = build_bones(&joints, text);
    model.animator = if model.bones.is_empty() {
        Animator::Static
    } else {
        Animator::Skeletal
    };

    model.frame_scenes = read_scenes(&data, &header, text, model.num_poses)?;
    let structural = model.bones.len() > 1
        || model.frame_scenes.len() > 1
        || model.frame_scenes.first().is_some_and(|scene| scene.frame_count > 1);
    model.is_animated = classify_animated(&model, structural);

    // Poses
    let channels = read_pose_channels(&data, &header)?;
    let biggest = biggest_origin(&channels, &joints, header.num_frames > 0);
    model.pose_scale = biggest / POSE_RANGE;
    let inv_pose_scale = if model.pose_scale > 0.0 {
        1.0 / model.pose_scale
    } else {
        0.0
    };
    model.poses = if header.num_frames > 0 {
        decode_frames(&data, &header, &channels, inv_pose_scale)?
    } else {
        joints
            .iter()
            .map(|joint| BonePose7s::quantize(joint.origin, joint.rotation, inv_pose_scale))
            .collect()
    };

    // Geometry
    let n = header.num_vertexes;
    let mesh = &mut model.mesh;
    mesh.triangles = read_triangles(&data, &header)?;
    mesh.vertices = match arrays.position {
        Some(bytes) => read_floats::<3>(bytes)?.into_iter().map(Vec3::from).collect(),
        None => Vec::new(),
    };
    mesh.texcoords = match arrays.texcoord {
        Some(bytes) => read_floats::<2>(bytes)?.into_iter().map(Vec2::from).collect(),
        None => Vec::new(),
    };
    mesh.normals = vec![Vec3::ZERO; n];
    mesh.svectors = vec![Vec3::ZERO; n];
    mesh.tvectors = vec![Vec3::ZERO; n];
    if let Some(bytes) = arrays.normal {
        mesh.normals = read_floats::<3>(bytes)?.into_iter().map(Vec3::from).collect();
    }
    if let (Some(_), Some(bytes)) = (arrays.normal, arrays.tangent) {
        for (i, [x, y, z, w]) in read_floats::<4>(bytes)?.into_iter().enumerate() {
            let s = Vec3::new(x, y, z);
            let normal = mesh.normals[i];
            mesh.svectors[i] = s;
            mesh.tvectors[i] = if w < 0.0 { s.cross(normal) } else { normal.cross(s) };
        }
    }

    if let (Some(indexes), Some(weights)) = (arrays.blend_indexes, arrays.blend_weights) {
        let mut table = BlendTable::new(header.num_joints);
        mesh.blend_indices = Vec::with_capacity(n);
        mesh.skeletal_indices = Vec::with_capacity(n);
        mesh.skeletal_weights = Vec::with_capacity(n);
        for (index, influence) in indexes.chunks_exact(4).zip(weights.chunks_exact(4)) {
            let weights = BlendWeights {
                index: [index[0], index[1], index[2], index[3]],
                influence: [influence[0], influence[1], influence[2], influence[3]],
            };
            for (&bone, &amount) in weights.index.iter().zip(&weights.influence) {
                if amount > 0 && usize::from(bone) >= header.num_joints {
                    return Err(data.invalid_reference(
                        "blend index",
                        i64::from(bone),
                        header.num_joints as i64,
                    ));
                }
            }
            // File bytes need not sum to 255; requantize before sharing
            let amounts = weights.influence.map(f32::from);
            mesh.blend_indices.push(table.compress(weights.index, amounts) as u32);
            mesh.skeletal_indices.push(weights.index);
            mesh.skeletal_weights.push(weights.influence);
        }
        mesh.blends = table.into_entries();
    }

    if let Some(bytes) = arrays.color_float {
        mesh.colors = Some(read_floats::<4>(bytes)?.into_iter().map(Vec4::from).collect());
    } else if let Some(bytes) = arrays.color_ubyte {
        mesh.colors = Some(
            bytes
                .chunks_exact(4)
                .map(|c| Vec4::new(c[0].into(), c[1].into(), c[2].into(), c[3].into()) * (1.0 / 255.0))
                .collect(),
        );
    }

    // Surfaces and skins
    let skin_files = ctx.materials.load_skin_files(name);
    let num_skins = skin_files.len().max(1);
    for i in 0..num_skins {
        model.skin_scenes.push(AnimScene::new(format!("skin {i}"), i, 1, 10.0));
    }
    let meshes = data.table("meshes", header.ofs_meshes, header.num_meshes, MESH_SIZE)?;
    let mut skins_per_surface: Vec<Vec<Material>> = Vec::with_capacity(header.num_meshes);
    for (i, mut record) in meshes.chunks_exact(MESH_SIZE).enumerate() {
        let mut fields = [0u32; 6];
        record.read_u32_into::<LittleEndian>(&mut fields)?;
        let [mesh_name, material, first_vertex, num_vertexes, first_triangle, num_triangles] = fields;
        let [first_vertex, num_vertexes, first_triangle, num_triangles] =
            [first_vertex, num_vertexes, first_triangle, num_triangles].map(|v| v as usize);
        let mesh_name = text_at(text, mesh_name);
        if first_vertex + num_vertexes > n || first_triangle + num_triangles > header.num_triangles {
            return Err(data.validation(format!("mesh {mesh_name} ranges exceed the vertex or triangle count")));
        }
        let shader = text_at(text, material);
        skins_per_surface.push(materials_for_mesh(ctx.materials, name, &skin_files, &mesh_name, &shader));
        model.surfaces.push(Surface {
            name: mesh_name,
            first_triangle,
            num_triangles,
            first_vertex,
            num_vertices: num_vertexes,
            texture_index: i,
        });
    }
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

    // Derived vectors
    let area_weighting = model.config.smooth_normals_area_weighting;
    let mesh = &mut model.mesh;
    if arrays.normal.is_none() {
        build_normals(&mesh.vertices, &mesh.triangles, area_weighting, &mut mesh.normals);
    }
    if arrays.normal.is_none() || arrays.tangent.is_none() {
        build_texture_vectors(
            &mesh.vertices,
            &mesh.texcoords,
            &mesh.normals,
            &mesh.triangles,
            area_weighting,
            &mut mesh.svectors,
            &mut mesh.tvectors,
        );
    }

    model.bounds = if header.ofs_bounds != 0 {
        read_bounds(&data, &header)?
    } else {
        sample_bounds(&model).0
    };

    finish_geometry(&mut model);
    Ok(model)
}
