//! Synthetic model files shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;

use alias_model::{AliasConfig, AliasModel, LoadContext, Material, MaterialLibrary, SkinFile};

/// Little-endian byte writer
#[derive(Debug, Default, Clone)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32s(&mut self, values: &[f32]) -> &mut Self {
        for &v in values {
            self.f32(v);
        }
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    /// NUL-padded fixed-size name
    pub fn name(&mut self, name: &str, size: usize) -> &mut Self {
        let mut field = vec![0u8; size];
        field[..name.len()].copy_from_slice(name.as_bytes());
        self.raw(&field)
    }

    pub fn patch_i32(&mut self, at: usize, v: i32) {
        self.0[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.0[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
}

/// Material library with canned answers that records what was asked
#[derive(Debug, Default)]
pub struct TestLibrary {
    pub shaders: HashMap<String, Material>,
    pub external: HashMap<String, Material>,
    pub skin_files: Vec<SkinFile>,
    pub requests: Vec<String>,
}

impl MaterialLibrary for TestLibrary {
    fn load_shader(&mut self, _model: &str, name: &str) -> Option<Material> {
        self.requests.push(format!("shader {name}"));
        self.shaders.get(name).cloned()
    }

    fn load_internal_skin(&mut self, name: &str, pixels: &[u8], width: usize, height: usize) -> Material {
        self.requests.push(format!("internal {name} {width}x{height} {}", pixels.len()));
        Material::wall(name)
    }

    fn load_external_skin(&mut self, name: &str) -> Option<Material> {
        self.requests.push(format!("external {name}"));
        self.external.get(name).cloned()
    }

    fn load_skin_files(&mut self, _model: &str) -> Vec<SkinFile> {
        self.skin_files.clone()
    }
}

/// Load with the default configuration and no assets
pub fn load(name: &str, bytes: &[u8]) -> alias_model::Result<AliasModel> {
    load_with(name, bytes, AliasConfig::default())
}

pub fn load_with(name: &str, bytes: &[u8], config: AliasConfig) -> alias_model::Result<AliasModel> {
    let mut library = alias_model::NullMaterialLibrary;
    let mut ctx = LoadContext::new(&mut library).with_config(config);
    alias_model::load_model(name, bytes, &mut ctx)
}

// ---------------------------------------------------------------------------
// MDL

#[derive(Debug, Clone)]
pub struct MdlBuilder {
    pub scale: [f32; 3],
    pub origin: [f32; 3],
    pub skin_width: i32,
    pub skin_height: i32,
    /// Number of single, blank skins
    pub num_skins: usize,
    /// on_seam, s, t
    pub verts: Vec<(bool, i32, i32)>,
    /// faces_front, vertex indices
    pub tris: Vec<(bool, [i32; 3])>,
    pub frames: Vec<(String, Vec<[u8; 3]>)>,
    pub sync_type: i32,
    pub flags: i32,
}

impl MdlBuilder {
    /// A unit quad split into two front-facing triangles
    pub fn quad() -> Self {
        Self {
            scale: [1.0; 3],
            origin: [0.0; 3],
            skin_width: 8,
            skin_height: 8,
            num_skins: 1,
            verts: vec![(false, 0, 0), (false, 4, 0), (false, 4, 4), (false, 0, 4)],
            tris: vec![(true, [0, 1, 2]), (true, [0, 2, 3])],
            frames: vec![(
                "stand1".into(),
                vec![[0, 0, 0], [10, 0, 0], [10, 10, 0], [0, 10, 0]],
            )],
            sync_type: 0,
            flags: 0,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut b = Bytes::new();
        b.raw(b"IDPO").i32(6);
        b.f32s(&self.scale).f32s(&self.origin).f32(1.0).f32s(&[0.0; 3]);
        b.i32(self.num_skins as i32)
            .i32(self.skin_width)
            .i32(self.skin_height)
            .i32(self.verts.len() as i32)
            .i32(self.tris.len() as i32)
            .i32(self.frames.len() as i32)
            .i32(self.sync_type)
            .i32(self.flags)
            .f32(0.0);
        let image = vec![0u8; (self.skin_width * self.skin_height) as usize];
        for _ in 0..self.num_skins {
            b.i32(0).raw(&image);
        }
        for &(on_seam, s, t) in &self.verts {
            b.i32(i32::from(on_seam)).i32(s).i32(t);
        }
        for &(front, v) in &self.tris {
            b.i32(i32::from(front)).i32(v[0]).i32(v[1]).i32(v[2]);
        }
        for (name, verts) in &self.frames {
            b.i32(0).raw(&[0; 8]).name(name, 16);
            for v in verts {
                b.raw(&[v[0], v[1], v[2], 0]);
            }
        }
        b.0
    }
}

// ---------------------------------------------------------------------------
// MD2

#[derive(Debug, Clone)]
pub struct Md2Frame {
    pub name: String,
    pub scale: [f32; 3],
    pub translate: [f32; 3],
    pub verts: Vec<[u8; 3]>,
}

#[derive(Debug, Clone)]
pub struct Md2Builder {
    pub skin_width: i32,
    pub skin_height: i32,
    pub skins: Vec<String>,
    pub st: Vec<(i16, i16)>,
    pub tris: Vec<([u16; 3], [u16; 3])>,
    pub frames: Vec<Md2Frame>,
}

impl Md2Builder {
    /// Two triangles sharing an edge; both use the same texcoords on it
    pub fn quad() -> Self {
        Self {
            skin_width: 16,
            skin_height: 16,
            skins: vec!["models/test/skin.pcx".into()],
            st: vec![(0, 0), (8, 0), (8, 8), (0, 8)],
            tris: vec![([0, 1, 2], [0, 1, 2]), ([0, 2, 3], [0, 2, 3])],
            frames: vec![Md2Frame {
                name: "idle1".into(),
                scale: [1.0; 3],
                translate: [0.0; 3],
                verts: vec![[0, 0, 0], [10, 0, 0], [10, 10, 0], [0, 10, 0]],
            }],
        }
    }

    pub fn num_xyz(&self) -> usize {
        self.frames.first().map_or(0, |f| f.verts.len())
    }

    pub fn build(&self) -> Vec<u8> {
        let num_xyz = self.num_xyz();
        let frame_size = 40 + num_xyz * 4;
        let ofs_skins = 68;
        let ofs_st = ofs_skins + self.skins.len() * 64;
        let ofs_tris = ofs_st + self.st.len() * 4;
        let ofs_frames = ofs_tris + self.tris.len() * 12;
        let ofs_glcmds = ofs_frames + self.frames.len() * frame_size;
        let ofs_end = ofs_glcmds + 4;

        let mut b = Bytes::new();
        b.raw(b"IDP2").i32(8);
        for v in [
            self.skin_width as usize,
            self.skin_height as usize,
            frame_size,
            self.skins.len(),
            num_xyz,
            self.st.len(),
            self.tris.len(),
            1,
            self.frames.len(),
            ofs_skins,
            ofs_st,
            ofs_tris,
            ofs_frames,
            ofs_glcmds,
            ofs_end,
        ] {
            b.i32(v as i32);
        }
        for skin in &self.skins {
            b.name(skin, 64);
        }
        for &(s, t) in &self.st {
            b.i16(s).i16(t);
        }
        for (xyz, st) in &self.tris {
            for &i in xyz {
                b.u16(i);
            }
            for &i in st {
                b.u16(i);
            }
        }
        for frame in &self.frames {
            b.f32s(&frame.scale).f32s(&frame.translate).name(&frame.name, 16);
            for v in &frame.verts {
                b.raw(&[v[0], v[1], v[2], 0]);
            }
        }
        b.i32(0);
        b.0
    }
}

// ---------------------------------------------------------------------------
// MD3

#[derive(Debug, Clone)]
pub struct Md3Mesh {
    pub name: String,
    pub shader: Option<String>,
    pub triangles: Vec<[i32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    /// Per frame, per vertex: origin in 1/64 units, pitch, yaw
    pub frames: Vec<Vec<([i16; 3], u8, u8)>>,
}

impl Md3Mesh {
    /// A quad of side `size` units in the xy plane, the same in every frame
    /// except that frame `i` is raised by `i` units
    pub fn quad(name: &str, size: f32, num_frames: usize) -> Self {
        let s = (size * 64.0) as i16;
        let frames = (0..num_frames)
            .map(|f| {
                let z = (f as i16) * 64;
                vec![([0, 0, z], 0, 0), ([s, 0, z], 0, 0), ([s, s, z], 0, 0), ([0, s, z], 0, 0)]
            })
            .collect();
        Self {
            name: name.into(),
            shader: Some(format!("textures/{name}.tga")),
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            frames,
        }
    }

    fn build(&self) -> Vec<u8> {
        let num_shaders = usize::from(self.shader.is_some());
        let num_vertices = self.texcoords.len();
        let lump_shaders = 108;
        let lump_elements = lump_shaders + num_shaders * 68;
        let lump_texcoords = lump_elements + self.triangles.len() * 12;
        let lump_framevertices = lump_texcoords + num_vertices * 8;
        let lump_end = lump_framevertices + self.frames.len() * num_vertices * 8;

        let mut b = Bytes::new();
        b.raw(b"IDP3").name(&self.name, 64).i32(0);
        for v in [
            self.frames.len(),
            num_shaders,
            num_vertices,
            self.triangles.len(),
            lump_elements,
            lump_shaders,
            lump_texcoords,
            lump_framevertices,
            lump_end,
        ] {
            b.i32(v as i32);
        }
        if let Some(shader) = &self.shader {
            b.name(shader, 64).i32(0);
        }
        for tri in &self.triangles {
            b.i32(tri[0]).i32(tri[1]).i32(tri[2]);
        }
        for tc in &self.texcoords {
            b.f32s(tc);
        }
        for frame in &self.frames {
            for (origin, pitch, yaw) in frame {
                b.i16(origin[0]).i16(origin[1]).i16(origin[2]).raw(&[*pitch, *yaw]);
            }
        }
        b.0
    }
}

#[derive(Debug, Clone)]
pub struct Md3Tag {
    pub name: String,
    pub origin: [f32; 3],
    pub axes: [f32; 9],
}

impl Md3Tag {
    pub fn at(name: &str, origin: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            origin,
            axes: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Md3Builder {
    pub flags: i32,
    pub frame_names: Vec<String>,
    /// Per frame, the same tag names in the same order
    pub tags: Vec<Vec<Md3Tag>>,
    pub meshes: Vec<Md3Mesh>,
}

impl Md3Builder {
    pub fn new(num_frames: usize) -> Self {
        Self {
            flags: 0,
            frame_names: (0..num_frames).map(|i| format!("frame{i}")).collect(),
            tags: vec![Vec::new(); num_frames],
            meshes: Vec::new(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let num_frames = self.frame_names.len();
        let num_tags = self.tags.first().map_or(0, Vec::len);
        let lump_frameinfo = 108;
        let lump_tags = lump_frameinfo + num_frames * 56;
        let lump_meshes = lump_tags + num_frames * num_tags * 112;
        let meshes: Vec<Vec<u8>> = self.meshes.iter().map(Md3Mesh::build).collect();
        let lump_end = lump_meshes + meshes.iter().map(Vec::len).sum::<usize>();

        let mut b = Bytes::new();
        b.raw(b"IDP3").i32(15).name("test", 64).i32(self.flags);
        for v in [
            num_frames,
            num_tags,
            self.meshes.len(),
            0,
            lump_frameinfo,
            lump_tags,
            lump_meshes,
            lump_end,
        ] {
            b.i32(v as i32);
        }
        for name in &self.frame_names {
            b.f32s(&[0.0; 10]).name(name, 16);
        }
        for frame in &self.tags {
            for tag in frame {
                b.name(&tag.name, 64).f32s(&tag.origin).f32s(&tag.axes);
            }
        }
        for mesh in &meshes {
            b.raw(mesh);
        }
        b.0
    }

    /// Offset of the first mesh block in the built file
    pub fn first_mesh_offset(&self) -> usize {
        let num_frames = self.frame_names.len();
        let num_tags = self.tags.first().map_or(0, Vec::len);
        108 + num_frames * 56 + num_frames * num_tags * 112
    }
}

// ---------------------------------------------------------------------------
// IQM

#[derive(Debug, Clone)]
pub struct IqmJoint {
    pub name: String,
    pub parent: i32,
    pub translate: [f32; 3],
    /// xyzw; version 1 files store only xyz
    pub rotate: [f32; 4],
}

/// Pose samples for a bone at rest, moved `x` units along x
///
/// The rotation samples decode to (0, 0, 0, -1) in both versions; version 1
/// files only read the first three.
pub fn rest_sample(x: f32) -> [u16; 5] {
    [(x * 64.0) as u16, 32768, 32768, 32768, 0]
}

#[derive(Debug, Clone)]
pub struct IqmPose {
    pub parent: i32,
    pub mask: u32,
    pub offset: [f32; 10],
    pub scale: [f32; 10],
}

impl IqmPose {
    /// Pose whose translation x and every rotation channel vary
    pub fn animated(parent: i32, version: u32) -> Self {
        let rotation_mask = if version == 1 { 0b111_000 } else { 0b1111_000 };
        Self {
            parent,
            mask: 0b001 | rotation_mask,
            offset: [0.0, 0.0, 0.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0],
            scale: [1.0 / 64.0, 0.0, 0.0, 2.0 / 65535.0, 2.0 / 65535.0, 2.0 / 65535.0, 2.0 / 65535.0, 0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct IqmMesh {
    pub name: String,
    pub material: String,
    pub first_vertex: u32,
    pub num_vertexes: u32,
    pub first_triangle: u32,
    pub num_triangles: u32,
}

#[derive(Debug, Clone)]
pub struct IqmAnim {
    pub name: String,
    pub first_frame: u32,
    pub num_frames: u32,
    pub framerate: f32,
    pub looping: bool,
}

#[derive(Debug, Clone)]
pub struct IqmBuilder {
    pub version: u32,
    pub positions: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub blend_indexes: Option<Vec<[u8; 4]>>,
    pub blend_weights: Option<Vec<[u8; 4]>>,
    pub colors: Option<Vec<[u8; 4]>>,
    pub triangles: Vec<[u32; 3]>,
    pub meshes: Vec<IqmMesh>,
    pub joints: Vec<IqmJoint>,
    pub poses: Vec<IqmPose>,
    pub anims: Vec<IqmAnim>,
    pub num_frames: u32,
    pub num_framechannels: u32,
    pub frame_data: Vec<u16>,
    /// mins, maxs, xyradius, radius per frame
    pub bounds: Option<Vec<[f32; 8]>>,
}

impl IqmBuilder {
    /// A quad with no skeleton
    pub fn quad(version: u32) -> Self {
        Self {
            version,
            positions: vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0], [0.0, 10.0, 0.0]],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            normals: None,
            blend_indexes: None,
            blend_weights: None,
            colors: None,
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            meshes: vec![IqmMesh {
                name: "body".into(),
                material: "skin.tga".into(),
                first_vertex: 0,
                num_vertexes: 4,
                first_triangle: 0,
                num_triangles: 2,
            }],
            joints: Vec::new(),
            poses: Vec::new(),
            anims: Vec::new(),
            num_frames: 0,
            num_framechannels: 0,
            frame_data: Vec::new(),
            bounds: None,
        }
    }

    /// The quad bound to a root bone and a child bone five units above it
    ///
    /// Vertices 0 and 1 follow the root; 2 and 3 are split evenly. Each frame
    /// holds, per bone, the x translation sample (1/64 units) followed by the
    /// rotation samples; see [`rest_sample`].
    pub fn skinned(version: u32, frames: &[[[u16; 5]; 2]]) -> Self {
        let mut builder = Self::quad(version);
        builder.joints = vec![
            IqmJoint {
                name: "root".into(),
                parent: -1,
                translate: [0.0; 3],
                rotate: [0.0, 0.0, 0.0, -1.0],
            },
            IqmJoint {
                name: "child".into(),
                parent: 0,
                translate: [0.0, 0.0, 5.0],
                rotate: [0.0, 0.0, 0.0, -1.0],
            },
        ];
        builder.blend_indexes = Some(vec![[0, 0, 0, 0], [0, 0, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0]]);
        builder.blend_weights = Some(vec![[255, 0, 0, 0], [255, 0, 0, 0], [128, 127, 0, 0], [128, 127, 0, 0]]);
        if !frames.is_empty() {
            let mut child = IqmPose::animated(0, version);
            child.offset[2] = 5.0;
            builder.poses = vec![IqmPose::animated(-1, version), child];
            let channels = if version == 1 { 4 } else { 5 };
            builder.num_frames = frames.len() as u32;
            builder.num_framechannels = 2 * channels;
            for frame in frames {
                for pose in frame {
                    builder.frame_data.extend_from_slice(&pose[..channels as usize]);
                }
            }
            builder.anims = vec![IqmAnim {
                name: "idle".into(),
                first_frame: 0,
                num_frames: frames.len() as u32,
                framerate: 10.0,
                looping: true,
            }];
        }
        builder
    }

    pub fn build(&self) -> Vec<u8> {
        let mut text = vec![0u8];
        let mut intern = |s: &str| -> u32 {
            let at = text.len() as u32;
            text.extend_from_slice(s.as_bytes());
            text.push(0);
            at
        };
        let mesh_names: Vec<(u32, u32)> = self
            .meshes
            .iter()
            .map(|m| (intern(&m.name), intern(&m.material)))
            .collect();
        let joint_names: Vec<u32> = self.joints.iter().map(|j| intern(&j.name)).collect();
        let anim_names: Vec<u32> = self.anims.iter().map(|a| intern(&a.name)).collect();

        // Vertex arrays: (type, format, size, data)
        let mut arrays: Vec<(u32, u32, u32, Vec<u8>)> = Vec::new();
        let floats = |values: &mut dyn Iterator<Item = f32>| -> Vec<u8> {
            values.flat_map(f32::to_le_bytes).collect()
        };
        if !self.positions.is_empty() {
            arrays.push((0, 7, 3, floats(&mut self.positions.iter().flatten().copied())));
        }
        if !self.texcoords.is_empty() {
            arrays.push((1, 7, 2, floats(&mut self.texcoords.iter().flatten().copied())));
        }
        if let Some(normals) = &self.normals {
            arrays.push((2, 7, 3, floats(&mut normals.iter().flatten().copied())));
        }
        if let Some(indexes) = &self.blend_indexes {
            arrays.push((4, 1, 4, indexes.iter().flatten().copied().collect()));
        }
        if let Some(weights) = &self.blend_weights {
            arrays.push((5, 1, 4, weights.iter().flatten().copied().collect()));
        }
        if let Some(colors) = &self.colors {
            arrays.push((6, 1, 4, colors.iter().flatten().copied().collect()));
        }

        let joint_size = if self.version == 1 { 44 } else { 48 };
        let pose_size = if self.version == 1 { 80 } else { 88 };

        let ofs_text = 124;
        let ofs_meshes = ofs_text + text.len();
        let ofs_vertexarrays = ofs_meshes + self.meshes.len() * 24;
        let mut ofs_data = ofs_vertexarrays + arrays.len() * 20;
        let mut array_offsets = Vec::new();
        for (_, _, _, data) in &arrays {
            array_offsets.push(ofs_data);
            ofs_data += data.len();
        }
        let ofs_triangles = ofs_data;
        let ofs_joints = ofs_triangles + self.triangles.len() * 12;
        let ofs_poses = ofs_joints + self.joints.len() * joint_size;
        let ofs_anims = ofs_poses + self.poses.len() * pose_size;
        let ofs_frames = ofs_anims + self.anims.len() * 20;
        let ofs_bounds_start = ofs_frames + self.frame_data.len() * 2;
        let ofs_bounds = if self.bounds.is_some() { ofs_bounds_start } else { 0 };
        let file_size = ofs_bounds_start + self.bounds.as_ref().map_or(0, |b| b.len() * 32);

        let mut b = Bytes::new();
        b.raw(b"INTERQUAKEMODEL\0");
        for v in [
            self.version as usize,
            file_size,
            0,
            text.len(),
            ofs_text,
            self.meshes.len(),
            ofs_meshes,
            arrays.len(),
            self.positions.len(),
            ofs_vertexarrays,
            self.triangles.len(),
            ofs_triangles,
            0,
            self.joints.len(),
            ofs_joints,
            self.poses.len(),
            ofs_poses,
            self.anims.len(),
            ofs_anims,
            self.num_frames as usize,
            self.num_framechannels as usize,
            ofs_frames,
            ofs_bounds,
            0,
            0,
            0,
            0,
        ] {
            b.u32(v as u32);
        }
        b.raw(&text);
        for (mesh, (name, material)) in self.meshes.iter().zip(&mesh_names) {
            b.u32(*name)
                .u32(*material)
                .u32(mesh.first_vertex)
                .u32(mesh.num_vertexes)
                .u32(mesh.first_triangle)
                .u32(mesh.num_triangles);
        }
        for ((kind, format, size, _), offset) in arrays.iter().zip(&array_offsets) {
            b.u32(*kind).u32(0).u32(*format).u32(*size).u32(*offset as u32);
        }
        for (_, _, _, data) in &arrays {
            b.raw(data);
        }
        for tri in &self.triangles {
            b.u32(tri[0]).u32(tri[1]).u32(tri[2]);
        }
        for (joint, name) in self.joints.iter().zip(&joint_names) {
            b.u32(*name).i32(joint.parent).f32s(&joint.translate);
            if self.version == 1 {
                b.f32s(&joint.rotate[..3]);
            } else {
                b.f32s(&joint.rotate);
            }
            b.f32s(&[1.0; 3]);
        }
        let channels = if self.version == 1 { 9 } else { 10 };
        for pose in &self.poses {
            b.i32(pose.parent).u32(pose.mask);
            b.f32s(&pose.offset[..channels]).f32s(&pose.scale[..channels]);
        }
        for (anim, name) in self.anims.iter().zip(&anim_names) {
            b.u32(*name)
                .u32(anim.first_frame)
                .u32(anim.num_frames)
                .f32(anim.framerate)
                .u32(u32::from(anim.looping));
        }
        for &sample in &self.frame_data {
            b.u16(sample);
        }
        if let Some(bounds) = &self.bounds {
            for record in bounds {
                b.f32s(record);
            }
        }
        b.0
    }
}
