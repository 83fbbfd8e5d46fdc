//! Unified in-memory representation shared by all four formats

use glam::{Vec2, Vec3, Vec4};

use crate::blend_weights::BlendWeights;
use crate::collision::Bih;
use crate::config::AliasConfig;
use crate::material::Material;
use crate::pose::BonePose7s;

/// Source format of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ModelFormat {
    /// Quake 1 `IDPO`
    Mdl,
    /// Quake 2 `IDP2`
    Md2,
    /// Quake 3 `IDP3`
    Md3,
    /// Inter-Quake Model
    Iqm,
}

impl ModelFormat {
    /// Short type string for diagnostics
    pub fn type_str(self) -> &'static str {
        match self {
            Self::Mdl => "MDL",
            Self::Md2 => "MD2",
            Self::Md3 => "MD3",
            Self::Iqm => "IQM",
        }
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_str())
    }
}

/// Whether all instances animate in lockstep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum SyncType {
    Sync,
    #[default]
    Rand,
}

/// Named range of frames played as one animation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AnimScene {
    pub name: String,
    pub first_frame: usize,
    pub frame_count: usize,
    pub frame_rate: f32,
    pub looping: bool,
}

impl AnimScene {
    pub fn new(name: impl Into<String>, first_frame: usize, frame_count: usize, frame_rate: f32) -> Self {
        Self {
            name: name.into(),
            first_frame,
            frame_count,
            frame_rate,
            looping: true,
        }
    }
}

/// Skeleton node
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, below this bone's own index, or -1
    pub parent: i32,
    /// Inverse of the model-space bind pose
    pub base_pose_inverse: crate::matrix::Matrix3x4,
}

impl Bone {
    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }
}

/// Attachment point sample, three axes then origin
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTag {
    pub name: String,
    pub matrix_gl: [f32; 12],
}

/// Contiguous triangle and vertex range drawn with one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub name: String,
    pub first_triangle: usize,
    pub num_triangles: usize,
    pub first_vertex: usize,
    pub num_vertices: usize,
    /// Column of this surface in the skin table
    pub texture_index: usize,
}

/// MDL/MD2 compressed vertex: byte position plus byte normal index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriVertex {
    pub v: [u8; 3],
    pub normal_index: u8,
}

/// MD3 compressed vertex: position in 1/64 units plus polar normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Md3Vertex {
    pub origin: [i16; 3],
    pub pitch: u8,
    pub yaw: u8,
}

/// Texture-space vectors of a morph frame vertex, scaled by 127
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexVecVertex {
    pub svec: [i8; 3],
    pub tvec: [i8; 3],
}

/// Per-frame decompression for byte vertices
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTransform {
    pub scale: Vec3,
    pub translate: Vec3,
}

/// Vertex and triangle data of a model
///
/// The plain attribute arrays hold the rest pose (frame 0 for morph
/// formats). Morph formats additionally keep every frame compressed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub svectors: Vec<Vec3>,
    pub tvectors: Vec<Vec3>,
    pub colors: Option<Vec<Vec4>>,
    pub triangles: Vec<[u32; 3]>,
    /// 16-bit copy of `triangles` when every index fits
    pub short_triangles: Option<Vec<[u16; 3]>>,

    /// Per-vertex blend index: a bone below the bone count, else a table entry
    pub blend_indices: Vec<u32>,
    pub blends: Vec<BlendWeights>,
    /// Raw skeletal influences per vertex, for GPU skinning
    pub skeletal_indices: Vec<[u8; 4]>,
    pub skeletal_weights: Vec<[u8; 4]>,

    pub num_morph_frames: usize,
    pub morph_mdl_vertices: Vec<TriVertex>,
    pub morph_frame_transforms: Vec<FrameTransform>,
    pub morph_md3_vertices: Vec<Md3Vertex>,
    pub morph_texvecs: Vec<TexVecVertex>,
}

impl SurfaceMesh {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Fill `short_triangles` when the vertex count allows 16-bit indices
    pub(crate) fn build_short_triangles(&mut self) {
        self.short_triangles = (self.vertices.len() <= 65536).then(|| {
            self.triangles
                .iter()
                .map(|t| t.map(|i| i as u16))
                .collect()
        });
    }
}

/// Extents of a model over all its frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ModelBounds {
    pub normal_mins: Vec3,
    pub normal_maxs: Vec3,
    /// Box containing the model under any rotation about z
    pub yaw_mins: Vec3,
    pub yaw_maxs: Vec3,
    /// Box containing the model under any rotation
    pub rotated_mins: Vec3,
    pub rotated_maxs: Vec3,
    pub radius: f32,
    pub radius2: f32,
}

/// Vertex animation strategy, chosen once at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animator {
    /// One pose, copied as-is
    Static,
    /// MDL/MD2 byte vertices with per-frame scale and translate
    MdlMorph,
    /// MD3 short vertices with polar normals
    Md3Morph,
    /// Bones and blend weights
    Skeletal,
}

/// A loaded alias model
///
/// Everything is built once by a loader and read-only afterwards, so a model
/// can be animated from several threads as long as each caller brings its own
/// output buffers and [`BoneScratch`](crate::animate::BoneScratch).
#[derive(Debug, Clone)]
pub struct AliasModel {
    pub name: String,
    pub format: ModelFormat,
    pub sync_type: SyncType,
    /// Rendering effect bits from the file header
    pub effects: u32,
    /// Frame interpolation disabled for this model
    pub no_lerp: bool,

    pub mesh: SurfaceMesh,
    pub surfaces: Vec<Surface>,

    pub bones: Vec<Bone>,
    /// `num_poses * bones.len()` samples, frame-major
    pub poses: Vec<BonePose7s>,
    pub pose_scale: f32,
    pub num_poses: usize,

    /// `num_poses * num_tags` samples, frame-major
    pub tags: Vec<AliasTag>,
    pub num_tags: usize,

    pub frame_scenes: Vec<AnimScene>,
    pub skin_scenes: Vec<AnimScene>,
    /// Skin table, `skins * surfaces.len()` entries, skin-major
    pub textures: Vec<Material>,

    pub bounds: ModelBounds,
    pub is_animated: bool,
    pub animator: Animator,
    pub bih: Bih,
    pub config: AliasConfig,
}

const REST_POSE: BonePose7s = BonePose7s([0, 0, 0, 0, 0, 0, -32767]);

impl AliasModel {
    pub(crate) fn empty(name: &str, format: ModelFormat, config: AliasConfig) -> Self {
        Self {
            name: name.to_string(),
            format,
            sync_type: SyncType::Rand,
            effects: 0,
            no_lerp: config.is_no_lerp(name),
            mesh: SurfaceMesh::default(),
            surfaces: Vec::new(),
            bones: Vec::new(),
            poses: Vec::new(),
            pose_scale: 1.0,
            num_poses: 0,
            tags: Vec::new(),
            num_tags: 0,
            frame_scenes: Vec::new(),
            skin_scenes: Vec::new(),
            textures: Vec::new(),
            bounds: ModelBounds::default(),
            is_animated: false,
            animator: Animator::Static,
            bih: Bih::default(),
            config,
        }
    }

    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn pose_scale(&self) -> f32 {
        self.pose_scale
    }

    pub fn num_poses(&self) -> usize {
        self.num_poses
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn num_skins(&self) -> usize {
        self.skin_scenes.len()
    }

    pub fn is_animated(&self) -> bool {
        self.is_animated
    }

    pub fn bounds(&self) -> &ModelBounds {
        &self.bounds
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Behaviour switches this model was loaded with
    pub fn config(&self) -> &AliasConfig {
        &self.config
    }

    /// Replace the runtime switches (tag scale, debug bone, backend)
    pub fn set_config(&mut self, config: AliasConfig) {
        self.config = config;
    }

    /// Pose of `bone` at `subframe`, with the subframe clamped to the last pose
    pub fn bone_pose(&self, subframe: usize, bone: usize) -> &BonePose7s {
        let frame = subframe.min(self.num_poses.saturating_sub(1));
        self.poses
            .get(frame * self.bones.len() + bone)
            .unwrap_or(&REST_POSE)
    }

    /// Tag sample of `tag` at `subframe`, with the subframe clamped
    pub fn tag_sample(&self, subframe: usize, tag: usize) -> Option<&AliasTag> {
        let frame = subframe.min(self.num_poses.saturating_sub(1));
        self.tags.get(frame * self.num_tags + tag)
    }

    /// Materials of one skin, one per surface
    ///
    /// An out-of-range skin selects skin 0. Animated skins resolve to the
    /// first texture row of their scene.
    pub fn textures_for_skin(&self, skin: usize) -> &[Material] {
        let per_skin = self.surfaces.len();
        let skin = if skin < self.num_skins() { skin } else { 0 };
        let row = self.skin_scenes.get(skin).map_or(0, |scene| scene.first_frame);
        let start = row * per_skin;
        self.textures
            .get(start..start + per_skin)
            .unwrap_or(&[])
    }

    /// Material of a surface under skin 0
    pub fn surface_material(&self, surface: &Surface) -> Option<&Material> {
        self.textures_for_skin(0).get(surface.texture_index)
    }

    /// Name of the format, e.g. "MD3"
    pub fn type_str(&self) -> &'static str {
        self.format.type_str()
    }
}
