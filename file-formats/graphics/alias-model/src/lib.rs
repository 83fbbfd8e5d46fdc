//! Loading and animation of Quake-family alias models
//!
//! Four on-disk formats are parsed into one [`AliasModel`]:
//!
//! - `.mdl` (Quake), byte vertices with embedded palettized skins
//! - `.md2` (Quake II), byte vertices with per-frame scale
//! - `.md3` (Quake III), multi-mesh with per-frame tags
//! - `.iqm` (Inter-Quake Model), skeletal with blend weights
//!
//! A loaded model is read-only. Vertex positions for any blend of frames are
//! produced by [`AliasModel::animate`], attachment points by
//! [`AliasModel::get_tag_matrix`], and collision queries by
//! [`AliasModel::trace_line`] and friends.
//!
//! ```no_run
//! use alias_model::{AnimateOutput, BoneScratch, FrameBlend, LoadContext, NullMaterialLibrary};
//! use glam::Vec3;
//!
//! let bytes = std::fs::read("progs/player.mdl")?;
//! let mut materials = NullMaterialLibrary;
//! let mut ctx = LoadContext::new(&mut materials);
//! let model = alias_model::load_model("progs/player.mdl", &bytes, &mut ctx)?;
//!
//! let mut vertices = vec![Vec3::ZERO; model.mesh.num_vertices()];
//! let mut scratch = BoneScratch::for_model(&model);
//! model.animate(
//!     &FrameBlend::lerp(0, 1, 0.25),
//!     None,
//!     &mut AnimateOutput::positions(&mut vertices),
//!     &mut scratch,
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod animate;
pub mod blend_weights;
pub mod bounds;
pub mod collision;
pub mod config;
pub mod error;
pub mod formats;
pub mod frame_blend;
pub mod loader;
pub mod material;
pub mod matrix;
pub mod model;
pub mod normals;
pub mod pose;
mod reader;
pub mod simd;
pub mod tags;
pub mod tangents;
pub mod trace;

// Re-export common types
pub use animate::{AnimateOutput, BoneScratch};
pub use blend_weights::{BlendTable, BlendWeights, compress_blend};
pub use collision::Bih;
pub use config::{AliasConfig, SkinningBackend};
pub use error::{AliasError, Result, TagError};
pub use frame_blend::{FrameBlend, FrameBlendEntry, MAX_FRAME_BLENDS};
pub use loader::{LoadContext, load_model};
pub use material::{
    Material, MaterialFlags, MaterialLibrary, NullMaterialLibrary, SkinFile, SuperContents,
};
pub use matrix::Matrix3x4;
pub use model::{
    AliasModel, AliasTag, AnimScene, Animator, Bone, ModelBounds, ModelFormat, Surface,
    SurfaceMesh, SyncType,
};
pub use pose::{BonePose7s, Skeleton, build_bone_transforms};
pub use tags::TagInfo;
pub use trace::{Trace, TraceMasks};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
