//! Per-frame vertex evaluation
//!
//! [`AliasModel::animate`] fills caller-owned attribute buffers for a
//! [`FrameBlend`]. Each attribute is optional; attributes without a buffer are
//! not computed. Buffers shorter than the vertex count receive a prefix.

mod morph;
mod skeletal;

use glam::{Affine3A, Vec3};

use crate::frame_blend::FrameBlend;
use crate::matrix::Matrix3x4;
use crate::model::{AliasModel, Animator};
use crate::pose::Skeleton;

/// Destination buffers for one evaluation
#[derive(Debug, Default)]
pub struct AnimateOutput<'a> {
    pub vertices: Option<&'a mut [Vec3]>,
    pub normals: Option<&'a mut [Vec3]>,
    pub svectors: Option<&'a mut [Vec3]>,
    pub tvectors: Option<&'a mut [Vec3]>,
}

impl<'a> AnimateOutput<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions only
    pub fn positions(vertices: &'a mut [Vec3]) -> Self {
        Self {
            vertices: Some(vertices),
            ..Self::default()
        }
    }

    pub fn with_vertices(mut self, vertices: &'a mut [Vec3]) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn with_normals(mut self, normals: &'a mut [Vec3]) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Texture-space vectors, s then t
    pub fn with_texture_vectors(mut self, svectors: &'a mut [Vec3], tvectors: &'a mut [Vec3]) -> Self {
        self.svectors = Some(svectors);
        self.tvectors = Some(tvectors);
        self
    }
}

/// Owned result of a full evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimatedMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub svectors: Vec<Vec3>,
    pub tvectors: Vec<Vec3>,
}

/// Reusable working memory for skeletal evaluation
///
/// Holds `2 * bones + blend combinations` matrices and only ever grows.
/// Reuse across frames avoids allocation; a fresh scratch gives the same
/// results.
#[derive(Debug, Clone, Default)]
pub struct BoneScratch {
    matrices: Vec<Matrix3x4>,
    columns: Vec<Affine3A>,
}

impl BoneScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch already sized for `model`
    pub fn for_model(model: &AliasModel) -> Self {
        let mut scratch = Self::new();
        scratch.matrices(Self::required_len(model));
        scratch
    }

    /// Number of matrices an evaluation of `model` needs
    pub fn required_len(model: &AliasModel) -> usize {
        2 * model.num_bones() + model.mesh.blends.len()
    }

    /// Current size in matrices
    pub fn capacity(&self) -> usize {
        self.matrices.len()
    }

    pub(crate) fn matrices(&mut self, len: usize) -> &mut [Matrix3x4] {
        if self.matrices.len() < len {
            self.matrices.resize(len, Matrix3x4::ZERO);
        }
        &mut self.matrices[..len]
    }
}

impl AliasModel {
    /// Evaluate vertex attributes for `blend`
    ///
    /// `skeleton` replaces the stored bone animation when its length matches
    /// the bone count. Never fails: subframes past the last pose are clamped
    /// and a model without vertices leaves the buffers untouched.
    pub fn animate(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        output: &mut AnimateOutput<'_>,
        scratch: &mut BoneScratch,
    ) {
        if self.mesh.num_vertices() == 0 {
            return;
        }
        match self.animator {
            Animator::Static => copy_rest_pose(self, output),
            Animator::MdlMorph => morph::animate_mdl(self, blend, output),
            Animator::Md3Morph => morph::animate_md3(self, blend, output),
            Animator::Skeletal => skeletal::animate(self, blend, skeleton, output, scratch),
        }
    }

    /// Positions for `blend`, in a new buffer
    pub fn animate_vertices(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        scratch: &mut BoneScratch,
    ) -> Vec<Vec3> {
        let mut vertices = vec![Vec3::ZERO; self.mesh.num_vertices()];
        self.animate(
            blend,
            skeleton,
            &mut AnimateOutput::positions(&mut vertices),
            scratch,
        );
        vertices
    }

    /// Every attribute for `blend`, in new buffers
    pub fn animate_all(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        scratch: &mut BoneScratch,
    ) -> AnimatedMesh {
        let n = self.mesh.num_vertices();
        let mut mesh = AnimatedMesh {
            vertices: vec![Vec3::ZERO; n],
            normals: vec![Vec3::ZERO; n],
            svectors: vec![Vec3::ZERO; n],
            tvectors: vec![Vec3::ZERO; n],
        };
        let mut output = AnimateOutput {
            vertices: Some(&mut mesh.vertices),
            normals: Some(&mut mesh.normals),
            svectors: Some(&mut mesh.svectors),
            tvectors: Some(&mut mesh.tvectors),
        };
        self.animate(blend, skeleton, &mut output, scratch);
        mesh
    }
}

fn copy_into(dst: Option<&mut [Vec3]>, src: &[Vec3]) {
    if let Some(dst) = dst {
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
    }
}

/// Copy the stored rest-pose arrays
pub(crate) fn copy_rest_pose(model: &AliasModel, output: &mut AnimateOutput<'_>) {
    let mesh = &model.mesh;
    copy_into(output.vertices.as_deref_mut(), &mesh.vertices);
    copy_into(output.normals.as_deref_mut(), &mesh.normals);
    copy_into(output.svectors.as_deref_mut(), &mesh.svectors);
    copy_into(output.tvectors.as_deref_mut(), &mesh.tvectors);
}
