//! Attachment point queries
//!
//! A model exposes attachment points through exactly one of three sources,
//! checked in order: a caller-supplied skeleton override, the model's own
//! bones, or MD3-style tags. Indices are zero-based; name lookup returns them
//! one-based so that 0 can mean "not found".

use crate::error::TagError;
use crate::frame_blend::FrameBlend;
use crate::matrix::Matrix3x4;
use crate::model::AliasModel;
use crate::pose::Skeleton;

/// Hierarchy information for one attachment point
#[derive(Debug, Clone, PartialEq)]
pub struct TagInfo<'a> {
    /// Parent index, -1 for roots and for all MD3 tags
    pub parent: i32,
    pub name: &'a str,
    /// Transform relative to the parent, not composed with it
    pub local_matrix: Matrix3x4,
}

impl AliasModel {
    fn override_transforms<'s>(&self, skeleton: Option<&'s Skeleton>) -> Option<&'s [Matrix3x4]> {
        skeleton.and_then(|s| s.transforms_for(self.num_bones()))
    }

    /// Blend of the stored tag samples, still in axis-array form
    fn blended_tag(&self, blend: &FrameBlend, index: usize) -> Matrix3x4 {
        let mut sum = [0.0f32; 12];
        for entry in blend.effective_entries() {
            if let Some(tag) = self.tag_sample(entry.subframe, index) {
                for (out, v) in sum.iter_mut().zip(tag.matrix_gl.iter()) {
                    *out += v * entry.lerp;
                }
            }
        }
        Matrix3x4::from_axis_array(&sum)
    }

    /// Model-space transform of a bone or tag for `blend`
    ///
    /// Bone chains are composed from the root down for every blend entry and
    /// the results summed by weight. With tag scale disabled, the rotation
    /// part is rescaled to unit length.
    pub fn get_tag_matrix(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        index: usize,
    ) -> Result<Matrix3x4, TagError> {
        let bones = self.bones();
        let out = if let Some(transforms) = self.override_transforms(skeleton) {
            let mut out = *transforms.get(index).ok_or(TagError::OutOfRange)?;
            let mut current = index;
            while let Some(parent) = bones.get(current).and_then(|b| b.parent_index()) {
                out = transforms[parent].concat(&out);
                current = parent;
            }
            out
        } else if !bones.is_empty() {
            if index >= bones.len() {
                return Err(TagError::OutOfRange);
            }
            let pose_scale = self.pose_scale();
            let mut out = Matrix3x4::ZERO;
            for entry in blend.effective_entries() {
                let mut bone = self.bone_pose(entry.subframe, index).to_matrix(pose_scale);
                let mut current = index;
                while let Some(parent) = bones[current].parent_index() {
                    let parent_matrix = self.bone_pose(entry.subframe, parent).to_matrix(pose_scale);
                    bone = parent_matrix.concat(&bone);
                    current = parent;
                }
                out.accumulate(&bone, entry.lerp);
            }
            out
        } else if self.num_tags() > 0 {
            if index >= self.num_tags() {
                return Err(TagError::OutOfRange);
            }
            self.blended_tag(blend, index)
        } else {
            return Err(TagError::NoTagData);
        };

        Ok(if self.config.support_tag_scale {
            out
        } else {
            out.normalize3()
        })
    }

    /// Parent, name and parent-relative transform of a bone or tag
    ///
    /// `skin` is accepted for interface parity with name lookup and does not
    /// change the result.
    pub fn get_extended_tag_info(
        &self,
        _skin: usize,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        index: usize,
    ) -> Result<TagInfo<'_>, TagError> {
        let bones = self.bones();
        if let Some(transforms) = self.override_transforms(skeleton) {
            let (bone, local) = bones
                .get(index)
                .zip(transforms.get(index))
                .ok_or(TagError::OutOfRange)?;
            return Ok(TagInfo {
                parent: bone.parent,
                name: &bone.name,
                local_matrix: *local,
            });
        }
        if !bones.is_empty() {
            let bone = bones.get(index).ok_or(TagError::OutOfRange)?;
            let pose_scale = self.pose_scale();
            let mut local = Matrix3x4::ZERO;
            for entry in blend.effective_entries() {
                let pose = self.bone_pose(entry.subframe, index).to_matrix(pose_scale);
                local.accumulate(&pose, entry.lerp);
            }
            return Ok(TagInfo {
                parent: bone.parent,
                name: &bone.name,
                local_matrix: local,
            });
        }
        if self.num_tags() > 0 {
            let tag = self.tag_sample(0, index).filter(|_| index < self.num_tags());
            let tag = tag.ok_or(TagError::OutOfRange)?;
            return Ok(TagInfo {
                parent: -1,
                name: &tag.name,
                local_matrix: self.blended_tag(blend, index),
            });
        }
        Err(TagError::NoTagData)
    }

    /// One-based index of the bone or tag called `name`, 0 when absent
    ///
    /// Comparison ignores ASCII case. Bones are searched before tags. Every
    /// skin shares the same attachment points, so `skin` only exists for
    /// callers that track one.
    pub fn get_tag_index_for_name(&self, _skin: usize, name: &str) -> usize {
        if let Some(i) = self
            .bones()
            .iter()
            .position(|bone| bone.name.eq_ignore_ascii_case(name))
        {
            return i + 1;
        }
        (0..self.num_tags())
            .position(|i| {
                self.tag_sample(0, i)
                    .is_some_and(|tag| tag.name.eq_ignore_ascii_case(name))
            })
            .map_or(0, |i| i + 1)
    }

    /// Name of a bone or tag by zero-based index
    pub fn tag_name(&self, index: usize) -> Option<&str> {
        if !self.bones().is_empty() {
            return self.bones().get(index).map(|bone| bone.name.as_str());
        }
        if index < self.num_tags() {
            return self.tag_sample(0, index).map(|tag| tag.name.as_str());
        }
        None
    }

    /// Number of addressable attachment points: bones if any, else tags
    pub fn num_attachment_points(&self) -> usize {
        if self.num_bones() > 0 {
            self.num_bones()
        } else {
            self.num_tags()
        }
    }
}
