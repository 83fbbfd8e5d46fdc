//! Model extents and the animated classification
//!
//! Extents are gathered by evaluating every pose at full weight. The same
//! pass detects whether any pose moves a vertex away from where pose 0 put
//! it; such a model is "animated" and traces against it re-evaluate the
//! geometry instead of using the static collision tree.

use glam::Vec3;

use crate::animate::BoneScratch;
use crate::frame_blend::FrameBlend;
use crate::model::{AliasModel, Animator, ModelBounds};

impl ModelBounds {
    /// Derive the yaw and rotation boxes from the axis-aligned box and radii
    ///
    /// `yaw_radius` is the largest distance from the z axis and `radius` the
    /// largest distance from the origin.
    pub fn from_extents(mins: Vec3, maxs: Vec3, yaw_radius: f32, radius: f32) -> Self {
        Self {
            normal_mins: mins,
            normal_maxs: maxs,
            yaw_mins: Vec3::new(-yaw_radius, -yaw_radius, mins.z),
            yaw_maxs: Vec3::new(yaw_radius, yaw_radius, maxs.z),
            rotated_mins: Vec3::splat(-radius),
            rotated_maxs: Vec3::splat(radius),
            radius,
            radius2: radius * radius,
        }
    }
}

/// Running extents over a set of points
#[derive(Debug, Clone, Copy, Default)]
struct Extents {
    mins: Vec3,
    maxs: Vec3,
    yaw_radius2: f32,
    radius2: f32,
    any: bool,
}

impl Extents {
    fn add(&mut self, v: Vec3) {
        if self.any {
            self.mins = self.mins.min(v);
            self.maxs = self.maxs.max(v);
        } else {
            self.mins = v;
            self.maxs = v;
            self.any = true;
        }
        let yaw = v.x * v.x + v.y * v.y;
        self.yaw_radius2 = self.yaw_radius2.max(yaw);
        self.radius2 = self.radius2.max(yaw + v.z * v.z);
    }

    fn finish(&self) -> ModelBounds {
        ModelBounds::from_extents(self.mins, self.maxs, self.yaw_radius2.sqrt(), self.radius2.sqrt())
    }
}

fn same_bits(a: &[Vec3], b: &[Vec3]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.to_array().map(f32::to_bits) == y.to_array().map(f32::to_bits))
}

/// Extents over every pose and whether any pose differs from the first
pub fn sample_bounds(model: &AliasModel) -> (ModelBounds, bool) {
    let mut extents = Extents::default();
    if model.animator == Animator::Static {
        model.mesh.vertices.iter().for_each(|&v| extents.add(v));
        return (extents.finish(), false);
    }

    let mut scratch = BoneScratch::for_model(model);
    let mut first: Option<Vec<Vec3>> = None;
    let mut animated = false;
    for pose in 0..model.num_poses().max(1) {
        let vertices = model.animate_vertices(&FrameBlend::single(pose), None, &mut scratch);
        vertices.iter().for_each(|&v| extents.add(v));
        if first.is_none() {
            first = Some(vertices);
        } else if !animated {
            animated = first.as_deref().is_some_and(|f| !same_bits(f, &vertices));
        }
    }
    (extents.finish(), animated)
}

/// Final classification: the configured override, else the sampled result
pub fn classify_animated(model: &AliasModel, sampled: bool) -> bool {
    match model.config.forced_animated() {
        Some(forced) => {
            log::debug!("{}: animated classification forced to {forced}", model.name);
            forced
        }
        None => sampled,
    }
}

/// Sample the bounds and classify, storing both in the model
pub(crate) fn apply_sampled_bounds(model: &mut AliasModel) {
    let (bounds, sampled) = sample_bounds(model);
    model.bounds = bounds;
    model.is_animated = classify_animated(model, sampled);
}
