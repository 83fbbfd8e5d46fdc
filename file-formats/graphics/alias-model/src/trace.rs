//! Line and box traces against model triangles
//!
//! Only front faces block: a line must start in front of a triangle's plane
//! and end behind it. Triangle meshes enclose no volume, so point queries
//! always report empty contents.
//!
//! A trace against a model either walks the static collision tree built from
//! frame 0 or animates the vertices for the requested blend and tests every
//! triangle near the segment. Both visit triangles in mesh order, so they
//! produce identical results for frame 0.

use glam::Vec3;

use crate::animate::BoneScratch;
use crate::frame_blend::FrameBlend;
use crate::material::{Material, MaterialFlags, SuperContents};
use crate::model::AliasModel;
use crate::pose::Skeleton;

/// Distance an impact is pulled back toward the start of a trace
pub const IMPACT_NUDGE: f32 = 1.0 / 32.0;

/// Which triangles a trace may hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceMasks {
    /// A triangle is considered only if its contents intersect this mask
    pub hit: SuperContents,
    /// Triangles with any of these contents are ignored
    pub skip: SuperContents,
    /// Triangles whose material has any of these flags are ignored
    pub skip_material: MaterialFlags,
}

impl Default for TraceMasks {
    fn default() -> Self {
        Self {
            hit: SuperContents::SOLID,
            skip: SuperContents::empty(),
            skip_material: MaterialFlags::empty(),
        }
    }
}

impl TraceMasks {
    pub fn new(hit: SuperContents, skip: SuperContents, skip_material: MaterialFlags) -> Self {
        Self {
            hit,
            skip,
            skip_material,
        }
    }

    fn accepts(&self, hit: &TriangleHit) -> bool {
        hit.contents.intersects(self.hit)
            && !hit.contents.intersects(self.skip)
            && !hit.flags.intersects(self.skip_material)
    }
}

/// Result of a trace
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Fraction of the segment travelled, pulled back from the impact
    pub fraction: f32,
    /// Exact fraction of the impact
    pub real_fraction: f32,
    pub end_position: Vec3,
    pub plane_normal: Vec3,
    pub plane_dist: f32,
    pub start_solid: bool,
    pub all_solid: bool,
    pub hit_super_contents: SuperContents,
    /// Skin table column of the surface that was hit
    pub hit_texture: Option<usize>,
    pub hit_mask: SuperContents,
    pub skip_mask: SuperContents,
    pub skip_material_flags: MaterialFlags,
}

impl Trace {
    /// A trace that has not hit anything yet
    pub fn new(end: Vec3, masks: TraceMasks) -> Self {
        Self {
            fraction: 1.0,
            real_fraction: 1.0,
            end_position: end,
            plane_normal: Vec3::ZERO,
            plane_dist: 0.0,
            start_solid: false,
            all_solid: false,
            hit_super_contents: SuperContents::empty(),
            hit_texture: None,
            hit_mask: masks.hit,
            skip_mask: masks.skip,
            skip_material_flags: masks.skip_material,
        }
    }

    pub fn masks(&self) -> TraceMasks {
        TraceMasks::new(self.hit_mask, self.skip_mask, self.skip_material_flags)
    }

    pub fn hit(&self) -> bool {
        self.fraction < 1.0 || self.start_solid
    }

    fn record(&mut self, real_fraction: f32, fraction: f32, normal: Vec3, dist: f32, hit: &TriangleHit) {
        self.real_fraction = real_fraction;
        self.fraction = fraction;
        self.plane_normal = normal;
        self.plane_dist = dist;
        self.hit_super_contents = hit.contents;
        self.hit_texture = hit.texture;
    }

    fn finish(&mut self, start: Vec3, end: Vec3) {
        self.end_position = start + (end - start) * self.fraction;
    }
}

/// What a triangle reports when it is hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleHit {
    pub contents: SuperContents,
    pub flags: MaterialFlags,
    pub texture: Option<usize>,
}

impl TriangleHit {
    pub fn from_material(material: &Material, texture: Option<usize>) -> Self {
        Self {
            contents: material.surface_contents(),
            flags: material.flags,
            texture,
        }
    }
}

/// Clip a line trace against one triangle
///
/// The triangle faces the side where `(p0 - p1) x (p2 - p1)` points.
pub fn trace_line_triangle(
    trace: &mut Trace,
    start: Vec3,
    end: Vec3,
    [p0, p1, p2]: [Vec3; 3],
    hit: &TriangleHit,
) {
    let edge01 = p0 - p1;
    let edge21 = p2 - p1;
    let normal = edge01.cross(edge21);
    let length2 = normal.length_squared();
    if length2 < 0.0001 {
        return;
    }
    let dist = p0.dot(normal);
    let d1 = start.dot(normal);
    let d2 = end.dot(normal);
    if d1 <= dist || d2 > dist {
        return;
    }
    let f = ((d1 - dist) / (d1 - d2)).clamp(0.0, 1.0);
    if f > trace.real_fraction {
        return;
    }

    let impact = start + (end - start) * f;
    let edge = edge01.cross(normal);
    if impact.dot(edge) > p1.dot(edge) {
        return;
    }
    let edge = normal.cross(edge21);
    if impact.dot(edge) > p2.dot(edge) {
        return;
    }
    let edge = normal.cross(p0 - p2);
    if impact.dot(edge) > p0.dot(edge) {
        return;
    }

    let length = length2.sqrt();
    let nudged = ((d1 - dist - IMPACT_NUDGE * length) / (d1 - d2)).clamp(0.0, 1.0);
    trace.record(f, nudged, normal / length, dist / length, hit);
}

/// Clip a swept box trace against one triangle
///
/// Separating axes are the three box axes, the triangle normal and the
/// crosses of each triangle edge with each box axis. The box enters the
/// triangle at the latest entry time over all axes.
pub fn trace_box_triangle(
    trace: &mut Trace,
    start: Vec3,
    end: Vec3,
    mins: Vec3,
    maxs: Vec3,
    corners: [Vec3; 3],
    hit: &TriangleHit,
) {
    let [p0, p1, p2] = corners;
    let normal = (p0 - p1).cross(p2 - p1);
    let length2 = normal.length_squared();
    if length2 < 0.0001 {
        return;
    }
    let normal = normal / length2.sqrt();
    let delta = end - start;
    let center = start + (mins + maxs) * 0.5;
    let half = (maxs - mins) * 0.5;
    if delta.dot(normal) >= 0.0 || center.dot(normal) <= p0.dot(normal) {
        return;
    }

    let edges = [p1 - p0, p2 - p1, p0 - p2];
    let mut axes = [Vec3::ZERO; 13];
    axes[0] = Vec3::X;
    axes[1] = Vec3::Y;
    axes[2] = Vec3::Z;
    axes[3] = normal;
    for (i, edge) in edges.iter().enumerate() {
        for (j, axis) in [Vec3::X, Vec3::Y, Vec3::Z].iter().enumerate() {
            axes[4 + i * 3 + j] = edge.cross(*axis);
        }
    }

    let mut enter = f32::NEG_INFINITY;
    let mut leave = f32::INFINITY;
    let mut enter_normal = normal;
    let mut enter_speed = 0.0;
    for axis in axes {
        let len2 = axis.length_squared();
        if len2 < 1e-8 {
            continue;
        }
        let axis = axis / len2.sqrt();
        let projected = corners.map(|p| p.dot(axis));
        let lo = projected[0].min(projected[1]).min(projected[2]);
        let hi = projected[0].max(projected[1]).max(projected[2]);
        let radius = half.dot(axis.abs());
        let lo = lo - radius;
        let hi = hi + radius;
        let from = center.dot(axis);
        let speed = delta.dot(axis);

        if speed.abs() < 1e-8 {
            if from < lo || from > hi {
                return;
            }
            continue;
        }
        let (t0, t1, facing) = if speed > 0.0 {
            ((lo - from) / speed, (hi - from) / speed, -axis)
        } else {
            ((hi - from) / speed, (lo - from) / speed, axis)
        };
        if t0 > enter {
            enter = t0;
            enter_normal = facing;
            enter_speed = speed.abs();
        }
        leave = leave.min(t1);
        if enter > leave {
            return;
        }
    }
    if leave < 0.0 || enter > 1.0 {
        return;
    }

    if enter < 0.0 {
        trace.start_solid = true;
        if leave > 1.0 {
            trace.all_solid = true;
        }
        trace.record(0.0, 0.0, normal, p0.dot(normal), hit);
        return;
    }
    if enter > trace.real_fraction {
        return;
    }
    let nudged = if enter_speed > 0.0 {
        (enter - IMPACT_NUDGE / enter_speed).max(0.0)
    } else {
        enter
    };
    let dist = p0.dot(enter_normal);
    trace.record(enter, nudged, enter_normal, dist, hit);
}

/// A segment and the box swept along it
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TraceSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl TraceSegment {
    fn is_line(&self) -> bool {
        self.mins == Vec3::ZERO && self.maxs == Vec3::ZERO
    }

    /// Region a triangle must touch to be tested
    fn bounds(&self) -> (Vec3, Vec3) {
        (
            self.start.min(self.end) + self.mins - Vec3::ONE,
            self.start.max(self.end) + self.maxs + Vec3::ONE,
        )
    }

    fn test(&self, trace: &mut Trace, corners: [Vec3; 3], hit: &TriangleHit) {
        if self.is_line() {
            trace_line_triangle(trace, self.start, self.end, corners, hit);
        } else {
            trace_box_triangle(trace, self.start, self.end, self.mins, self.maxs, corners, hit);
        }
    }
}

fn triangle_bounds_overlap(corners: &[Vec3; 3], mins: Vec3, maxs: Vec3) -> bool {
    let tmins = corners[0].min(corners[1]).min(corners[2]);
    let tmaxs = corners[0].max(corners[1]).max(corners[2]);
    tmins.cmple(maxs).all() && tmaxs.cmpge(mins).all()
}

impl AliasModel {
    /// Contents and material flags of each surface under skin 0
    fn surface_hits(&self) -> Vec<TriangleHit> {
        self.surfaces
            .iter()
            .map(|surface| match self.surface_material(surface) {
                Some(material) => TriangleHit::from_material(material, Some(surface.texture_index)),
                None => TriangleHit::from_material(&Material::wall(""), Some(surface.texture_index)),
            })
            .collect()
    }

    /// Whether the static tree represents the geometry of `blend`
    fn uses_static_geometry(&self, blend: &FrameBlend, skeleton: Option<&Skeleton>) -> bool {
        if skeleton
            .and_then(|s| s.transforms_for(self.num_bones()))
            .is_some()
        {
            return false;
        }
        if blend.is_base_frame() {
            return true;
        }
        !self.is_animated && matches!(blend.effective_entries(), [only] if only.lerp == 1.0)
    }

    fn trace_segment(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        segment: TraceSegment,
        masks: TraceMasks,
    ) -> Trace {
        let mut trace = Trace::new(segment.end, masks);
        let hits = self.surface_hits();
        let (mins, maxs) = segment.bounds();

        if self.uses_static_geometry(blend, skeleton) {
            for leaf in self.bih.query_box(mins, maxs) {
                let Some(hit) = hits.get(leaf.surface as usize) else {
                    continue;
                };
                if masks.accepts(hit) {
                    segment.test(&mut trace, leaf.corners, hit);
                }
            }
        } else {
            let mut scratch = BoneScratch::for_model(self);
            let vertices = self.animate_vertices(blend, skeleton, &mut scratch);
            for (surface, hit) in self.surfaces.iter().zip(&hits) {
                if !masks.accepts(hit) {
                    continue;
                }
                let range = surface.first_triangle..surface.first_triangle + surface.num_triangles;
                for tri in self.mesh.triangles.get(range).unwrap_or(&[]) {
                    let corners = match (
                        vertices.get(tri[0] as usize),
                        vertices.get(tri[1] as usize),
                        vertices.get(tri[2] as usize),
                    ) {
                        (Some(&a), Some(&b), Some(&c)) => [a, b, c],
                        _ => continue,
                    };
                    if triangle_bounds_overlap(&corners, mins, maxs) {
                        segment.test(&mut trace, corners, hit);
                    }
                }
            }
        }

        trace.finish(segment.start, segment.end);
        trace
    }

    /// Trace a line from `start` to `end` against the model posed by `blend`
    pub fn trace_line(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        start: Vec3,
        end: Vec3,
        masks: TraceMasks,
    ) -> Trace {
        let segment = TraceSegment {
            start,
            end,
            mins: Vec3::ZERO,
            maxs: Vec3::ZERO,
        };
        self.trace_segment(blend, skeleton, segment, masks)
    }

    /// Trace a box spanning `mins..maxs` around the moving origin
    ///
    /// A box with no size is traced as a line through the offset origin.
    pub fn trace_box(
        &self,
        blend: &FrameBlend,
        skeleton: Option<&Skeleton>,
        start: Vec3,
        mins: Vec3,
        maxs: Vec3,
        end: Vec3,
        masks: TraceMasks,
    ) -> Trace {
        if mins == maxs {
            let mut trace = self.trace_line(blend, skeleton, start + mins, end + mins, masks);
            trace.end_position -= mins;
            return trace;
        }
        let segment = TraceSegment {
            start,
            end,
            mins,
            maxs,
        };
        self.trace_segment(blend, skeleton, segment, masks)
    }

    /// Trace a stationary point; meshes have no inside, so this never hits
    pub fn trace_point(
        &self,
        _blend: &FrameBlend,
        _skeleton: Option<&Skeleton>,
        point: Vec3,
        masks: TraceMasks,
    ) -> Trace {
        Trace::new(point, masks)
    }

    /// Contents at a point, always empty for triangle meshes
    pub fn point_super_contents(
        &self,
        _blend: &FrameBlend,
        _skeleton: Option<&Skeleton>,
        _point: Vec3,
    ) -> SuperContents {
        SuperContents::empty()
    }
}
