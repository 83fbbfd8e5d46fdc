//! Quantized bone poses and bone hierarchy transforms
//!
//! Skeletal models store every pose sample as seven signed 16-bit values:
//! a translation in units of the model's `pose_scale` and a unit quaternion
//! scaled by 32767. Blending converts each weighted sample to a dual
//! quaternion, sums them with antipodal sign correction, and turns the sum
//! back into a matrix while implicitly normalizing it.

use glam::Vec3;

use crate::config::AliasConfig;
use crate::frame_blend::FrameBlend;
use crate::matrix::Matrix3x4;
use crate::model::AliasModel;

/// Scale between a unit quaternion component and its stored value
pub const ROTATION_SCALE: f32 = 32767.0;

/// Fourth quaternion component from the other three
///
/// Stored rotations keep w non-positive, so the result is `-sqrt(1 - |xyz|^2)`.
/// A non-positive remainder (a degenerate or slightly denormalized input) gives
/// zero instead of NaN.
pub fn reconstruct_w(x: f32, y: f32, z: f32) -> f32 {
    let w = 1.0 - (x * x + y * y + z * z);
    if w > 0.0 { -w.sqrt() } else { 0.0 }
}

/// Bring a full quaternion into the stored convention: w <= 0, unit length
pub fn canonical_quat(q: [f32; 4]) -> [f32; 4] {
    let mut q = q;
    if q[3] > 0.0 {
        q = q.map(|v| -v);
    }
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len != 0.0 {
        let inv = 1.0 / len;
        q = q.map(|v| v * inv);
    }
    q
}

/// One quantized bone pose: translation xyz then quaternion xyzw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BonePose7s(pub [i16; 7]);

impl BonePose7s {
    /// Quantize a translation and unit quaternion
    ///
    /// `inv_pose_scale` converts world units into the stored fixed-point
    /// range. Values are truncated toward zero like a C float-to-short cast.
    pub fn quantize(translation: Vec3, rotation: [f32; 4], inv_pose_scale: f32) -> Self {
        Self([
            (translation.x * inv_pose_scale) as i16,
            (translation.y * inv_pose_scale) as i16,
            (translation.z * inv_pose_scale) as i16,
            (rotation[0] * ROTATION_SCALE) as i16,
            (rotation[1] * ROTATION_SCALE) as i16,
            (rotation[2] * ROTATION_SCALE) as i16,
            (rotation[3] * ROTATION_SCALE) as i16,
        ])
    }

    /// Stored translation, still in fixed-point units
    pub fn raw_translation(&self) -> [f32; 3] {
        [
            f32::from(self.0[0]),
            f32::from(self.0[1]),
            f32::from(self.0[2]),
        ]
    }

    /// Stored quaternion, still scaled by 32767
    pub fn raw_rotation(&self) -> [f32; 4] {
        [
            f32::from(self.0[3]),
            f32::from(self.0[4]),
            f32::from(self.0[5]),
            f32::from(self.0[6]),
        ]
    }

    /// Dequantized unit quaternion `(x, y, z, w)`
    pub fn rotation(&self) -> [f32; 4] {
        self.raw_rotation().map(|v| v * (1.0 / ROTATION_SCALE))
    }

    /// Parent-relative matrix for this pose
    ///
    /// The quaternion is renormalized since quantization shortens it slightly.
    pub fn to_matrix(&self, pose_scale: f32) -> Matrix3x4 {
        let mut q = self.rotation();
        let len2 = q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3];
        if len2 != 1.0 && len2 > 0.0 {
            let scale = 1.0 / len2.sqrt();
            q = q.map(|v| v * scale);
        }
        let [tx, ty, tz] = self.raw_translation();
        Matrix3x4::from_quat_translation(
            q,
            Vec3::new(tx * pose_scale, ty * pose_scale, tz * pose_scale),
        )
    }
}

/// Running weighted sum of bone poses in dual-quaternion form
///
/// `r` is the rotation part and `d` the translation part, both left in the
/// fixed-point units of the stored poses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuatBlend {
    r: [f32; 4],
    d: [f32; 4],
}

impl DualQuatBlend {
    /// Start a blend from the first weighted pose
    pub fn new(pose: &BonePose7s, lerp: f32) -> Self {
        let q = pose.raw_rotation().map(|v| v * lerp);
        let t = pose.raw_translation();
        Self {
            r: q,
            d: translation_part(t, q),
        }
    }

    /// Add another weighted pose
    ///
    /// When the pose lies in the opposite hemisphere of the running sum its
    /// weight is negated, so the blend follows the short arc.
    pub fn add(&mut self, pose: &BonePose7s, lerp: f32) {
        let raw = pose.raw_rotation();
        let r = &self.r;
        let dot = r[0] * raw[0] + r[1] * raw[1] + r[2] * raw[2] + r[3] * raw[3];
        let lerp = if dot < 0.0 { -lerp } else { lerp };
        let q = raw.map(|v| v * lerp);
        let d = translation_part(pose.raw_translation(), q);
        for i in 0..4 {
            self.r[i] += q[i];
            self.d[i] += d[i];
        }
    }

    /// Accumulated rotation part
    pub fn rotation(&self) -> [f32; 4] {
        self.r
    }

    /// Matrix for the accumulated transform
    ///
    /// Dividing by the squared magnitude of `r` normalizes the blend;
    /// `pose_scale` maps the translation back to world units.
    pub fn to_matrix(&self, pose_scale: f32) -> Matrix3x4 {
        let [rx, ry, rz, rw] = self.r;
        let [dx, dy, dz, dw] = self.d;
        let scale = 1.0 / (rx * rx + ry * ry + rz * rz + rw * rw);
        let sx = rx * scale;
        let sy = ry * scale;
        let sz = rz * scale;
        let sw = rw * scale;
        Matrix3x4 {
            rows: [
                [
                    sw * rw + sx * rx - sy * ry - sz * rz,
                    2.0 * (sx * ry - sw * rz),
                    2.0 * (sx * rz + sw * ry),
                    pose_scale * (dx * sw - dy * sz + dz * sy - dw * sx),
                ],
                [
                    2.0 * (sx * ry + sw * rz),
                    sw * rw + sy * ry - sx * rx - sz * rz,
                    2.0 * (sy * rz - sw * rx),
                    pose_scale * (dx * sz + dy * sw - dz * sx - dw * sy),
                ],
                [
                    2.0 * (sx * rz - sw * ry),
                    2.0 * (sy * rz + sw * rx),
                    sw * rw + sz * rz - sx * rx - sy * ry,
                    pose_scale * (dy * sx + dz * sw - dx * sy - dw * sz),
                ],
            ],
        }
    }
}

fn translation_part(t: [f32; 3], q: [f32; 4]) -> [f32; 4] {
    let [tx, ty, tz] = t;
    let [qx, qy, qz, qw] = q;
    [
        tx * qw + ty * qz - tz * qy,
        -tx * qz + ty * qw + tz * qx,
        tx * qy - ty * qx + tz * qw,
        -tx * qx - ty * qy - tz * qz,
    ]
}

/// Externally supplied bone transforms replacing the stored animation
///
/// Each entry is the parent-relative transform of the bone with the same
/// index, typically produced by ragdoll or inverse kinematics code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub relative_transforms: Vec<Matrix3x4>,
}

impl Skeleton {
    pub fn new(relative_transforms: Vec<Matrix3x4>) -> Self {
        Self {
            relative_transforms,
        }
    }

    /// Transforms usable for a model with `num_bones` bones
    ///
    /// An override built for a different skeleton is ignored.
    pub fn transforms_for(&self, num_bones: usize) -> Option<&[Matrix3x4]> {
        (num_bones > 0 && self.relative_transforms.len() == num_bones)
            .then_some(self.relative_transforms.as_slice())
    }
}

/// Compute absolute and deformation matrices for every bone
///
/// `bone_pose[i]` receives the model-space transform of bone `i` and
/// `relative[i]` that transform concatenated with the inverse bind pose, which
/// maps rest-pose vertices to their animated position. Both slices must hold
/// at least `model.num_bones()` entries.
pub fn build_bone_transforms(
    model: &AliasModel,
    blend: &FrameBlend,
    skeleton: Option<&Skeleton>,
    config: &AliasConfig,
    bone_pose: &mut [Matrix3x4],
    relative: &mut [Matrix3x4],
) {
    let num_bones = model.num_bones();
    let bones = model.bones();

    if let Some(transforms) = skeleton.and_then(|s| s.transforms_for(num_bones)) {
        for (i, bone) in bones.iter().enumerate() {
            let local = transforms[i];
            bone_pose[i] = match bone.parent_index() {
                Some(parent) => bone_pose[parent].concat(&local),
                None => local,
            };
            relative[i] = bone_pose[i].concat(&bone.base_pose_inverse);
        }
        return;
    }

    let entries = blend.effective_entries();
    let pose_scale = model.pose_scale();
    for (i, bone) in bones.iter().enumerate() {
        let mut dq = DualQuatBlend::new(model.bone_pose(entries[0].subframe, i), entries[0].lerp);
        for entry in &entries[1..] {
            dq.add(model.bone_pose(entry.subframe, i), entry.lerp);
        }
        let mut m = dq.to_matrix(pose_scale);
        if config.is_debug_bone(i) {
            let c = config.debug_component();
            m.rows[c / 4][c % 4] += config.debug_bone_value;
        }
        m.rows[0][3] *= config.debug_translate[0];
        m.rows[1][3] *= config.debug_translate[1];
        m.rows[2][3] *= config.debug_translate[2];
        bone_pose[i] = match bone.parent_index() {
            Some(parent) => bone_pose[parent].concat(&m),
            None => m,
        };
        relative[i] = bone_pose[i].concat(&bone.base_pose_inverse);
    }
}
