//! Row-major 3x4 affine transforms
//!
//! Bone and tag transforms are rigid (or uniformly scaled) so the bottom row
//! of a 4x4 matrix is never stored. Rows hold the rotation/scale part in
//! columns 0..3 and the translation in column 3, which is the layout the
//! skinning loops read as twelve consecutive floats.

use glam::Vec3;

/// 3x4 affine matrix, `rows[r][c]`, translation in column 3
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3x4 {
    pub rows: [[f32; 4]; 3],
}

impl Default for Matrix3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3x4 {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0], // Row 0
            [0.0, 1.0, 0.0, 0.0], // Row 1
            [0.0, 0.0, 1.0, 0.0], // Row 2
        ],
    };

    /// All components zero, the starting point for weighted accumulation
    pub const ZERO: Self = Self {
        rows: [[0.0; 4]; 3],
    };

    /// Build from twelve floats laid out row by row
    pub fn from_row_array(a: &[f32; 12]) -> Self {
        Self {
            rows: [
                [a[0], a[1], a[2], a[3]],
                [a[4], a[5], a[6], a[7]],
                [a[8], a[9], a[10], a[11]],
            ],
        }
    }

    /// Twelve floats laid out row by row
    pub fn to_row_array(&self) -> [f32; 12] {
        let r = &self.rows;
        [
            r[0][0], r[0][1], r[0][2], r[0][3], r[1][0], r[1][1], r[1][2], r[1][3], r[2][0],
            r[2][1], r[2][2], r[2][3],
        ]
    }

    /// Build from three basis axes followed by an origin, as MD3 tags store them
    ///
    /// Each axis becomes a column of the rotation part.
    pub fn from_axis_array(a: &[f32; 12]) -> Self {
        Self {
            rows: [
                [a[0], a[3], a[6], a[9]],
                [a[1], a[4], a[7], a[10]],
                [a[2], a[5], a[8], a[11]],
            ],
        }
    }

    /// Rotation from a unit quaternion `(x, y, z, w)` plus translation
    pub fn from_quat_translation(q: [f32; 4], t: Vec3) -> Self {
        let [x, y, z, w] = q;
        Self {
            rows: [
                [
                    1.0 - 2.0 * (y * y + z * z),
                    2.0 * (x * y - z * w),
                    2.0 * (x * z + y * w),
                    t.x,
                ],
                [
                    2.0 * (x * y + z * w),
                    1.0 - 2.0 * (x * x + z * z),
                    2.0 * (y * z - x * w),
                    t.y,
                ],
                [
                    2.0 * (x * z - y * w),
                    2.0 * (y * z + x * w),
                    1.0 - 2.0 * (x * x + y * y),
                    t.z,
                ],
            ],
        }
    }

    /// Joint transform from a translation and the xyz part of a unit quaternion
    ///
    /// The missing w is rebuilt as `-sqrt(1 - |xyz|^2)`, or zero when the
    /// remainder is not positive.
    pub fn from_joint(origin: Vec3, x: f32, y: f32, z: f32) -> Self {
        let w = crate::pose::reconstruct_w(x, y, z);
        Self::from_quat_translation([x, y, z, w], origin)
    }

    /// Concatenate: `self * other`, applying `other` first
    pub fn concat(&self, other: &Self) -> Self {
        let a = &self.rows;
        let b = &other.rows;
        let mut out = Self::ZERO;
        for r in 0..3 {
            for c in 0..3 {
                out.rows[r][c] = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
            }
            out.rows[r][3] =
                a[r][0] * b[0][3] + a[r][1] * b[1][3] + a[r][2] * b[2][3] + a[r][3];
        }
        out
    }

    /// Inverse of a rotation with uniform scale plus translation
    ///
    /// The scale is taken from the first row. Non-uniform scale or shear is
    /// not handled.
    pub fn invert_simple(&self) -> Self {
        let m = &self.rows;
        let scale = 1.0 / (m[0][0] * m[0][0] + m[0][1] * m[0][1] + m[0][2] * m[0][2]);
        let mut out = Self::ZERO;
        for r in 0..3 {
            for c in 0..3 {
                out.rows[r][c] = m[c][r] * scale;
            }
        }
        for r in 0..3 {
            out.rows[r][3] = -(m[0][3] * out.rows[r][0]
                + m[1][3] * out.rows[r][1]
                + m[2][3] * out.rows[r][2]);
        }
        out
    }

    /// Add `other * weight` to every component
    pub fn accumulate(&mut self, other: &Self, weight: f32) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
            for (v, o) in row.iter_mut().zip(other_row.iter()) {
                *v += o * weight;
            }
        }
    }

    /// Every component multiplied by `weight`
    pub fn scaled(&self, weight: f32) -> Self {
        let mut out = Self::ZERO;
        out.accumulate(self, weight);
        out
    }

    /// Remove uniform scale from the rotation part
    ///
    /// The factor is measured on the first row; translation is untouched.
    pub fn normalize3(&self) -> Self {
        let m = &self.rows;
        let len = (m[0][0] * m[0][0] + m[0][1] * m[0][1] + m[0][2] * m[0][2]).sqrt();
        let mut out = *self;
        if len > 0.0 {
            let scale = 1.0 / len;
            for row in &mut out.rows {
                row[0] *= scale;
                row[1] *= scale;
                row[2] *= scale;
            }
        }
        out
    }

    /// Transform a point (rotation, scale and translation)
    #[inline]
    pub fn transform_point(&self, v: Vec3) -> Vec3 {
        let m = &self.rows;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z + m[0][3],
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z + m[1][3],
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z + m[2][3],
        )
    }

    /// Transform a direction (no translation)
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.rows;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Translation column
    pub fn origin(&self) -> Vec3 {
        Vec3::new(self.rows[0][3], self.rows[1][3], self.rows[2][3])
    }

    /// Column `c` of the rotation part
    pub fn axis(&self, c: usize) -> Vec3 {
        Vec3::new(self.rows[0][c], self.rows[1][c], self.rows[2][c])
    }
}
