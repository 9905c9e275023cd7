use crate::math::*;
use bytemuck::{Pod, Zeroable};

/// Row-major 4x4 matrix, `m[3]`, `m[7]`, `m[11]` hold the translation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat44(pub [f32; 16]);

impl Default for Mat44 {
    fn default() -> Self {
        Mat44::identity()
    }
}

impl Mat44 {
    pub const fn identity() -> Mat44 {
        Mat44([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn scale_uniform(s: f32) -> Mat44 {
        Mat44::scale_non_uniform(Vec3::splat(s))
    }

    pub fn scale_non_uniform(s: Vec3) -> Mat44 {
        Mat44([
            s.x, 0.0, 0.0, 0.0, //
            0.0, s.y, 0.0, 0.0, //
            0.0, 0.0, s.z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn translate(t: Vec3) -> Mat44 {
        Mat44([
            1.0, 0.0, 0.0, t.x, //
            0.0, 1.0, 0.0, t.y, //
            0.0, 0.0, 1.0, t.z, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotate_xy(angle: f32) -> Mat44 {
        let cos = angle.cos();
        let sin = angle.sin();
        Mat44([
            cos, -sin, 0.0, 0.0, //
            sin, cos, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotate_yz(angle: f32) -> Mat44 {
        let cos = angle.cos();
        let sin = angle.sin();
        Mat44([
            1.0, 0.0, 0.0, 0.0, //
            0.0, cos, -sin, 0.0, //
            0.0, sin, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotate_zx(angle: f32) -> Mat44 {
        let cos = angle.cos();
        let sin = angle.sin();
        Mat44([
            cos, 0.0, sin, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            -sin, 0.0, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation matrix of a unit quaternion.
    pub fn from_quat(q: Quat) -> Mat44 {
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        Mat44([
            1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz), 2.0 * (xz + wy), 0.0, //
            2.0 * (xy + wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx), 0.0, //
            2.0 * (xz - wy), 2.0 * (yz + wx), 1.0 - 2.0 * (xx + yy), 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn transposed(&self) -> Mat44 {
        let m = &self.0;
        Mat44([
            m[0], m[4], m[8], m[12], //
            m[1], m[5], m[9], m[13], //
            m[2], m[6], m[10], m[14], //
            m[3], m[7], m[11], m[15],
        ])
    }

    /// Column-major flattening, the layout GLSL expects for a `mat4` uniform.
    pub fn to_cols_array(&self) -> [f32; 16] {
        self.transposed().0
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.0[3], self.0[7], self.0[11])
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        (*self * p.as_point4()).xyz()
    }

    /// Applies the upper 3x3 only, translation is ignored.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        (*self * v.as_vector4()).xyz()
    }

    /// Applies only the rotation of the upper 3x3: each basis column is
    /// normalized first, so scale, uniform or not, does not bend `v`.
    /// Degenerate (zero-scale) columns contribute nothing.
    pub fn rotate_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        let x = Vec3::new(m[0], m[4], m[8]).normalized();
        let y = Vec3::new(m[1], m[5], m[9]).normalized();
        let z = Vec3::new(m[2], m[6], m[10]).normalized();
        x * v.x + y * v.y + z * v.z
    }

    pub fn approx_eq(&self, other: &Mat44, eps: f32) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| (a - b).abs() <= eps)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Returns the identity for singular input.
    pub fn inverse(&self) -> Mat44 {
        let a = &self.0;

        let mut inv = Mat44::identity();
        let o = &mut inv.0;

        o[0] = a[5] * a[10] * a[15] - a[5] * a[11] * a[14] - a[9] * a[6] * a[15]
            + a[9] * a[7] * a[14]
            + a[13] * a[6] * a[11]
            - a[13] * a[7] * a[10];

        o[1] = -a[1] * a[10] * a[15] + a[1] * a[11] * a[14] + a[9] * a[2] * a[15]
            - a[9] * a[3] * a[14]
            - a[13] * a[2] * a[11]
            + a[13] * a[3] * a[10];

        o[2] =
            a[1] * a[6] * a[15] - a[1] * a[7] * a[14] - a[5] * a[2] * a[15] + a[5] * a[3] * a[14] + a[13] * a[2] * a[7]
                - a[13] * a[3] * a[6];

        o[3] =
            -a[1] * a[6] * a[11] + a[1] * a[7] * a[10] + a[5] * a[2] * a[11] - a[5] * a[3] * a[10] - a[9] * a[2] * a[7]
                + a[9] * a[3] * a[6];

        o[4] = -a[4] * a[10] * a[15] + a[4] * a[11] * a[14] + a[8] * a[6] * a[15]
            - a[8] * a[7] * a[14]
            - a[12] * a[6] * a[11]
            + a[12] * a[7] * a[10];

        o[5] = a[0] * a[10] * a[15] - a[0] * a[11] * a[14] - a[8] * a[2] * a[15]
            + a[8] * a[3] * a[14]
            + a[12] * a[2] * a[11]
            - a[12] * a[3] * a[10];

        o[6] = -a[0] * a[6] * a[15] + a[0] * a[7] * a[14] + a[4] * a[2] * a[15]
            - a[4] * a[3] * a[14]
            - a[12] * a[2] * a[7]
            + a[12] * a[3] * a[6];

        o[7] =
            a[0] * a[6] * a[11] - a[0] * a[7] * a[10] - a[4] * a[2] * a[11] + a[4] * a[3] * a[10] + a[8] * a[2] * a[7]
                - a[8] * a[3] * a[6];

        o[8] = a[4] * a[9] * a[15] - a[4] * a[11] * a[13] - a[8] * a[5] * a[15]
            + a[8] * a[7] * a[13]
            + a[12] * a[5] * a[11]
            - a[12] * a[7] * a[9];

        o[9] = -a[0] * a[9] * a[15] + a[0] * a[11] * a[13] + a[8] * a[1] * a[15]
            - a[8] * a[3] * a[13]
            - a[12] * a[1] * a[11]
            + a[12] * a[3] * a[9];

        o[10] =
            a[0] * a[5] * a[15] - a[0] * a[7] * a[13] - a[4] * a[1] * a[15] + a[4] * a[3] * a[13] + a[12] * a[1] * a[7]
                - a[12] * a[3] * a[5];

        o[11] =
            -a[0] * a[5] * a[11] + a[0] * a[7] * a[9] + a[4] * a[1] * a[11] - a[4] * a[3] * a[9] - a[8] * a[1] * a[7]
                + a[8] * a[3] * a[5];

        o[12] = -a[4] * a[9] * a[14] + a[4] * a[10] * a[13] + a[8] * a[5] * a[14]
            - a[8] * a[6] * a[13]
            - a[12] * a[5] * a[10]
            + a[12] * a[6] * a[9];

        o[13] = a[0] * a[9] * a[14] - a[0] * a[10] * a[13] - a[8] * a[1] * a[14]
            + a[8] * a[2] * a[13]
            + a[12] * a[1] * a[10]
            - a[12] * a[2] * a[9];

        o[14] = -a[0] * a[5] * a[14] + a[0] * a[6] * a[13] + a[4] * a[1] * a[14]
            - a[4] * a[2] * a[13]
            - a[12] * a[1] * a[6]
            + a[12] * a[2] * a[5];

        o[15] =
            a[0] * a[5] * a[10] - a[0] * a[6] * a[9] - a[4] * a[1] * a[10] + a[4] * a[2] * a[9] + a[8] * a[1] * a[6]
                - a[8] * a[2] * a[5];

        let det = a[0] * o[0] + a[1] * o[4] + a[2] * o[8] + a[3] * o[12];

        if det == 0.0 || !det.is_finite() {
            return Mat44::identity();
        }

        let inv_det = 1.0 / det;
        for o in o.iter_mut() {
            *o *= inv_det;
        }

        inv
    }
}

// Vec4 = Mat44 * Vec4
impl std::ops::Mul<Vec4> for Mat44 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        let m = &self.0;
        Vec4 {
            x: m[0] * v.x + m[1] * v.y + m[2] * v.z + m[3] * v.w,
            y: m[4] * v.x + m[5] * v.y + m[6] * v.z + m[7] * v.w,
            z: m[8] * v.x + m[9] * v.y + m[10] * v.z + m[11] * v.w,
            w: m[12] * v.x + m[13] * v.y + m[14] * v.z + m[15] * v.w,
        }
    }
}

// Mat44 = &Mat44 * &Mat44
impl std::ops::Mul<&Mat44> for &Mat44 {
    type Output = Mat44;

    fn mul(self, other: &Mat44) -> Mat44 {
        let mut result = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    result[4 * i + j] += self.0[4 * i + k] * other.0[4 * k + j];
                }
            }
        }
        Mat44(result)
    }
}

// Mat44 = Mat44 * Mat44
impl std::ops::Mul for Mat44 {
    type Output = Mat44;

    fn mul(self, other: Mat44) -> Mat44 {
        &self * &other
    }
}
