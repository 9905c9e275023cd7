use crate::math::*;
use bytemuck::{Pod, Zeroable};

/// Below this angle slerp degenerates into a normalized lerp.
const SLERP_LINEAR_THRESHOLD: f32 = 1.0 - 1e-6;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Quat::identity()
    }
}

impl Quat {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Quat {
        Quat { x, y, z, w }
    }

    pub const fn identity() -> Quat {
        Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// `axis` is expected to be normalized, `angle` is in radians.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Quat {
        let half = angle * 0.5;
        let sin = half.sin();
        let cos = half.cos();
        Quat { x: axis.x * sin, y: axis.y * sin, z: axis.z * sin, w: cos }
    }

    /// Inverse of the rotation part: angle in [0, 2*PI], axis defaults to +X for the identity.
    pub fn to_axis_angle(self) -> (Vec3, f32) {
        let q = self.normalized();
        let w = q.w.clamp(-1.0, 1.0);
        let angle = 2.0 * w.acos();
        let s = (1.0 - w * w).sqrt();
        if s < 1e-6 {
            (Vec3::new(1.0, 0.0, 0.0), angle)
        } else {
            (Vec3::new(q.x / s, q.y / s, q.z / s), angle)
        }
    }

    /// Conjugate, which is the inverse for unit quaternions.
    pub fn inverse(self) -> Quat {
        Quat { x: -self.x, y: -self.y, z: -self.z, w: self.w }
    }

    pub fn length(self) -> f32 {
        dot(self, self).sqrt()
    }

    pub fn normalized(self) -> Quat {
        let len = self.length();
        if len == 0.0 {
            Quat::identity()
        } else {
            let inv_len = 1.0 / len;
            Quat { x: self.x * inv_len, y: self.y * inv_len, z: self.z * inv_len, w: self.w * inv_len }
        }
    }

    /// Rotation scaled by `t` along its own axis, i.e. q^t.
    pub fn pow(self, t: f32) -> Quat {
        let (axis, angle) = self.to_axis_angle();
        Quat::from_axis_angle(axis, angle * t)
    }

    /// Spherical interpolation along the shortest arc, `t` is not clamped.
    pub fn slerp(self, to: Quat, t: f32) -> Quat {
        let mut to = to;
        let mut cos = dot(self, to);
        if cos < 0.0 {
            to = to.scaled(-1.0);
            cos = -cos;
        }

        if cos > SLERP_LINEAR_THRESHOLD {
            return self.scaled(1.0 - t).added(to.scaled(t)).normalized();
        }

        let angle = cos.acos();
        let sin = angle.sin();
        let a = ((1.0 - t) * angle).sin() / sin;
        let b = (t * angle).sin() / sin;
        self.scaled(a).added(to.scaled(b))
    }

    pub fn to_mat44(self) -> Mat44 {
        Mat44::from_quat(self)
    }

    fn scaled(self, s: f32) -> Quat {
        Quat { x: self.x * s, y: self.y * s, z: self.z * s, w: self.w * s }
    }

    fn added(self, o: Quat) -> Quat {
        Quat { x: self.x + o.x, y: self.y + o.y, z: self.z + o.z, w: self.w + o.w }
    }
}

impl Dot for Quat {
    fn dot(self, rhs: Quat) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }
}

// Quat * Quat, applies rhs first
impl std::ops::Mul for Quat {
    type Output = Quat;

    fn mul(self, rhs: Quat) -> Quat {
        Quat {
            x: self.w * rhs.x + rhs.w * self.x + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y + rhs.w * self.y + self.z * rhs.x - self.x * rhs.z,
            z: self.w * rhs.z + rhs.w * self.z + self.x * rhs.y - self.y * rhs.x,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

// Quat * Vec3
impl std::ops::Mul<Vec3> for Quat {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Vec3 {
        let tx = 2.0 * (self.y * v.z - self.z * v.y);
        let ty = 2.0 * (self.z * v.x - self.x * v.z);
        let tz = 2.0 * (self.x * v.y - self.y * v.x);

        Vec3 {
            x: v.x + self.w * tx + (self.y * tz - self.z * ty),
            y: v.y + self.w * ty + (self.z * tx - self.x * tz),
            z: v.z + self.w * tz + (self.x * ty - self.y * tx),
        }
    }
}
