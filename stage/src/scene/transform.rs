use crate::math::*;

/// How the rotation pivot frame is built from `rotation_origin`.
///
/// Three conventions exist in the wild. `Local` conjugates the rotation with
/// `T(origin)`, which leaves `-origin` fixed. `AboutOrigin` conjugates the
/// other way round and leaves `origin` itself fixed, matching how
/// `scale_origin` is applied. `ParentTranslated` folds the parent's and the
/// node's own translation into the `Local` pivot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PivotMode {
    /// `rotate = T(-origin) * R * T(origin)`, fixed point `-origin`
    #[default]
    Local,
    /// `rotate = T(origin) * R * T(-origin)`, fixed point `origin`
    AboutOrigin,
    /// `P = parentTranslate * translate * T(origin)`, `rotate = P^-1 * R * P`
    ParentTranslated,
}

/// How `angular_velocity` is applied to `rotation` each update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AngularIntegration {
    /// `rotation = slerp(rotation, rotation * angular_velocity, dt)`.
    ///
    /// `dt` is used as an interpolation fraction. Because slerp follows the
    /// shortest arc, a per-second rotation of more than half a turn ends up
    /// spinning the other way.
    #[default]
    Slerp,
    /// `angular_velocity` is read as axis and angle per second and scaled by `dt`.
    AxisAngle,
}

/// Cached matrices of the parent a node composes against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParentFrame {
    pub world: Mat44,
    pub translate: Mat44,
}

impl ParentFrame {
    pub const ROOT: ParentFrame = ParentFrame { world: Mat44::identity(), translate: Mat44::identity() };
}

/// Position, rotation and scale of a scene entity plus the matrices derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Offset of the rotation pivot frame, see [`PivotMode`] for which point stays fixed.
    pub rotation_origin: Vec3,
    /// Point the scale is applied about.
    pub scale_origin: Vec3,
    /// Units per second.
    pub linear_velocity: Vec3,
    /// Rotation per second.
    pub angular_velocity: Quat,
    pub pivot_mode: PivotMode,
    pub integration: AngularIntegration,

    translate: Mat44,
    local: Mat44,
    world: Mat44,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::identity(),
            scale: Vec3::ONE,
            rotation_origin: Vec3::ZERO,
            scale_origin: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Quat::identity(),
            pivot_mode: PivotMode::default(),
            integration: AngularIntegration::default(),
            translate: Mat44::identity(),
            local: Mat44::identity(),
            world: Mat44::identity(),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    /// Translation matrix of `position` as of the last update.
    pub fn translate_matrix(&self) -> Mat44 {
        self.translate
    }

    /// `translate * rotate * scale` as of the last update.
    pub fn local_matrix(&self) -> Mat44 {
        self.local
    }

    /// `parentWorld * local` as of the last update.
    pub fn world_matrix(&self) -> Mat44 {
        self.world
    }

    /// Advances position and rotation by `dt` seconds.
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.linear_velocity * dt;
        self.rotation = match self.integration {
            AngularIntegration::Slerp => self.rotation.slerp(self.rotation * self.angular_velocity, dt),
            AngularIntegration::AxisAngle => {
                let (axis, angle) = self.angular_velocity.to_axis_angle();
                self.rotation * Quat::from_axis_angle(axis, angle * dt)
            }
        };
    }

    /// Rebuilds the cached matrices against `parent` without integrating.
    pub fn compose(&mut self, parent: &ParentFrame) -> Mat44 {
        self.translate = Mat44::translate(self.position);

        // The pivot frame is a pure translation in every mode, so its inverse is exact.
        let pivot = match self.pivot_mode {
            PivotMode::Local => self.rotation_origin,
            PivotMode::AboutOrigin => -self.rotation_origin,
            PivotMode::ParentTranslated => parent.translate.translation() + self.position + self.rotation_origin,
        };
        let rotate = Mat44::translate(-pivot) * self.rotation.to_mat44() * Mat44::translate(pivot);

        let scale = Mat44::translate(self.scale_origin)
            * Mat44::scale_non_uniform(self.scale)
            * Mat44::translate(-self.scale_origin);

        self.local = self.translate * rotate * scale;
        self.world = parent.world * self.local;
        self.world
    }

    /// One per-frame step: integrate, then compose against `parent`.
    pub fn update(&mut self, parent: &ParentFrame, dt: f32) -> Mat44 {
        self.integrate(dt);
        self.compose(parent)
    }

    pub fn as_parent_frame(&self) -> ParentFrame {
        ParentFrame { world: self.world, translate: self.translate }
    }
}
