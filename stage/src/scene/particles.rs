//! Fixed-capacity particle emitters.
//!
//! Slots are handed out in ring order. Once the ring wraps, a new particle
//! overwrites whatever lives in the next slot, alive or not. Expired
//! particles are only marked dead, their slot is reused when the cursor
//! comes back round.

use bytemuck::{Pod, Zeroable};
use log::{trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::gpu::StagingBuffer;
use crate::math::*;
use crate::scene::hierarchy::*;

/// Age of a dead, available slot.
pub const DEAD_AGE: f32 = -1.0;
/// Size of one particle in the GPU buffer, in bytes.
pub const PARTICLE_STRIDE: usize = std::mem::size_of::<Particle>();
pub const POSITION_AGE_OFFSET: usize = std::mem::offset_of!(Particle, position_age);
pub const COLOR_OFFSET: usize = std::mem::offset_of!(Particle, color);
/// Velocity is uploaded along with the rest but only read on the CPU.
pub const VELOCITY_OFFSET: usize = std::mem::offset_of!(Particle, velocity);

const COLOR_RADIUS: f32 = 0.5;
const COLOR_CENTER: Vec3 = Vec3::splat(0.5);

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// World position in xyz, age in seconds in w, negative when dead.
    pub position_age: Vec4,
    pub color: Vec3,
    pub velocity: Vec3,
}

impl Default for Particle {
    fn default() -> Self {
        Self { position_age: Vec4::new(0.0, 0.0, 0.0, DEAD_AGE), color: Vec3::ZERO, velocity: Vec3::ZERO }
    }
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        self.position_age.w >= 0.0
    }

    pub fn age(&self) -> f32 {
        self.position_age.w
    }

    pub fn position(&self) -> Vec3 {
        self.position_age.xyz()
    }
}

/// Emission settings of a [`ParticleSystem`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterParams {
    /// Seconds a particle stays alive.
    pub lifetime: f32,
    /// Particles emitted per second. Zero or less disables emission.
    pub frequency: f32,
    /// Half-angle of the emission cone around the emitter's local +Y, in degrees.
    pub arc: f32,
    /// Speed of a freshly emitted particle, units per second.
    pub initial_speed: f32,
}

impl Default for EmitterParams {
    fn default() -> Self {
        Self { lifetime: 2.0, frequency: 10.0, arc: 30.0, initial_speed: 1.0 }
    }
}

pub struct ParticleSystem {
    transform: TransformId,
    params: EmitterParams,
    particles: Vec<Particle>,
    buffer: StagingBuffer<Particle>,
    time_since_last_emission: f32,
    next_available_particle: usize,
    spawn_count: u64,
    rng: StdRng,
}

impl ParticleSystem {
    /// `capacity` is fixed for the lifetime of the system and must be non-zero.
    pub fn new(transform: TransformId, capacity: usize, params: EmitterParams) -> Result<Self> {
        Self::with_rng(transform, capacity, params, StdRng::from_os_rng())
    }

    /// Same as [`ParticleSystem::new`] with a reproducible random sequence.
    pub fn with_seed(transform: TransformId, capacity: usize, params: EmitterParams, seed: u64) -> Result<Self> {
        Self::with_rng(transform, capacity, params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(transform: TransformId, capacity: usize, params: EmitterParams, rng: StdRng) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        let particles = vec![Particle::default(); capacity];
        let buffer = StagingBuffer::from_slice(&particles);
        Ok(Self {
            transform,
            params,
            particles,
            buffer,
            time_since_last_emission: 0.0,
            next_available_particle: 0,
            spawn_count: 0,
            rng,
        })
    }

    /// The transform this system emits from.
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn params(&self) -> &EmitterParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut EmitterParams {
        &mut self.params
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn alive_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    /// Slot the next emitted particle goes into.
    pub fn next_slot(&self) -> usize {
        self.next_available_particle
    }

    /// Total number of particles emitted since construction.
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count
    }

    /// The GPU-facing mirror as of the last [`ParticleSystem::update`].
    pub fn buffer(&self) -> &StagingBuffer<Particle> {
        &self.buffer
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_u8_slice()
    }

    /// Spawns one particle at the emitter origin into the ring cursor's slot and returns the slot.
    pub fn emit(&mut self, world: &Mat44) -> usize {
        let slot = self.next_available_particle;
        let origin = world.transform_point(Vec3::ZERO);
        let color = self.random_color();
        let direction = self.random_direction();
        let rotated = world.rotate_vector(direction).normalized();
        let direction = if rotated == Vec3::ZERO { direction } else { rotated };

        self.particles[slot] = Particle {
            position_age: Vec4::new(origin.x, origin.y, origin.z, 0.0),
            color,
            velocity: direction * self.params.initial_speed,
        };
        self.next_available_particle = (slot + 1) % self.particles.len();
        self.spawn_count = self.spawn_count.saturating_add(1);
        slot
    }

    /// Emits what is due after `dt` seconds, ages every live particle and refreshes the GPU mirror.
    ///
    /// `world` is the emitter transform's world matrix for this frame. A
    /// non-finite `dt` is ignored and clears the emission accumulator.
    pub fn update(&mut self, world: &Mat44, dt: f32) {
        if !dt.is_finite() {
            warn!("particle system {:?}: ignoring non-finite dt {}", self.transform, dt);
            self.time_since_last_emission = 0.0;
            return;
        }

        let emitted = self.emit_due(world, dt);

        let lifetime = self.params.lifetime;
        for p in self.particles.iter_mut().filter(|p| p.is_alive()) {
            let step = p.velocity * dt;
            p.position_age += Vec4::new(step.x, step.y, step.z, dt);
            if p.position_age.w > lifetime {
                p.position_age.w = DEAD_AGE;
            }
        }

        self.buffer.copy_from(&self.particles);
        trace!("particle system {:?}: emitted {}, {} alive", self.transform, emitted, self.alive_count());
    }

    // Spawns are counted, not looped over: only the last `capacity` of them
    // survive the ring, so earlier ones just advance the cursor.
    fn emit_due(&mut self, world: &Mat44, dt: f32) -> u64 {
        let frequency = self.params.frequency;
        if !(frequency > 0.0 && frequency.is_finite()) {
            self.time_since_last_emission = 0.0;
            return 0;
        }

        let period = 1.0 / frequency;
        let acc = self.time_since_last_emission + dt;
        if acc < period {
            self.time_since_last_emission = acc.max(0.0);
            return 0;
        }
        let due = (acc / period).floor();
        self.time_since_last_emission = (acc - due * period).clamp(0.0, period);
        let due = due as u64;

        let capacity = self.particles.len() as u64;
        let written = due.min(capacity);
        let skipped = due - written;
        self.next_available_particle = ((self.next_available_particle as u64 + skipped % capacity) % capacity) as usize;
        self.spawn_count = self.spawn_count.saturating_add(skipped);
        for _ in 0..written {
            self.emit(world);
        }
        due
    }

    // uniform inside a ball of COLOR_RADIUS around mid-gray
    fn random_color(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
                self.rng.random_range(-1.0..=1.0),
            );
            if dot(v, v) <= 1.0 {
                return COLOR_CENTER + v * COLOR_RADIUS;
            }
        }
    }

    // uniform over the spherical cap of half-angle `arc` around +Y
    fn random_direction(&mut self) -> Vec3 {
        let arc = if self.params.arc.is_finite() { self.params.arc } else { 0.0 };
        let cos_min = arc.to_radians().clamp(0.0, std::f32::consts::PI).cos();
        let cos_theta: f32 = self.rng.random_range(cos_min..=1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi: f32 = self.rng.random_range(0.0..std::f32::consts::TAU);
        Vec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin())
    }
}

/// Index of a system inside a [`ParticleSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleSystemId(usize);

/// All particle systems of a scene, updated together after the hierarchy.
#[derive(Default)]
pub struct ParticleSet {
    systems: Vec<ParticleSystem>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: ParticleSystem) -> ParticleSystemId {
        self.systems.push(system);
        ParticleSystemId(self.systems.len() - 1)
    }

    pub fn get(&self, id: ParticleSystemId) -> Option<&ParticleSystem> {
        self.systems.get(id.0)
    }

    pub fn get_mut(&mut self, id: ParticleSystemId) -> Option<&mut ParticleSystem> {
        self.systems.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleSystem> {
        self.systems.iter()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Advances every system with its emitter's world matrix from `hierarchy`.
    ///
    /// `hierarchy` must already have been updated for this frame.
    pub fn update(&mut self, hierarchy: &Hierarchy, dt: f32) -> Result<()> {
        for system in &mut self.systems {
            let world = hierarchy.world(system.transform)?;
            system.update(&world, dt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::transform::Transform;
    use rstest::rstest;

    fn emitter() -> (Hierarchy, TransformId) {
        let mut h = Hierarchy::new();
        let id = h.insert(Transform::new());
        (h, id)
    }

    fn system(capacity: usize, params: EmitterParams) -> ParticleSystem {
        let (_, id) = emitter();
        ParticleSystem::with_seed(id, capacity, params, 7).unwrap()
    }

    #[test]
    fn test_layout() {
        assert_eq!(PARTICLE_STRIDE, 40);
        assert_eq!(POSITION_AGE_OFFSET, 0);
        assert_eq!(COLOR_OFFSET, 16);
        assert_eq!(VELOCITY_OFFSET, 28);
    }

    #[test]
    fn test_new_starts_dead() {
        let s = system(8, EmitterParams::default());
        assert_eq!(s.capacity(), 8);
        assert_eq!(s.alive_count(), 0);
        assert!(s.particles().iter().all(|p| p.age() == DEAD_AGE));
        assert_eq!(s.bytes().len(), 8 * PARTICLE_STRIDE);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (_, id) = emitter();
        assert_eq!(ParticleSystem::new(id, 0, EmitterParams::default()).err(), Some(Error::InvalidCapacity));
    }

    #[test]
    fn test_emit_resets_age_and_places_at_origin() {
        let mut s = system(4, EmitterParams { initial_speed: 3.0, ..EmitterParams::default() });
        let world = Mat44::translate(Vec3::new(1.0, 2.0, 3.0));
        let slot = s.emit(&world);
        let p = s.particles()[slot];
        assert_eq!(slot, 0);
        assert_eq!(p.age(), 0.0);
        assert_eq!(p.position(), Vec3::new(1.0, 2.0, 3.0));
        assert!((p.velocity.length() - 3.0).abs() < 1e-4);
        assert_eq!(s.next_slot(), 1);
        assert_eq!(s.spawn_count(), 1);
    }

    #[test]
    fn test_colors_stay_in_ball() {
        let mut s = system(64, EmitterParams::default());
        for _ in 0..64 {
            s.emit(&Mat44::identity());
        }
        for p in s.particles() {
            assert!((p.color - COLOR_CENTER).length() <= COLOR_RADIUS + 1e-5);
        }
    }

    #[rstest]
    #[case(0.0)]
    #[case(15.0)]
    #[case(45.0)]
    #[case(90.0)]
    fn test_directions_stay_in_cone(#[case] arc: f32) {
        let mut s = system(128, EmitterParams { arc, initial_speed: 1.0, ..EmitterParams::default() });
        let cos_min = arc.to_radians().cos();
        for _ in 0..128 {
            s.emit(&Mat44::identity());
        }
        for p in s.particles() {
            assert!(dot(p.velocity.normalized(), Vec3::UP) >= cos_min - 1e-4);
        }
    }

    #[test]
    fn test_direction_follows_emitter_rotation() {
        let mut s = system(16, EmitterParams { arc: 0.0, initial_speed: 2.0, ..EmitterParams::default() });
        // +Y turned onto -X
        let world = Mat44::rotate_xy(std::f32::consts::FRAC_PI_2) * Mat44::scale_uniform(5.0);
        let slot = s.emit(&world);
        let v = s.particles()[slot].velocity;
        assert!((v - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_update_emits_by_frequency() {
        let mut s = system(100, EmitterParams { frequency: 10.0, lifetime: 100.0, ..EmitterParams::default() });
        s.update(&Mat44::identity(), 0.05);
        assert_eq!(s.spawn_count(), 0);
        s.update(&Mat44::identity(), 0.06);
        assert_eq!(s.spawn_count(), 1);
        // a long frame emits several at once
        s.update(&Mat44::identity(), 0.5);
        assert_eq!(s.spawn_count(), 6);
        assert_eq!(s.alive_count(), 6);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f32::NAN)]
    fn test_non_positive_frequency_never_emits(#[case] frequency: f32) {
        let mut s = system(10, EmitterParams { frequency, ..EmitterParams::default() });
        for _ in 0..10 {
            s.update(&Mat44::identity(), 1.0);
        }
        assert_eq!(s.spawn_count(), 0);
    }

    #[rstest]
    #[case(1e9, 1.0)]
    #[case(1000.0, 1e5)]
    fn test_large_backlog_is_counted_not_replayed(#[case] frequency: f32, #[case] dt: f32) {
        let mut s = system(8, EmitterParams { frequency, lifetime: f32::MAX, ..EmitterParams::default() });
        s.update(&Mat44::identity(), dt);
        let expected = (frequency as f64 * dt as f64) as u64;
        assert!(s.spawn_count().abs_diff(expected) <= expected / 1000);
        assert_eq!(s.alive_count(), 8);
        assert_eq!(s.next_slot() as u64, s.spawn_count() % 8);
        assert!(s.particles().iter().all(|p| p.age() == dt));

        // the leftover stays below one period and emission carries on normally
        let before = s.spawn_count();
        s.update(&Mat44::identity(), 0.5 / frequency);
        assert!(s.spawn_count() - before <= 1);
    }

    #[test]
    fn test_backlog_keeps_ring_order() {
        let mut s = system(4, EmitterParams { frequency: 10.0, lifetime: 100.0, ..EmitterParams::default() });
        s.emit(&Mat44::identity());
        // 0.95 s at 10 Hz: 9 due, the first 5 only advance the cursor
        s.update(&Mat44::identity(), 0.95);
        assert_eq!(s.spawn_count(), 10);
        assert_eq!(s.next_slot(), 2);
        assert_eq!(s.alive_count(), 4);
        assert!(s.particles().iter().all(|p| p.age() == 0.95));
    }

    #[rstest]
    #[case(f32::NAN)]
    #[case(f32::INFINITY)]
    fn test_non_finite_dt_is_ignored(#[case] dt: f32) {
        let mut s = system(4, EmitterParams { frequency: 10.0, lifetime: 100.0, ..EmitterParams::default() });
        s.update(&Mat44::identity(), 0.15);
        let before = s.particles().to_vec();
        s.update(&Mat44::identity(), dt);
        assert_eq!(s.particles(), before.as_slice());
        // the accumulator was cleared, not poisoned
        s.update(&Mat44::identity(), 0.1);
        assert_eq!(s.spawn_count(), 2);
        assert!(s.particles().iter().all(|p| p.position_age.x.is_finite() && p.age().is_finite()));
    }

    #[test]
    fn test_non_uniform_scale_keeps_cone() {
        let arc = 30.0f32;
        let mut s = system(256, EmitterParams { arc, ..EmitterParams::default() });
        let world = Mat44::scale_non_uniform(Vec3::new(10.0, 1.0, 10.0));
        for _ in 0..256 {
            s.emit(&world);
        }
        let cos_min = arc.to_radians().cos();
        for p in s.particles() {
            assert!(dot(p.velocity.normalized(), Vec3::UP) >= cos_min - 1e-4);
            assert!((p.velocity.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_aging_moves_and_expires() {
        let mut s = system(1, EmitterParams { lifetime: 1.0, frequency: 0.0, arc: 0.0, initial_speed: 2.0 });
        s.emit(&Mat44::identity());
        s.update(&Mat44::identity(), 0.5);
        let p = s.particles()[0];
        assert_eq!(p.age(), 0.5);
        assert!((p.position() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);

        s.update(&Mat44::identity(), 0.5);
        assert_eq!(s.particles()[0].age(), 1.0);
        assert!(s.particles()[0].is_alive());

        s.update(&Mat44::identity(), 0.25);
        assert_eq!(s.particles()[0].age(), DEAD_AGE);

        // dead particles stay put
        let before = s.particles()[0];
        s.update(&Mat44::identity(), 0.25);
        assert_eq!(s.particles()[0], before);
    }

    #[test]
    fn test_buffer_mirrors_particles() {
        let mut s = system(4, EmitterParams { frequency: 10.0, ..EmitterParams::default() });
        s.update(&Mat44::translate(Vec3::new(0.0, 0.0, -2.0)), 0.25);
        assert_eq!(s.buffer().as_slice(), s.particles());
        let first: &[f32] = bytemuck::cast_slice(&s.bytes()[0..16]);
        assert_eq!(first[3], s.particles()[0].age());
    }

    #[test]
    fn test_set_feeds_each_system_its_world() {
        let mut h = Hierarchy::new();
        let a = h.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let b = h.insert(Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        let params = EmitterParams { frequency: 1.0, lifetime: 10.0, initial_speed: 0.0, arc: 0.0 };
        let mut set = ParticleSet::new();
        let sa = set.add(ParticleSystem::with_seed(a, 4, params, 1).unwrap());
        let sb = set.add(ParticleSystem::with_seed(b, 4, params, 2).unwrap());

        h.update(0.0).unwrap();
        set.update(&h, 1.0).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(sa).unwrap().particles()[0].position(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(set.get(sb).unwrap().particles()[0].position(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_set_reports_stale_emitter_transform() {
        let mut h = Hierarchy::new();
        let a = h.insert(Transform::new());
        let mut set = ParticleSet::new();
        set.add(ParticleSystem::with_seed(a, 1, EmitterParams::default(), 0).unwrap());
        h.remove(a).unwrap();
        assert_eq!(set.update(&h, 0.1), Err(Error::StaleHandle(a)));
    }
}
