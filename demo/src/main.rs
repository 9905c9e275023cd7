use anyhow::Context;
use log::{debug, info};
use stage::math::*;
use stage::mesh::Mesh;
use stage::scene::*;
use std::time::Instant;

mod io;

const DEFAULT_FRAMES: u32 = 120;
const DT: f32 = 1.0 / 60.0;

/// Where each frame's `dt` comes from.
enum Clock {
    Fixed(f32),
    Wall(Instant),
}

impl Clock {
    fn tick(&mut self) -> f32 {
        match self {
            Clock::Fixed(dt) => *dt,
            Clock::Wall(last) => {
                let now = Instant::now();
                let dt = now.duration_since(*last).as_secs_f32();
                *last = now;
                dt
            }
        }
    }
}

struct State {
    hierarchy: Hierarchy,
    particles: ParticleSet,
    mesh: Mesh,
    camera: TransformId,
    skybox: TransformId,
    model: TransformId,
    tick: u32,
}

fn build_scene(mesh: Mesh) -> anyhow::Result<State> {
    let mut hierarchy = Hierarchy::new();

    let mut camera = Transform::from_position(Vec3::new(0.0, 1.0, 6.0));
    camera.linear_velocity = Vec3::new(0.0, 0.0, -0.5);
    let camera = hierarchy.insert(camera);
    let skybox = hierarchy.insert(Transform::new());

    let mut model = Transform::from_position(Vec3::new(0.0, 0.0, -2.0));
    model.angular_velocity = Quat::from_axis_angle(Vec3::UP, 0.8);
    model.integration = AngularIntegration::AxisAngle;
    let model = hierarchy.insert(model);

    // the nozzle sits on top of the model and spins with it
    let mut nozzle = Transform::from_position(Vec3::new(0.0, mesh.aabb().max.y, 0.0));
    nozzle.rotation = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.3);
    let nozzle = hierarchy.insert_child(model, nozzle)?;

    let mut particles = ParticleSet::new();
    let params = EmitterParams { lifetime: 1.5, frequency: 40.0, arc: 25.0, initial_speed: 2.0 };
    particles.add(ParticleSystem::new(nozzle, 64, params)?);

    Ok(State { hierarchy, particles, mesh, camera, skybox, model, tick: 0 })
}

fn step(state: &mut State, dt: f32) -> anyhow::Result<()> {
    let order = state.hierarchy.update_order().to_vec();
    for id in order {
        if id == state.skybox {
            let eye = state.hierarchy.world(state.camera)?.translation();
            state.hierarchy.get_mut(id)?.position = eye;
        }
        state.hierarchy.compute_world_matrix(id, dt)?;
    }
    state.particles.update(&state.hierarchy, dt)?;
    state.tick += 1;
    Ok(())
}

fn upload(state: &State) -> anyhow::Result<usize> {
    let mut bytes = state.mesh.vertex_bytes().len() + state.mesh.index_bytes().len();
    for id in [state.skybox, state.model] {
        let block = PerModelBlock::new(&state.hierarchy.world(id)?, Vec4::new(1.0, 1.0, 1.0, 1.0));
        bytes += block.as_bytes().len();
    }
    for system in state.particles.iter() {
        bytes += system.bytes().len();
    }
    Ok(bytes)
}

pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // usage: demo [--wall-clock] [mesh.obj] [frames]
    let (flags, args): (Vec<String>, Vec<String>) = std::env::args().skip(1).partition(|a| a.starts_with("--"));
    let mut clock = match flags.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => Clock::Fixed(DT),
        ["--wall-clock"] => Clock::Wall(Instant::now()),
        other => anyhow::bail!("unknown options {other:?}"),
    };
    let mut args = args.into_iter();
    let mesh = match args.next() {
        Some(path) => io::load_obj(path)?,
        None => io::load_fallback()?,
    };
    let frames = match args.next() {
        Some(n) => n.parse::<u32>().with_context(|| format!("invalid frame count '{n}'"))?,
        None => DEFAULT_FRAMES,
    };
    info!("mesh: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());

    let mut state = build_scene(mesh)?;
    for _ in 0..frames {
        step(&mut state, clock.tick())?;
        debug!("frame {}: {} bytes staged", state.tick, upload(&state)?);
    }

    let alive: usize = state.particles.iter().map(|s| s.alive_count()).sum();
    let spawned: u64 = state.particles.iter().map(|s| s.spawn_count()).sum();
    info!(
        "{} frames: {} particles alive, {} spawned, skybox at {:?}, {} bytes per frame",
        state.tick,
        alive,
        spawned,
        state.hierarchy.world(state.skybox)?.translation(),
        upload(&state)?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_repeats() {
        let mut clock = Clock::Fixed(DT);
        assert_eq!(clock.tick(), DT);
        assert_eq!(clock.tick(), DT);
    }

    #[test]
    fn test_wall_clock_measures_elapsed_time() {
        let mut clock = Clock::Wall(Instant::now());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let first = clock.tick();
        assert!(first >= 0.005);
        // measured from the previous tick, not from the start
        assert!(clock.tick() < first);
    }

    #[test]
    fn test_skybox_tracks_camera_through_steps() {
        let mut state = build_scene(io::load_fallback().unwrap()).unwrap();
        for _ in 0..10 {
            step(&mut state, DT).unwrap();
        }
        let camera = state.hierarchy.world(state.camera).unwrap().translation();
        assert_eq!(state.hierarchy.world(state.skybox).unwrap().translation(), camera);
    }
}
