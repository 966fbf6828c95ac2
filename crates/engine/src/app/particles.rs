//! Ring emitters feeding bitmap particle systems.
//!
//! A particle system is drawn through an ordinary entity placed on a layer;
//! emitters follow another entity and spawn particles on a circle around it.
//! Both are advanced by the reactor.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use fastrand::Rng;

use super::assets::Bitmap;
use super::context::SceneContext;
use super::node::{Color, EntityId};
use super::reactor::TickTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleSystemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub age: f32,
    pub life: f32,
    pub fade_time: f32,
    pub fade_in: f32,
    pub scale: f32,
    pub scale_delta: f32,
    pub alpha: f32,
    pub color: Color,
}

impl Particle {
    /// Ages the particle; returns false once it expired.
    fn step(&mut self, dt: f32) -> bool {
        self.age += dt;
        if self.age >= self.life {
            return false;
        }
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        self.scale += self.scale_delta * dt;
        if self.fade_time > 0.0 && self.age > self.life - self.fade_time {
            self.alpha = (255.0 * ((self.life - self.age) / self.fade_time).max(0.0)).trunc();
        } else if self.fade_in > 0.0 && self.age < self.fade_in {
            self.alpha = (255.0 * (self.age / self.fade_in).min(1.0)).trunc();
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    entity: EntityId,
    shape: Option<Bitmap>,
    particles: Vec<Particle>,
}

impl ParticleSystem {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn shape(&self) -> Option<&Bitmap> {
        self.shape.as_ref()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
}

/// Emission parameters; a tweak hook may rewrite them between particles.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    pub delay: f32,
    pub num_particles: u32,
    pub life: f32,
    pub fade_time: f32,
    pub fade_in: f32,
    pub scale: (f32, f32),
    pub scale_delta: f32,
    pub alpha: f32,
    pub color: Color,
    pub velocity: f32,
    pub radius: f32,
    pub tangent: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            delay: 0.1,
            num_particles: 1,
            life: 1.0,
            fade_time: 0.0,
            fade_in: 0.0,
            scale: (1.0, 1.0),
            scale_delta: 0.0,
            alpha: 255.0,
            color: Color::WHITE,
            velocity: 0.0,
            radius: 0.0,
            tangent: false,
        }
    }
}

pub type EmitterTweak = fn(&mut EmitterConfig, &mut Rng, (u32, u32));

#[derive(Debug, Clone)]
pub struct RingEmitter {
    system: ParticleSystemId,
    node: EntityId,
    pub config: EmitterConfig,
    timer: f32,
    tweak: Option<EmitterTweak>,
}

#[derive(Debug, Default)]
pub struct ParticleStore {
    next_id: u64,
    systems: BTreeMap<ParticleSystemId, ParticleSystem>,
    emitters: BTreeMap<EmitterId, RingEmitter>,
}

impl ParticleStore {
    pub fn system(&self, id: ParticleSystemId) -> Option<&ParticleSystem> {
        self.systems.get(&id)
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&RingEmitter> {
        self.emitters.get(&id)
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn clear(&mut self) {
        self.systems.clear();
        self.emitters.clear();
    }
}

/// Uniform sample in `[min, max)`; collapses to `min` for empty ranges.
pub fn random_f32_range(rng: &mut Rng, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range < f32::EPSILON {
        return min;
    }
    min + rng.f32() * range
}

pub(crate) fn create_system(
    ctx: &mut SceneContext,
    entity: EntityId,
    shape: Option<Bitmap>,
) -> ParticleSystemId {
    let id = ParticleSystemId(ctx.particles.next());
    ctx.particles.systems.insert(
        id,
        ParticleSystem {
            entity,
            shape,
            particles: Vec::new(),
        },
    );
    ctx.reactor.add(TickTarget::Particles(id));
    id
}

pub(crate) fn create_emitter(
    ctx: &mut SceneContext,
    system: ParticleSystemId,
    node: EntityId,
    config: EmitterConfig,
    tweak: Option<EmitterTweak>,
) -> EmitterId {
    let id = EmitterId(ctx.particles.next());
    ctx.particles.emitters.insert(
        id,
        RingEmitter {
            system,
            node,
            config,
            timer: 0.0,
            tweak,
        },
    );
    ctx.reactor.add(TickTarget::Emitter(id));
    id
}

pub(crate) fn remove_emitter(ctx: &mut SceneContext, id: EmitterId) {
    ctx.particles.emitters.remove(&id);
    ctx.reactor.remove(TickTarget::Emitter(id));
}

pub(crate) fn tick_emitter(ctx: &mut SceneContext, id: EmitterId, delta: f32) {
    let Some((node_id, system_id)) = ctx
        .particles
        .emitters
        .get(&id)
        .map(|emitter| (emitter.node, emitter.system))
    else {
        ctx.reactor.remove(TickTarget::Emitter(id));
        return;
    };
    let origin = match ctx.world.get(node_id) {
        Some(node) if node.is_deleted() => None,
        Some(node) if node.hidden => return,
        Some(node) => Some((node.x, node.y)),
        None => None,
    };
    let Some((ox, oy)) = origin else {
        remove_emitter(ctx, id);
        return;
    };
    if !ctx.particles.systems.contains_key(&system_id) {
        remove_emitter(ctx, id);
        return;
    }

    let resolution = ctx.resolution();
    let SceneContext { particles, rng, .. } = ctx;
    let Some(emitter) = particles.emitters.get_mut(&id) else {
        return;
    };
    if emitter.config.delay <= 0.0 {
        return;
    }
    let mut batch = Vec::new();
    emitter.timer += delta;
    while emitter.timer >= emitter.config.delay {
        emitter.timer -= emitter.config.delay;
        for _ in 0..emitter.config.num_particles {
            batch.push(emit_one(&emitter.config, rng, ox, oy));
            if let Some(tweak) = emitter.tweak {
                tweak(&mut emitter.config, rng, resolution);
            }
        }
    }
    if let Some(system) = particles.systems.get_mut(&system_id) {
        system.particles.extend(batch);
    }
}

fn emit_one(config: &EmitterConfig, rng: &mut Rng, ox: f32, oy: f32) -> Particle {
    let scale = random_f32_range(rng, config.scale.0, config.scale.1);
    let a = random_f32_range(rng, 0.0, TAU);
    let (sin, cos) = a.sin_cos();
    let v = config.velocity;
    let (vx, vy) = if config.tangent {
        (-v * sin, v * cos)
    } else {
        (v * cos, v * sin)
    };
    Particle {
        x: ox + config.radius * cos,
        y: oy + config.radius * sin,
        vx,
        vy,
        age: 0.0,
        life: config.life,
        fade_time: config.fade_time,
        fade_in: config.fade_in,
        scale,
        scale_delta: config.scale_delta,
        alpha: config.alpha,
        color: config.color,
    }
}

pub(crate) fn tick_system(ctx: &mut SceneContext, id: ParticleSystemId, delta: f32) {
    let Some(system) = ctx.particles.systems.get_mut(&id) else {
        ctx.reactor.remove(TickTarget::Particles(id));
        return;
    };
    if !ctx.world.is_alive(system.entity) {
        ctx.particles.systems.remove(&id);
        ctx.reactor.remove(TickTarget::Particles(id));
        return;
    }
    system.particles.retain_mut(|p| p.step(delta));
}
