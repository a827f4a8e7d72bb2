//! A single particle: physical body plus oscillator voice.

use glam::Vec2;
use rand::Rng;

use super::{Bounds, ParticleView, SpawnRequest};
use crate::oscillator::Waveform;
use crate::params::{ParticleParams, ParticlePhysics};

/// Body + voice unit owned by the pool
///
/// Physics and `age` are only touched by [`Particle::advance`] (visual rate).
/// The audio path only touches `phase` through [`Particle::next_audio_sample`].
#[derive(Debug, Clone)]
pub struct Particle {
    // Body
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    color: [f32; 4],

    // Voice
    waveform: Waveform,
    frequency: f32,
    amplitude: f32,
    /// [0, 1), advances once per emitted audio sample
    phase: f32,
    attack_s: f32,

    // Lifetime (seconds)
    age: f32,
    lifetime: f32,
}

impl Particle {
    /// Create a particle that pops upward from `request.position`
    pub fn new<R: Rng + ?Sized>(request: &SpawnRequest, params: &ParticleParams, rng: &mut R) -> Self {
        let physics = &params.physics;
        let velocity = Vec2::new(
            sample_range(rng, physics.spawn_velocity_x),
            sample_range(rng, physics.spawn_velocity_y),
        );

        Self {
            position: request.position,
            velocity,
            radius: physics.radius_for_frequency(request.frequency),
            color: request.waveform.color(),
            waveform: request.waveform,
            frequency: request.frequency,
            amplitude: request.amplitude,
            phase: 0.0,
            attack_s: params.voice.attack_s,
            age: 0.0,
            lifetime: request.lifetime,
        }
    }

    /// Step the body by `dt` seconds inside `bounds`
    ///
    /// Damping is a per-call multiplier, so it is frame-rate dependent.
    pub fn advance(&mut self, dt: f32, bounds: Bounds, physics: &ParticlePhysics) {
        let dt = dt.max(0.0);
        self.age += dt;
        self.position += self.velocity * dt;

        self.velocity.y += physics.gravity * dt;
        self.velocity *= physics.damping_per_tick;

        // Bounce off the edges, losing energy
        let restitution = physics.bounce_restitution;
        if self.position.x < self.radius {
            self.velocity.x = self.velocity.x.abs() * restitution;
            self.position.x = self.radius;
        } else if self.position.x > bounds.width - self.radius {
            self.velocity.x = -self.velocity.x.abs() * restitution;
            self.position.x = bounds.width - self.radius;
        }
        if self.position.y < self.radius {
            self.velocity.y = self.velocity.y.abs() * restitution;
            self.position.y = self.radius;
        } else if self.position.y > bounds.height - self.radius {
            self.velocity.y = -self.velocity.y.abs() * restitution;
            self.position.y = bounds.height - self.radius;
        }

        self.radius = (self.radius - dt * physics.shrink_per_s).max(physics.min_radius);
    }

    pub fn is_dead(&self) -> bool {
        self.age >= self.lifetime
    }

    /// Produce the next output sample and advance the phase by one sample
    ///
    /// Must be called exactly once per emitted sample or the pitch drifts.
    /// Does not touch `age`: the envelope only moves on the visual tick.
    #[inline]
    pub fn next_audio_sample<R: Rng + ?Sized>(&mut self, rng: &mut R, sample_rate: f32) -> f32 {
        let sample = self.waveform.sample(self.phase, rng) * self.current_amplitude();
        if sample_rate > 0.0 {
            self.phase = wrap_phase(self.phase + self.frequency / sample_rate);
        }
        sample
    }

    /// Target amplitude shaped by the attack ramp and the linear fade-out
    pub fn current_amplitude(&self) -> f32 {
        if self.lifetime <= 0.0 {
            return 0.0;
        }
        let envelope = (1.0 - self.age / self.lifetime).clamp(0.0, 1.0);
        let attack = if self.attack_s > 0.0 {
            (self.age / self.attack_s).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.amplitude * envelope * attack
    }

    /// Snapshot of the visual state
    pub fn view(&self) -> ParticleView {
        ParticleView {
            position: self.position.to_array(),
            radius: self.radius,
            alpha: self.current_amplitude().clamp(0.0, 1.0),
            color: self.color,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }
}

/// Uniform sample from an (unordered) range; degenerate ranges return the bound
fn sample_range<R: Rng + ?Sized>(rng: &mut R, (a, b): (f32, f32)) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// Wrap into [0, 1)
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
