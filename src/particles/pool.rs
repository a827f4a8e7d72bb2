//! Bounded particle pool shared between the visual and audio threads.
//!
//! A single `Mutex` guards the whole collection. Every public operation
//! takes it for the duration of one call, so spawn/advance/render/mix are
//! fully serialized against each other. With at most a few dozen particles
//! and buffers of a few hundred frames the hold time stays short.
//!
//! Known limitation: the audio callback can wait on the visual thread
//! (priority inversion). [`ParticlePool::try_mix`] trades that wait for a
//! silent buffer. A lock-free or double-buffered snapshot list would remove
//! the wait entirely.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::{Bounds, Particle, ParticleView, SpawnRequest};
use crate::params::{AppConfig, MixParams, ParticleParams};

/// Pool-owned state behind the lock
struct PoolState {
    /// Insertion order: front is the oldest live particle
    particles: VecDeque<Particle>,
    /// Randomness for spawn velocities and noise voices
    rng: SmallRng,
}

/// Capacity-bounded particle collection with FIFO eviction
pub struct ParticlePool {
    state: Mutex<PoolState>,
    capacity: usize,
    params: ParticleParams,
    mix: MixParams,
}

impl ParticlePool {
    /// Create a pool holding at most `capacity` particles (at least 1)
    pub fn new(capacity: usize, params: ParticleParams, mix: MixParams) -> Self {
        Self::with_rng(capacity, params, mix, SmallRng::from_entropy())
    }

    /// Same as [`ParticlePool::new`] with deterministic randomness
    pub fn with_seed(capacity: usize, params: ParticleParams, mix: MixParams, seed: u64) -> Self {
        Self::with_rng(capacity, params, mix, SmallRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.capacity, config.particle.clone(), config.mix.clone())
    }

    fn with_rng(capacity: usize, params: ParticleParams, mix: MixParams, rng: SmallRng) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(PoolState {
                // Preallocated so spawn never reallocates
                particles: VecDeque::with_capacity(capacity),
                rng,
            }),
            capacity,
            params,
            mix,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn params(&self) -> &ParticleParams {
        &self.params
    }

    /// Add a particle, evicting the oldest one when full
    pub fn spawn(&self, request: SpawnRequest) {
        let mut state = self.lock();
        let PoolState { particles, rng } = &mut *state;

        if particles.len() >= self.capacity {
            particles.pop_front();
            log::trace!("pool full ({}), evicted oldest particle", self.capacity);
        }
        particles.push_back(Particle::new(&request, &self.params, rng));
    }

    /// Step every particle by `dt` seconds, then drop the dead ones
    ///
    /// Survivors keep their relative order. Returns the number removed.
    pub fn advance(&self, dt: f32, bounds: Bounds) -> usize {
        let mut state = self.lock();
        let physics = &self.params.physics;

        for particle in state.particles.iter_mut() {
            particle.advance(dt, bounds, physics);
        }

        let before = state.particles.len();
        state.particles.retain(|p| !p.is_dead());
        before - state.particles.len()
    }

    /// Replace the contents of `out` with the visual state of every live particle
    pub fn render(&self, out: &mut Vec<ParticleView>) {
        let state = self.lock();
        out.clear();
        out.extend(state.particles.iter().map(Particle::view));
    }

    /// Visual state of the particle at `index` (oldest first)
    ///
    /// Past the live count this returns [`ParticleView::EMPTY`].
    pub fn view(&self, index: usize) -> ParticleView {
        self.lock()
            .particles
            .get(index)
            .map(Particle::view)
            .unwrap_or(ParticleView::EMPTY)
    }

    /// Fill an interleaved buffer with the mix of all live voices
    ///
    /// Frame count is `buffer.len() / channels`; a trailing partial frame is
    /// left silent. Every voice is mono and replicated to all channels.
    /// Does not allocate.
    pub fn mix(&self, buffer: &mut [f32], channels: usize, sample_rate: f32) {
        let mut state = self.lock();
        mix_locked(&mut state, &self.mix, buffer, channels, sample_rate);
    }

    /// Like [`ParticlePool::mix`] but never waits for the lock
    ///
    /// On contention the buffer is zero-filled and `false` is returned.
    pub fn try_mix(&self, buffer: &mut [f32], channels: usize, sample_rate: f32) -> bool {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                buffer.fill(0.0);
                return false;
            }
        };
        mix_locked(&mut state, &self.mix, buffer, channels, sample_rate);
        true
    }

    pub fn count(&self) -> usize {
        self.lock().particles.len()
    }

    pub fn clear(&self) {
        self.lock().particles.clear();
    }

    /// A panic elsewhere must not take the audio thread down with it
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mix_locked(
    state: &mut PoolState,
    mix: &MixParams,
    buffer: &mut [f32],
    channels: usize,
    sample_rate: f32,
) {
    buffer.fill(0.0);
    if channels == 0 || state.particles.is_empty() {
        return;
    }

    let PoolState { particles, rng } = state;
    let frames = buffer.len() / channels;
    let interleaved = &mut buffer[..frames * channels];

    for particle in particles.iter_mut() {
        for frame in interleaved.chunks_exact_mut(channels) {
            let sample = particle.next_audio_sample(rng, sample_rate);
            for out in frame {
                *out += sample;
            }
        }
    }

    // Normalize + clip so stacked voices don't blow out the speakers
    let scale = mix.scale_for(particles.len());
    for out in interleaved.iter_mut() {
        *out = (*out * scale).clamp(-1.0, 1.0);
    }
}
