//! Adapter between the platform audio callback and the particle pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::particles::ParticlePool;

/// Pulls mixed samples from the pool and keeps the last left channel for the scope
pub struct AudioSink {
    pool: Arc<ParticlePool>,
    sample_rate: f32,
    never_block: bool,

    /// Copy of the last buffer's left channel (own lock, disjoint from the pool's)
    waveform: Mutex<Vec<f32>>,

    buffers_processed: AtomicU64,
    buffers_silenced: AtomicU64,
}

impl AudioSink {
    /// `buffer_frames` only sizes the scope copy up front
    pub fn new(
        pool: Arc<ParticlePool>,
        sample_rate: u32,
        buffer_frames: usize,
        never_block: bool,
    ) -> Self {
        Self {
            pool,
            sample_rate: sample_rate as f32,
            never_block,
            waveform: Mutex::new(Vec::with_capacity(buffer_frames)),
            buffers_processed: AtomicU64::new(0),
            buffers_silenced: AtomicU64::new(0),
        }
    }

    /// Audio callback body: fill `buffer` (interleaved, `channels` wide)
    pub fn process(&self, buffer: &mut [f32], channels: usize) {
        if self.never_block {
            if !self.pool.try_mix(buffer, channels, self.sample_rate) {
                self.buffers_silenced.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.pool.mix(buffer, channels, self.sample_rate);
        }
        self.buffers_processed.fetch_add(1, Ordering::Relaxed);

        // Grab the left channel for the scope, after the pool lock is released
        let mut waveform = self.waveform.lock().unwrap_or_else(PoisonError::into_inner);
        waveform.clear();
        if channels > 0 {
            waveform.extend(buffer.chunks_exact(channels).map(|frame| frame[0]));
        }
    }

    /// Last produced left-channel samples (length = last buffer's frame count)
    pub fn waveform(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.waveform_into(&mut out);
        out
    }

    /// Same as [`AudioSink::waveform`], reusing `out`'s allocation
    pub fn waveform_into(&self, out: &mut Vec<f32>) {
        let waveform = self.waveform.lock().unwrap_or_else(PoisonError::into_inner);
        out.clear();
        out.extend_from_slice(&waveform);
    }

    pub fn pool(&self) -> &Arc<ParticlePool> {
        &self.pool
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of callbacks served so far
    pub fn buffers_processed(&self) -> u64 {
        self.buffers_processed.load(Ordering::Relaxed)
    }

    /// Number of callbacks that emitted silence because the pool was busy
    pub fn buffers_silenced(&self) -> u64 {
        self.buffers_silenced.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::Waveform;
    use crate::params::{MixParams, ParticleParams};
    use crate::particles::{Bounds, SpawnRequest};
    use glam::Vec2;

    fn sink(never_block: bool) -> AudioSink {
        let pool = Arc::new(ParticlePool::with_seed(
            64,
            ParticleParams::default(),
            MixParams::default(),
            9,
        ));
        AudioSink::new(pool, 44_100, 512, never_block)
    }

    #[test]
    fn test_empty_pool_produces_silence() {
        let sink = sink(false);
        let mut buffer = vec![0.7; 256 * 2];
        sink.process(&mut buffer, 2);

        assert!(buffer.iter().all(|&s| s == 0.0));
        assert_eq!(sink.waveform(), vec![0.0; 256]);
        assert_eq!(sink.pool().count(), 0);
    }

    #[test]
    fn test_waveform_is_left_channel_of_last_buffer() {
        let sink = sink(false);
        sink.pool().spawn(SpawnRequest::new(
            Vec2::new(100.0, 100.0),
            Waveform::Saw,
            330.0,
        ));
        sink.pool().advance(0.1, Bounds::new(800.0, 600.0));

        let mut buffer = vec![0.0; 128 * 2];
        sink.process(&mut buffer, 2);
        let mut buffer = vec![0.0; 64 * 2];
        sink.process(&mut buffer, 2);

        let left: Vec<f32> = buffer.chunks_exact(2).map(|f| f[0]).collect();
        assert_eq!(sink.waveform(), left);
        assert_eq!(sink.waveform().len(), 64);
        assert_eq!(sink.buffers_processed(), 2);
    }

    #[test]
    fn test_never_block_counts_silenced_buffers() {
        let sink = sink(true);
        let mut buffer = vec![0.0; 32];
        sink.process(&mut buffer, 2);
        assert_eq!(sink.buffers_silenced(), 0);
        assert_eq!(sink.buffers_processed(), 1);
    }
}
