//! End-to-end particle pool scenarios driven the way the app drives them:
//! a visual thread spawning and advancing, an audio thread mixing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use glam::Vec2;
use popwave::audio::AudioSink;
use popwave::oscillator::Waveform;
use popwave::params::{AppConfig, MixParams, ParticleParams};
use popwave::particles::{Bounds, ParticlePool, ParticleView, SpawnRequest};

const BOUNDS: Bounds = Bounds {
    width: 1280.0,
    height: 800.0,
};
const SAMPLE_RATE: f32 = 44_100.0;

fn pool(capacity: usize) -> ParticlePool {
    ParticlePool::with_seed(
        capacity,
        ParticleParams::default(),
        MixParams::default(),
        7,
    )
}

fn request(x: f32, waveform: Waveform) -> SpawnRequest {
    SpawnRequest::new(Vec2::new(x, 400.0), waveform, 440.0)
}

#[test]
fn test_full_pool_evicts_oldest_first() {
    let pool = pool(64);
    for i in 1..=65 {
        pool.spawn(request(10.0 * i as f32, Waveform::Sine));
    }

    assert_eq!(pool.count(), 64);
    // P1 is gone; P2 is now the oldest and P65 the newest
    assert_eq!(pool.view(0).position, [20.0, 400.0]);
    assert_eq!(pool.view(63).position, [650.0, 400.0]);
    assert_eq!(pool.view(64), ParticleView::EMPTY);
}

#[test]
fn test_particle_lifecycle() {
    let pool = pool(8);
    pool.spawn(request(640.0, Waveform::Square).with_lifetime(1.0));

    assert_eq!(pool.advance(0.5, BOUNDS), 0);
    assert_eq!(pool.count(), 1);
    let view = pool.view(0);
    assert!(view.alpha > 0.0 && view.alpha < 0.5);

    assert_eq!(pool.advance(0.6, BOUNDS), 1);
    assert_eq!(pool.count(), 0);

    let mut buffer = vec![1.0; 256];
    pool.mix(&mut buffer, 2, SAMPLE_RATE);
    assert!(buffer.iter().all(|&s| s == 0.0));
}

#[test]
fn test_survivors_keep_spawn_order() {
    let pool = pool(8);
    pool.spawn(request(100.0, Waveform::Sine).with_lifetime(5.0));
    pool.spawn(request(200.0, Waveform::Saw).with_lifetime(0.1));
    pool.spawn(request(300.0, Waveform::Noise).with_lifetime(5.0));

    assert_eq!(pool.advance(0.2, BOUNDS), 1);

    let mut views = Vec::new();
    pool.render(&mut views);
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].color, Waveform::Sine.color());
    assert_eq!(views[1].color, Waveform::Noise.color());
}

#[test]
fn test_mix_stays_bounded_at_every_voice_count() {
    for count in 0..=64 {
        let pool = pool(64);
        for i in 0..count {
            let waveform = Waveform::ALL[i % Waveform::ALL.len()];
            pool.spawn(request(20.0 * i as f32, waveform).with_amplitude(1.0));
        }
        // Past the attack ramp so every voice is audible
        pool.advance(0.02, BOUNDS);

        let mut buffer = vec![0.0; 512 * 2];
        pool.mix(&mut buffer, 2, SAMPLE_RATE);

        assert!(
            buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0),
            "out of range with {count} voices"
        );
        for frame in buffer.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        if count > 0 {
            assert!(buffer.iter().any(|&s| s != 0.0));
        }
    }
}

#[test]
fn test_config_capacity_drives_pool() {
    let config = AppConfig::from_json(r#"{ "capacity": 3 }"#).unwrap();
    let pool = ParticlePool::from_config(&config);
    for i in 0..5 {
        pool.spawn(request(i as f32, Waveform::Sine));
    }
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.count(), 3);
}

#[test]
fn test_visual_and_audio_threads_share_pool() {
    let pool = Arc::new(pool(16));
    let sink = Arc::new(AudioSink::new(Arc::clone(&pool), 44_100, 256, false));
    let done = Arc::new(AtomicBool::new(false));

    let audio = {
        let sink = Arc::clone(&sink);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut buffer = vec![0.0; 256 * 2];
            let mut buffers = 0u32;
            while !done.load(Ordering::Relaxed) || buffers == 0 {
                sink.process(&mut buffer, 2);
                assert!(buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
                buffers += 1;
            }
            buffers
        })
    };

    let mut views = Vec::new();
    for frame in 0..300 {
        let waveform = Waveform::ALL[frame % Waveform::ALL.len()];
        pool.spawn(request((frame * 4) as f32, waveform).with_lifetime(0.5));
        pool.advance(1.0 / 60.0, BOUNDS);
        pool.render(&mut views);
        assert!(views.len() <= 16);
    }
    done.store(true, Ordering::Relaxed);

    let buffers = audio.join().unwrap();
    assert!(buffers > 0);
    assert_eq!(sink.buffers_processed(), buffers as u64);
    assert_eq!(sink.waveform().len(), 256);
}

#[test]
fn test_never_block_sink_counts_silenced_buffers() {
    let pool = Arc::new(pool(4));
    let sink = AudioSink::new(Arc::clone(&pool), 44_100, 128, true);
    pool.spawn(request(100.0, Waveform::Sine).with_amplitude(1.0));
    pool.advance(0.05, BOUNDS);

    let mut buffer = vec![0.0; 128];
    sink.process(&mut buffer, 1);

    assert_eq!(sink.buffers_processed(), 1);
    assert_eq!(sink.buffers_silenced(), 0);
    assert!(buffer.iter().any(|&s| s != 0.0));
}
