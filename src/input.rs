//! Mapping from keyboard, mouse and blob-detector input to spawn requests.
//!
//! Screen layout: the width is split into four waveform zones (Sine, Square,
//! Saw, Noise from left to right) and the height maps to pitch, high at the
//! top. The keyboard plays a piano layout on the QWERTY home row.

use glam::Vec2;
use rand::Rng;

use crate::oscillator::Waveform;
use crate::params::{InputParams, VoiceParams};
use crate::particles::{Bounds, SpawnRequest};

/// Keyboard note table (piano layout on QWERTY)
///
/// white keys:  A  S  D  F  G  H  J  K  L
///              C4 D4 E4 F4 G4 A4 B4 C5 D5
/// black keys:  W  E     T  Y  U     O  P
pub const NOTE_KEYS: [(char, f32); 16] = [
    ('a', 261.63), // C4
    ('w', 277.18), // C#4
    ('s', 293.66), // D4
    ('e', 311.13), // D#4
    ('d', 329.63), // E4
    ('f', 349.23), // F4
    ('t', 369.99), // F#4
    ('g', 392.00), // G4
    ('y', 415.30), // G#4
    ('h', 440.00), // A4
    ('u', 466.16), // A#4
    ('j', 493.88), // B4
    ('k', 523.25), // C5
    ('o', 554.37), // C#5
    ('l', 587.33), // D5
    ('p', 622.25), // D#5
];

/// Frequency for a note key, case-insensitive
pub fn note_frequency(key: char) -> Option<f32> {
    let key = key.to_ascii_lowercase();
    NOTE_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|&(_, freq)| freq)
}

/// Waveform selected by the digit keys 1-4
pub fn waveform_for_digit(key: char) -> Option<Waveform> {
    match key {
        '1' => Some(Waveform::Sine),
        '2' => Some(Waveform::Square),
        '3' => Some(Waveform::Saw),
        '4' => Some(Waveform::Noise),
        _ => None,
    }
}

/// Turns input positions into spawn requests
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    params: InputParams,
    voice: VoiceParams,
}

impl InputMapper {
    pub fn new(params: InputParams, voice: VoiceParams) -> Self {
        Self { params, voice }
    }

    /// Pitch from height: top edge = high, bottom edge = low (clamped)
    pub fn frequency_from_y(&self, y: f32, bounds: Bounds) -> f32 {
        let top = self.params.top_frequency_hz;
        let bottom = self.params.bottom_frequency_hz;
        if bounds.height <= 0.0 {
            return top;
        }
        let t = (y / bounds.height).clamp(0.0, 1.0);
        top + (bottom - top) * t
    }

    /// Waveform zone from horizontal position
    pub fn waveform_from_x(&self, x: f32, bounds: Bounds) -> Waveform {
        if bounds.width <= 0.0 {
            return Waveform::ALL[0];
        }
        let zones = Waveform::ALL.len();
        let zone = (x / bounds.width * zones as f32).floor().max(0.0) as usize;
        Waveform::ALL[zone.min(zones - 1)]
    }

    /// Click/drag/blob spawn: waveform from x, pitch from y
    pub fn pointer_spawn(&self, position: Vec2, bounds: Bounds) -> SpawnRequest {
        let waveform = self.waveform_from_x(position.x, bounds);
        let frequency = self.frequency_from_y(position.y, bounds);
        SpawnRequest::new(position, waveform, frequency).with_voice_defaults(&self.voice)
    }

    /// Note key spawn near the upper middle of the screen, `None` for non-note keys
    pub fn key_spawn<R: Rng + ?Sized>(
        &self,
        key: char,
        waveform: Waveform,
        bounds: Bounds,
        rng: &mut R,
    ) -> Option<SpawnRequest> {
        let frequency = note_frequency(key)?;
        let (ax, ay) = self.params.key_spawn_anchor;
        let (jx, jy) = self.params.key_spawn_jitter;
        let position = Vec2::new(
            bounds.width * ax + jitter(rng, jx),
            bounds.height * ay + jitter(rng, jy),
        );
        Some(SpawnRequest::new(position, waveform, frequency).with_voice_defaults(&self.voice))
    }

    /// Whether a held-button drag spawns on this frame
    pub fn drag_spawns_on(&self, frame: u64) -> bool {
        frame % self.params.drag_spawn_interval_frames.max(1) == 0
    }

    /// Whether detected blobs spawn on this frame
    pub fn blob_spawns_on(&self, frame: u64) -> bool {
        frame % self.params.blob_spawn_interval_frames.max(1) == 0
    }

    /// Spawn requests for blob centers reported by an external detector
    ///
    /// `points` are normalized to [0, 1]². Yields nothing on throttled frames.
    pub fn blob_spawns<'a>(
        &'a self,
        points: &'a [Vec2],
        frame: u64,
        bounds: Bounds,
    ) -> impl Iterator<Item = SpawnRequest> + 'a {
        let active = self.blob_spawns_on(frame);
        points
            .iter()
            .filter(move |_| active)
            .map(move |&p| self.pointer_spawn(bounds.denormalize(p), bounds))
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    const BOUNDS: Bounds = Bounds {
        width: 1280.0,
        height: 800.0,
    };

    #[test]
    fn test_note_table() {
        assert_eq!(note_frequency('h'), Some(440.0));
        assert_eq!(note_frequency('H'), Some(440.0));
        assert_eq!(note_frequency('a'), Some(261.63));
        assert_eq!(note_frequency('p'), Some(622.25));
        assert_eq!(note_frequency('z'), None);
        assert_eq!(note_frequency('1'), None);
    }

    #[test]
    fn test_digit_waveforms() {
        assert_eq!(waveform_for_digit('1'), Some(Waveform::Sine));
        assert_eq!(waveform_for_digit('4'), Some(Waveform::Noise));
        assert_eq!(waveform_for_digit('5'), None);
    }

    #[test]
    fn test_zones() {
        let mapper = InputMapper::default();
        assert_eq!(mapper.waveform_from_x(-10.0, BOUNDS), Waveform::Sine);
        assert_eq!(mapper.waveform_from_x(0.0, BOUNDS), Waveform::Sine);
        assert_eq!(mapper.waveform_from_x(319.0, BOUNDS), Waveform::Sine);
        assert_eq!(mapper.waveform_from_x(320.0, BOUNDS), Waveform::Square);
        assert_eq!(mapper.waveform_from_x(700.0, BOUNDS), Waveform::Saw);
        assert_eq!(mapper.waveform_from_x(1279.0, BOUNDS), Waveform::Noise);
        assert_eq!(mapper.waveform_from_x(5000.0, BOUNDS), Waveform::Noise);
    }

    #[test]
    fn test_pitch_from_height_is_clamped() {
        let mapper = InputMapper::default();
        assert_eq!(mapper.frequency_from_y(0.0, BOUNDS), 880.0);
        assert_eq!(mapper.frequency_from_y(800.0, BOUNDS), 110.0);
        assert_eq!(mapper.frequency_from_y(-50.0, BOUNDS), 880.0);
        assert_eq!(mapper.frequency_from_y(900.0, BOUNDS), 110.0);
        assert!((mapper.frequency_from_y(400.0, BOUNDS) - 495.0).abs() < 1e-3);
    }

    #[test]
    fn test_pointer_spawn_uses_voice_defaults() {
        let voice = VoiceParams {
            default_amplitude: 0.3,
            default_lifetime_s: 1.5,
            ..VoiceParams::default()
        };
        let mapper = InputMapper::new(InputParams::default(), voice);
        let request = mapper.pointer_spawn(Vec2::new(1000.0, 0.0), BOUNDS);

        assert_eq!(request.waveform, Waveform::Noise);
        assert_eq!(request.frequency, 880.0);
        assert_eq!(request.amplitude, 0.3);
        assert_eq!(request.lifetime, 1.5);
    }

    #[test]
    fn test_key_spawn_near_anchor() {
        let mapper = InputMapper::default();
        let mut rng = SmallRng::seed_from_u64(1);

        let request = mapper
            .key_spawn('k', Waveform::Saw, BOUNDS, &mut rng)
            .unwrap();
        assert_eq!(request.frequency, 523.25);
        assert_eq!(request.waveform, Waveform::Saw);
        assert!((request.position.x - 640.0).abs() <= 80.0);
        assert!((request.position.y - 320.0).abs() <= 40.0);

        assert!(mapper
            .key_spawn('x', Waveform::Saw, BOUNDS, &mut rng)
            .is_none());
    }

    #[test]
    fn test_throttling() {
        let mapper = InputMapper::default();
        let drag: Vec<u64> = (0..10).filter(|&f| mapper.drag_spawns_on(f)).collect();
        let blob: Vec<u64> = (0..13).filter(|&f| mapper.blob_spawns_on(f)).collect();
        assert_eq!(drag, vec![0, 3, 6, 9]);
        assert_eq!(blob, vec![0, 6, 12]);
    }

    #[test]
    fn test_blob_points_scale_to_bounds() {
        let mapper = InputMapper::default();
        let points = [Vec2::new(0.1, 0.0), Vec2::new(0.9, 1.0)];

        let spawned: Vec<SpawnRequest> = mapper.blob_spawns(&points, 12, BOUNDS).collect();
        assert_eq!(spawned.len(), 2);
        assert_eq!(spawned[0].position, Vec2::new(128.0, 0.0));
        assert_eq!(spawned[0].waveform, Waveform::Sine);
        assert_eq!(spawned[0].frequency, 880.0);
        assert_eq!(spawned[1].waveform, Waveform::Noise);
        assert_eq!(spawned[1].frequency, 110.0);

        assert_eq!(mapper.blob_spawns(&points, 13, BOUNDS).count(), 0);
    }
}
