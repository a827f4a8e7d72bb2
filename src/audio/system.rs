//! Audio system owning the cpal output stream.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::AudioSink;
use crate::error::{Error, Result};
use crate::params::{AudioConfig, RecordingConfig};
use crate::particles::ParticlePool;

type SharedWavWriter = Arc<Mutex<hound::WavWriter<BufWriter<File>>>>;

/// Output stream driving the [`AudioSink`], plus optional WAV recording
pub struct AudioSystem {
    sink: Arc<AudioSink>,

    /// Recording target (only present in recording mode)
    recorder: Option<(SharedWavWriter, PathBuf)>,

    channels: u16,
    sample_rate_hz: u32,

    /// Audio output stream (kept alive)
    stream: cpal::Stream,
}

impl AudioSystem {
    /// Open the default output device and start mixing `pool` into it
    pub fn new(
        config: &AudioConfig,
        pool: Arc<ParticlePool>,
        recording: Option<&RecordingConfig>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;

        let supported = preferred_output_config(&device, config)?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::UnsupportedSampleFormat(supported.sample_format()));
        }

        let channels = supported.channels();
        let sample_rate_hz = supported.sample_rate().0;

        log::info!(
            "audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate_hz,
            channels
        );

        let sink = Arc::new(AudioSink::new(
            pool,
            sample_rate_hz,
            config.buffer_frames as usize,
            config.never_block,
        ));

        // Create WAV writer if recording
        let recorder = match recording {
            Some(recording) => {
                std::fs::create_dir_all(&recording.output_dir)?;
                let path = recording.audio_path();
                let spec = hound::WavSpec {
                    channels,
                    sample_rate: sample_rate_hz,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let writer = hound::WavWriter::create(&path, spec)?;
                log::info!("recording audio to {}", path.display());
                Some((Arc::new(Mutex::new(writer)), path))
            }
            None => None,
        };
        let writer = recorder.as_ref().map(|(writer, _)| Arc::clone(writer));

        let mut stream_config = supported.config();
        stream_config.buffer_size = cpal::BufferSize::Fixed(config.buffer_frames);

        let stream = match build_stream(&device, &stream_config, &sink, writer.clone()) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!(
                    "could not open stream with {} frame buffers ({err}), using host default",
                    config.buffer_frames
                );
                stream_config.buffer_size = cpal::BufferSize::Default;
                build_stream(&device, &stream_config, &sink, writer)?
            }
        };

        stream.play()?;

        Ok(Self {
            sink,
            recorder,
            channels,
            sample_rate_hz,
            stream,
        })
    }

    /// Shared sink (scope data and buffer statistics)
    pub fn sink(&self) -> &Arc<AudioSink> {
        &self.sink
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Stop the stream and finalize the recording, if any
    pub fn finish(self) -> Result<()> {
        let Self {
            stream, recorder, ..
        } = self;
        // Dropping the stream drops the callback and its writer handle
        drop(stream);

        if let Some((writer, path)) = recorder {
            match Arc::try_unwrap(writer) {
                Ok(writer) => {
                    writer
                        .into_inner()
                        .unwrap_or_else(PoisonError::into_inner)
                        .finalize()?;
                    log::info!("recording saved to {}", path.display());
                }
                Err(_) => log::warn!(
                    "recording {} still in use, it will be finalized on drop",
                    path.display()
                ),
            }
        }
        Ok(())
    }
}

/// Pick a config matching the preferred channel count and rate, else the device default
fn preferred_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> Result<cpal::SupportedStreamConfig> {
    let preferred_rate = cpal::SampleRate(config.sample_rate_hz);
    for s in device.supported_output_configs()? {
        let rates = s.min_sample_rate()..=s.max_sample_rate();
        if s.channels() == config.channels
            && s.sample_format() == cpal::SampleFormat::F32
            && rates.contains(&preferred_rate)
        {
            return Ok(s.with_sample_rate(preferred_rate));
        }
    }

    Ok(device.default_output_config()?)
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sink: &Arc<AudioSink>,
    writer: Option<SharedWavWriter>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError> {
    let sink = Arc::clone(sink);
    let channels = config.channels as usize;

    device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            sink.process(data, channels);

            // Record to WAV if recording; skip the buffer rather than wait
            if let Some(ref writer) = writer {
                if let Ok(mut w) = writer.try_lock() {
                    for &sample in data.iter() {
                        if w.write_sample(sample).is_err() {
                            break;
                        }
                    }
                }
            }
        },
        |err| log::error!("audio stream error: {err}"),
        None,
    )
}
