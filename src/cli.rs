//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::params::{AppConfig, RecordingConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "popwave")]
#[command(about = "Play sound particles: every bubble on screen is a voice", long_about = None)]
pub struct Args {
    /// JSON config file (fields not listed keep their defaults)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum concurrent particles, overrides the config file
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,

    /// Record the audio output to WAV (duration in seconds), then exit
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Directory for recordings
    #[arg(long, value_name = "DIR", default_value = "recording")]
    pub output_dir: PathBuf,

    /// Emit silence instead of waiting when the particle pool is busy
    #[arg(long)]
    pub never_block: bool,
}

impl Args {
    /// Build the app config: defaults, then the config file, then flag overrides
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if self.never_block {
            config.audio.never_block = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// Create recording configuration if recording mode is enabled
    pub fn recording_config(&self) -> Option<RecordingConfig> {
        self.record
            .map(|duration| RecordingConfig::new(duration, self.output_dir.clone()))
    }
}
