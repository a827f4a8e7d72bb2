//! Popwave library - additive sound-particle engine
//!
//! Particles bounce around the screen; each one is also an oscillator voice.
//! The visual thread spawns and ages them, the audio callback mixes every
//! live voice into the output buffer.

pub mod audio;
pub mod cli;
pub mod error;
pub mod input;
pub mod oscillator;
pub mod params;
pub mod particles;
pub mod rendering;

pub use error::{Error, Result};
