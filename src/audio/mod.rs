//! Audio output: the sink adapter called from the platform callback and the
//! cpal stream that drives it.

mod sink;
mod system;

// Re-export public types
pub use sink::AudioSink;
pub use system::AudioSystem;
