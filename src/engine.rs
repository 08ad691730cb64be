//! Synthesis engine capability.
//!
//! An engine is created with an [`AudioCallback`](crate::audio::AudioCallback)
//! and, for every [`speak`](SynthesisEngine::speak), drives that callback
//! synchronously with the audio it produces before returning.  Engines are not
//! reentrant; the driver only ever calls them from its worker thread.
//! Dropping the engine destroys it.

use crate::{error::Result, normalize::NormalizedText, params::EngineConfig};

/// Audio sample rate produced by `ru_tts`.
pub const SAMPLE_RATE: u32 = 10_000;

pub trait SynthesisEngine: Send {
    /// Fill `config` with the engine's initial parameters.
    ///
    /// The default keeps [`EngineConfig::default`], which already matches
    /// `ru_tts`.
    fn init_config(&self, _config: &mut EngineConfig) {}

    /// Synthesize `text`, feeding the audio callback, and return when done
    /// or when the callback asked to abort.
    fn speak(&mut self, config: &EngineConfig, text: &NormalizedText) -> Result<()>;

    /// Output volume, `0.0 ..= 1.0`.
    fn set_volume(&mut self, volume: f32);

    /// Playback speed multiplier (`1.0` = normal).
    fn set_speed(&mut self, speed: f32);
}
