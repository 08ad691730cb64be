//! # rutts
//!
//! Speech orchestration for the [`ru_tts`](https://github.com/poretsky/ru_tts)
//! Russian formant synthesizer: the layer a screen reader talks to.
//!
//! ## Quick start
//!
//! ```no_run
//! # #[cfg(feature = "native")] {
//! use std::{path::Path, sync::Arc};
//! use rutts::{ffi::NativeEngine, ffi::RulexDictionary, Driver, DriverConfig, SynthEvent, WavSink};
//!
//! let sink = Arc::new(WavSink::create(Path::new("out.wav"), rutts::SAMPLE_RATE).unwrap());
//! let mut driver = Driver::builder(DriverConfig::default(), sink)
//!     .try_dictionary(RulexDictionary::open(Path::new("rulex.db")))
//!     .build(NativeEngine::create)
//!     .unwrap();
//!
//! let events = driver.events();
//! driver.speak(["Привет, мир!"]);
//! while events.recv().unwrap() != SynthEvent::DoneSpeaking {}
//! driver.shutdown();
//! # }
//! ```
//!
//! ## Pipeline
//! 1. **Split** — a speech sequence is cut at its index and pitch commands.
//! 2. **Normalise** — each text run is rewritten for the engine
//!    ([`normalize`]): characters named, abbreviations spelled, optional
//!    dictionary pronunciations, KOI8-R restriction.
//! 3. **Queue** — speech, parameter changes and notifications go through one
//!    FIFO drained by a single worker thread ([`queue`]).
//! 4. **Synthesize** — the engine streams PCM through a cancellation-aware
//!    callback into the host's [`AudioSink`].
//!
//! ## Build requirements
//! | Feature   | Requirement                                                   |
//! |-----------|---------------------------------------------------------------|
//! | (default) | none — bring your own [`SynthesisEngine`] and [`AudioSink`]   |
//! | `native`  | `libru_tts` and `librulex`; set `RUTTS_LIB_DIR` if not on the system path |
//! | `cli`     | as `native`; builds the `rutts-say` binary                    |

pub mod audio;
pub mod charmap;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod lookup;
pub mod normalize;
pub mod params;
pub mod queue;

// Native engine and dictionary bindings; linked by build.rs.
#[cfg(feature = "native")]
pub mod ffi;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{AudioCallback, AudioSink, CallbackAction, WavSink};
pub use config::{DriverConfig, Parameters};
pub use driver::{Driver, DriverBuilder, SpeechCommand, SpeechItem};
pub use engine::{SynthesisEngine, SAMPLE_RATE};
pub use error::{DriverError, Result};
pub use events::SynthEvent;
pub use lookup::{MapLookup, PronunciationLookup};
pub use normalize::{NormalizedText, TextNormalizer};
pub use params::{EngineConfig, Voice};
