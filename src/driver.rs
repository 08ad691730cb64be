//! The driver surface the host talks to.
//!
//! [`Driver::speak`] splits a speech sequence at its control commands,
//! normalises each text run and queues the pieces for the worker;
//! [`Driver::cancel`] drops pending speech while keeping pending parameter
//! changes and notifications.  Settings are exposed as percents.

use std::{fmt::Display, sync::Arc, thread::JoinHandle};

use crossbeam_channel::Receiver;
use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::{
    audio::{AudioCallback, AudioSink},
    config::DriverConfig,
    engine::SynthesisEngine,
    error::Result,
    events::{Listeners, SynthEvent},
    lookup::PronunciationLookup,
    normalize::{NormalizerConfig, TextNormalizer},
    params::{
        gap_factor_bounds, param_to_percent, percent_to_param, EngineConfig, ParamField, Voice,
        INTONATION_MAX, INTONATION_MIN, PITCH_MAX, PITCH_MIN, RATE_BOOST_SPEED, RATE_MAX, RATE_MIN,
    },
    queue::{CancellationSignal, Task, TaskQueue, Worker},
};

/// Volume the engine starts with, in percent.
const DEFAULT_VOLUME: i32 = 50;

// ─────────────────────────────────────────────────────────────────────────────
// Speech sequences
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCommand {
    /// Report [`SynthEvent::IndexReached`] once the preceding text is spoken.
    Index(i32),
    /// Switch the voice pitch (percent) for the text that follows.
    Pitch(i32),
    /// Any other host command; skipped.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechItem {
    Text(String),
    Command(SpeechCommand),
}

impl From<&str> for SpeechItem {
    fn from(text: &str) -> Self {
        SpeechItem::Text(text.to_string())
    }
}

impl From<String> for SpeechItem {
    fn from(text: String) -> Self {
        SpeechItem::Text(text)
    }
}

impl From<SpeechCommand> for SpeechItem {
    fn from(command: SpeechCommand) -> Self {
        SpeechItem::Command(command)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-side view of the settings, in percent.  The native values live
/// with the worker and only change through queued tasks.
#[derive(Debug, Clone)]
struct Settings {
    rate: i32,
    rate_boost: bool,
    pitch: i32,
    volume: i32,
    inflection: i32,
    gap_factor: i32,
    gap_factor_max: i32,
    flags: i32,
    use_dictionary: bool,
}

impl Settings {
    fn from_engine_config(config: &EngineConfig) -> Self {
        let (gap_min, gap_max) = gap_factor_bounds(config.speech_rate);
        Self {
            rate: param_to_percent(config.speech_rate, RATE_MIN, RATE_MAX),
            rate_boost: false,
            pitch: param_to_percent(config.voice_pitch, PITCH_MIN, PITCH_MAX),
            volume: DEFAULT_VOLUME,
            inflection: param_to_percent(config.intonation, INTONATION_MIN, INTONATION_MAX),
            gap_factor: param_to_percent(config.general_gap_factor, gap_min, gap_max),
            gap_factor_max: gap_max,
            flags: config.flags,
            use_dictionary: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

pub struct DriverBuilder {
    config: DriverConfig,
    sink: Arc<dyn AudioSink>,
    dictionary: Option<Box<dyn PronunciationLookup>>,
}

impl DriverBuilder {
    /// Use `dictionary` for pronunciation overrides.
    pub fn dictionary<L: PronunciationLookup + 'static>(mut self, dictionary: L) -> Self {
        self.dictionary = Some(Box::new(dictionary));
        self
    }

    /// Use the dictionary if it opened; otherwise run without one.
    pub fn try_dictionary<L, E>(self, opened: std::result::Result<L, E>) -> Self
    where
        L: PronunciationLookup + 'static,
        E: Display,
    {
        match opened {
            Ok(dictionary) => self.dictionary(dictionary),
            Err(e) => {
                warn!("pronunciation dictionary not available: {e}");
                self
            }
        }
    }

    /// Create the engine with the driver's audio callback and start the
    /// worker.  An engine failure is fatal.
    pub fn build<F, E>(self, create_engine: F) -> Result<Driver>
    where
        F: FnOnce(AudioCallback) -> Result<E>,
        E: SynthesisEngine + 'static,
    {
        let DriverBuilder { config, sink, dictionary } = self;

        let cancel = CancellationSignal::new();
        let callback = AudioCallback::new(cancel.clone(), sink.clone());
        let mut engine = create_engine(callback.clone())?;

        let mut engine_config = EngineConfig::default();
        engine.init_config(&mut engine_config);
        engine_config.apply_user_parameters(&config.parameters);
        engine.set_volume(DEFAULT_VOLUME as f32 / 100.0);
        let settings = Settings::from_engine_config(&engine_config);

        let mut normalizer = TextNormalizer::with_config(NormalizerConfig::from(&config));
        if let Some(dictionary) = dictionary {
            normalizer = normalizer.with_dictionary(dictionary);
        }

        let queue = Arc::new(TaskQueue::new());
        let listeners = Arc::new(Listeners::new());
        let worker = Worker::new(
            queue.clone(),
            Box::new(engine),
            engine_config,
            callback,
            sink.clone(),
            listeners.clone(),
        )
        .spawn()?;

        Ok(Driver {
            queue,
            cancel,
            sink,
            normalizer,
            settings: Mutex::new(settings),
            listeners,
            worker: Some(worker),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

pub struct Driver {
    queue: Arc<TaskQueue>,
    cancel: CancellationSignal,
    sink: Arc<dyn AudioSink>,
    normalizer: TextNormalizer,
    settings: Mutex<Settings>,
    listeners: Arc<Listeners>,
    worker: Option<JoinHandle<Worker>>,
}

impl Driver {
    pub fn builder(config: DriverConfig, sink: Arc<dyn AudioSink>) -> DriverBuilder {
        DriverBuilder { config, sink, dictionary: None }
    }

    pub fn language(&self) -> &'static str {
        "ru"
    }

    // ── Speech ────────────────────────────────────────────────────────────────

    /// Queue a speech sequence.  Returns immediately.
    pub fn speak<I>(&self, sequence: I)
    where
        I: IntoIterator,
        I::Item: Into<SpeechItem>,
    {
        let use_dictionary = self.settings.lock().use_dictionary;
        let mut text = String::new();
        for item in sequence {
            match item.into() {
                SpeechItem::Text(run) => text.push_str(&run),
                SpeechItem::Command(SpeechCommand::Index(index)) => {
                    self.queue_text(&text, Some(index), use_dictionary);
                    text.clear();
                }
                SpeechItem::Command(SpeechCommand::Pitch(percent)) => {
                    self.queue_text(&text, None, use_dictionary);
                    text.clear();
                    let pitch = percent_to_param(percent, PITCH_MIN, PITCH_MAX);
                    self.set_parameter(ParamField::VoicePitch, pitch);
                }
                SpeechItem::Command(SpeechCommand::Unsupported(command)) => {
                    debug!("unsupported speech command: {command}");
                }
            }
        }
        self.queue_text(&text, None, use_dictionary);
        self.queue.push(Task::NotifyDone);
    }

    fn queue_text(&self, text: &str, index: Option<i32>, use_dictionary: bool) {
        let text = self.normalizer.normalize(text, use_dictionary);
        if text.is_empty() && index.is_none() {
            return;
        }
        self.queue.push(Task::Speak { text, index });
    }

    /// Silence current speech and drop everything not yet spoken.  Pending
    /// parameter changes and notifications still run, in order.
    pub fn cancel(&self) {
        let dropped = self.queue.cancel_speech(&self.cancel);
        debug!("cancel: dropped {dropped} pending speech tasks");
        self.sink.stop();
    }

    /// Pause or resume output right away.
    pub fn pause(&self, paused: bool) {
        self.sink.pause(paused);
    }

    // ── Notifications ─────────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SynthEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener);
    }

    /// Channel receiving every event raised from now on.
    pub fn events(&self) -> Receiver<SynthEvent> {
        self.listeners.channel()
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    fn set_parameter(&self, field: ParamField, value: i32) {
        self.queue.push(Task::SetParameter { field, value });
    }

    pub fn rate(&self) -> i32 {
        self.settings.lock().rate
    }

    /// Change the rate; the general gap factor keeps its percent against the
    /// range of the new rate.
    pub fn set_rate(&self, percent: i32) {
        let mut settings = self.settings.lock();
        settings.rate = percent.clamp(0, 100);
        let rate = percent_to_param(settings.rate, RATE_MIN, RATE_MAX);
        self.set_parameter(ParamField::SpeechRate, rate);

        let (gap_min, gap_max) = gap_factor_bounds(rate);
        settings.gap_factor_max = gap_max;
        let gap_factor = percent_to_param(settings.gap_factor, gap_min, gap_max);
        self.set_parameter(ParamField::GeneralGapFactor, gap_factor);
    }

    pub fn rate_boost(&self) -> bool {
        self.settings.lock().rate_boost
    }

    pub fn set_rate_boost(&self, enable: bool) {
        let mut settings = self.settings.lock();
        if settings.rate_boost == enable {
            return;
        }
        settings.rate_boost = enable;
        let speed = if enable { RATE_BOOST_SPEED } else { 1.0 };
        self.queue.push(Task::run(move |engine| {
            engine.set_speed(speed);
            Ok(())
        }));
    }

    pub fn pitch(&self) -> i32 {
        self.settings.lock().pitch
    }

    pub fn set_pitch(&self, percent: i32) {
        let mut settings = self.settings.lock();
        settings.pitch = percent.clamp(0, 100);
        self.set_parameter(ParamField::VoicePitch, percent_to_param(settings.pitch, PITCH_MIN, PITCH_MAX));
    }

    pub fn inflection(&self) -> i32 {
        self.settings.lock().inflection
    }

    pub fn set_inflection(&self, percent: i32) {
        let mut settings = self.settings.lock();
        settings.inflection = percent.clamp(0, 100);
        let intonation = percent_to_param(settings.inflection, INTONATION_MIN, INTONATION_MAX);
        self.set_parameter(ParamField::Intonation, intonation);
    }

    /// Pause length between phrases.
    pub fn gap_factor(&self) -> i32 {
        self.settings.lock().gap_factor
    }

    pub fn set_gap_factor(&self, percent: i32) {
        let mut settings = self.settings.lock();
        settings.gap_factor = percent.clamp(0, 100);
        let gap_factor = percent_to_param(settings.gap_factor, 0, settings.gap_factor_max);
        self.set_parameter(ParamField::GeneralGapFactor, gap_factor);
    }

    pub fn volume(&self) -> i32 {
        self.settings.lock().volume
    }

    pub fn set_volume(&self, percent: i32) {
        let mut settings = self.settings.lock();
        settings.volume = percent.clamp(0, 100);
        let volume = settings.volume as f32 / 100.0;
        self.queue.push(Task::run(move |engine| {
            engine.set_volume(volume);
            Ok(())
        }));
    }

    pub fn available_voices(&self) -> &'static [Voice] {
        &Voice::ALL
    }

    pub fn voice(&self) -> Voice {
        Voice::from_flags(self.settings.lock().flags)
    }

    pub fn set_voice(&self, voice: Voice) {
        let mut settings = self.settings.lock();
        settings.flags = voice.apply_to(settings.flags);
        self.set_parameter(ParamField::Flags, settings.flags);
    }

    pub fn has_dictionary(&self) -> bool {
        self.normalizer.has_dictionary()
    }

    pub fn use_dictionary(&self) -> bool {
        self.settings.lock().use_dictionary
    }

    /// Turn dictionary lookups on or off for text spoken from now on.
    pub fn set_use_dictionary(&self, enable: bool) {
        if enable && !self.has_dictionary() {
            warn!("no pronunciation dictionary loaded; setting ignored");
            return;
        }
        self.settings.lock().use_dictionary = enable;
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Stop the worker and release everything: sink, dictionary, then the
    /// engine.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.cancel();
        self.queue.push(Task::Shutdown);
        let engine = match handle.join() {
            Ok(worker) => Some(worker.into_engine()),
            Err(_) => {
                error!("worker thread panicked");
                None
            }
        };
        self.sink.close();
        self.normalizer.close_dictionary();
        drop(engine);
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
