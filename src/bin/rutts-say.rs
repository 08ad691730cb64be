//! Speak Russian text into a WAV file with the native `ru_tts` engine.
//!
//! Usage:
//!   rutts-say "Привет, мир!"
//!   rutts-say --rate 60 --voice 1 --dictionary rulex.db -o hello.wav "Первая фраза." "Вторая фраза."
//!
//! Every TEXT argument is one utterance; an index marker follows each one and
//! is logged when reached.  `RUST_LOG=debug` shows the worker's activity.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use rutts::{
    ffi::{NativeEngine, RulexDictionary},
    Driver, DriverConfig, SpeechCommand, SpeechItem, SynthEvent, Voice, WavSink,
};

/// Longest wait for the engine to finish one utterance.
const UTTERANCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Speak text with ru_tts into a WAV file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Text to speak; each argument is a separate utterance
    #[arg(required = true)]
    text: Vec<String>,

    /// Output WAV file
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// JSON configuration (parameters and character tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// rulex pronunciation database; enables dictionary lookups
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// Speech rate, percent
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    rate: Option<i32>,

    /// Voice pitch, percent
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    pitch: Option<i32>,

    /// Inflection, percent
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    inflection: Option<i32>,

    /// Volume, percent
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    volume: Option<i32>,

    /// Voice id: 0 (male) or 1 (female)
    #[arg(long, default_value = "0")]
    voice: String,

    /// Double the playback speed
    #[arg(long)]
    rate_boost: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let Some(voice) = Voice::from_id(&cli.voice) else {
        let available: Vec<String> =
            Voice::ALL.iter().map(|v| format!("{} ({})", v.id(), v.display_name())).collect();
        bail!("unknown voice {:?}; available: {}", cli.voice, available.join(", "));
    };

    let config = match &cli.config {
        Some(path) => DriverConfig::load(path)?,
        None => DriverConfig::default(),
    };

    let sink = Arc::new(
        WavSink::create(&cli.output, config.parameters.samples_per_sec)
            .with_context(|| format!("Cannot create {}", cli.output.display()))?,
    );

    let mut builder = Driver::builder(config, sink);
    if let Some(path) = &cli.dictionary {
        builder = builder.try_dictionary(RulexDictionary::open(path));
    }
    let mut driver = builder.build(NativeEngine::create).context("Cannot start ru_tts")?;

    if cli.dictionary.is_some() {
        driver.set_use_dictionary(true);
    }
    if let Some(rate) = cli.rate {
        driver.set_rate(rate);
    }
    if let Some(pitch) = cli.pitch {
        driver.set_pitch(pitch);
    }
    if let Some(inflection) = cli.inflection {
        driver.set_inflection(inflection);
    }
    if let Some(volume) = cli.volume {
        driver.set_volume(volume);
    }
    driver.set_voice(voice);
    driver.set_rate_boost(cli.rate_boost);

    let events = driver.events();
    let mut sequence = Vec::with_capacity(cli.text.len() * 2);
    for (index, text) in cli.text.iter().enumerate() {
        sequence.push(SpeechItem::from(text.as_str()));
        sequence.push(SpeechItem::Command(SpeechCommand::Index(index as i32)));
    }
    driver.speak(sequence);

    loop {
        match events.recv_timeout(UTTERANCE_TIMEOUT) {
            Ok(SynthEvent::IndexReached(index)) => info!("spoken: {:?}", cli.text[index as usize]),
            Ok(SynthEvent::DoneSpeaking) => break,
            Err(e) => {
                warn!("gave up waiting for the engine: {e}");
                break;
            }
        }
    }

    driver.shutdown();
    info!("wrote {}", cli.output.display());
    Ok(())
}
