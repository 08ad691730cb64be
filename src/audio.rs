//! Audio output: the sink capability, the cancellation-aware callback the
//! engine feeds, and a WAV-file sink.
//!
//! PCM is 16-bit little-endian mono throughout.

use std::{
    fs::File,
    io::BufWriter,
    panic::{catch_unwind, AssertUnwindSafe},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{error, warn};
use parking_lot::Mutex;

use crate::{
    error::{DriverError, Result},
    queue::CancellationSignal,
};

/// Destination of synthesized audio.
pub trait AudioSink: Send + Sync {
    /// Queue PCM bytes for playback.
    fn feed(&self, pcm: &[u8]) -> Result<()>;

    /// Drop everything queued and stop playing immediately.
    fn stop(&self);

    fn pause(&self, paused: bool);

    /// Block until everything fed so far has been played.
    fn idle(&self);

    fn close(&self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine callback
// ─────────────────────────────────────────────────────────────────────────────

/// Value returned to the engine after each chunk.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue = 0,
    Abort = 1,
}

/// Receives audio from the engine while a text is being synthesized and
/// forwards it to the sink unless cancellation was requested.
///
/// Once it has answered [`CallbackAction::Abort`] it keeps doing so until the
/// next [`arm`](Self::arm), i.e. for the rest of the current engine call.
/// It never touches the task queue or the engine parameters.
#[derive(Clone)]
pub struct AudioCallback {
    cancel: CancellationSignal,
    sink: Arc<dyn AudioSink>,
    aborted: Arc<AtomicBool>,
}

impl AudioCallback {
    pub fn new(cancel: CancellationSignal, sink: Arc<dyn AudioSink>) -> Self {
        Self { cancel, sink, aborted: Arc::new(AtomicBool::new(false)) }
    }

    /// Reset the abort latch before a new engine call.
    pub fn arm(&self) {
        self.aborted.store(false, Ordering::Release);
    }

    pub fn signal(&self) -> &CancellationSignal {
        &self.cancel
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    fn check_aborted(&self) -> bool {
        if self.is_aborted() {
            return true;
        }
        if self.cancel.is_set() {
            self.aborted.store(true, Ordering::Release);
            return true;
        }
        false
    }

    fn abort(&self) -> CallbackAction {
        self.aborted.store(true, Ordering::Release);
        CallbackAction::Abort
    }

    /// Handle one chunk of PCM bytes produced by the engine.
    pub fn on_audio(&self, pcm: &[u8]) -> CallbackAction {
        if self.check_aborted() {
            return CallbackAction::Abort;
        }
        if !pcm.is_empty() {
            match catch_unwind(AssertUnwindSafe(|| self.sink.feed(pcm))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("audio callback: {e}");
                    return self.abort();
                }
                Err(_) => {
                    error!("audio callback: sink panicked while feeding audio");
                    return self.abort();
                }
            }
        }
        if self.check_aborted() {
            CallbackAction::Abort
        } else {
            CallbackAction::Continue
        }
    }

    /// [`on_audio`](Self::on_audio) for engines that produce `i16` samples.
    pub fn on_samples(&self, samples: &[i16]) -> CallbackAction {
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.on_audio(&pcm)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WAV file sink
// ─────────────────────────────────────────────────────────────────────────────

/// Writes everything it is fed to a 16-bit mono WAV file.
///
/// A file has nothing to stop or pause, so those are no-ops; `idle` flushes
/// and `close` finalizes the header.
pub struct WavSink {
    writer: Mutex<Option<WavWriter<BufWriter<File>>>>,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)?;
        Ok(Self { writer: Mutex::new(Some(writer)) })
    }
}

impl AudioSink for WavSink {
    fn feed(&self, pcm: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| DriverError::Sink("WAV sink is closed".into()))?;
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        Ok(())
    }

    fn stop(&self) {}

    fn pause(&self, _paused: bool) {}

    fn idle(&self) {
        if let Some(writer) = self.writer.lock().as_mut() {
            if let Err(e) = writer.flush() {
                warn!("WAV sink: flush failed: {e}");
            }
        }
    }

    fn close(&self) {
        if let Some(writer) = self.writer.lock().take() {
            if let Err(e) = writer.finalize() {
                error!("WAV sink: finalize failed: {e}");
            }
        }
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        self.close();
    }
}
