//! Bindings to the native `ru_tts` engine wrapper and the `rulex`
//! pronunciation database.
//!
//! Only compiled with the `native` feature; `build.rs` takes care of linking,
//! so there is no `#[link]` attribute here.
//!
//! ## Engine callback
//!
//! `tts_create` takes a bare C function pointer and invokes it with a null
//! user-data pointer, so the Rust side of the callback lives in a
//! process-wide slot.  That limits a process to one [`NativeEngine`] at a
//! time; a second [`NativeEngine::create`] fails until the first is dropped.

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_float, c_int, c_void},
    panic::{catch_unwind, AssertUnwindSafe},
    path::Path,
    ptr::NonNull,
    slice,
};

use encoding_rs::KOI8_R;
use log::{debug, warn};
use parking_lot::{const_mutex, Mutex};

use crate::{
    audio::{AudioCallback, CallbackAction},
    engine::SynthesisEngine,
    error::{DriverError, Result},
    lookup::{PronunciationLookup, MAX_KEY_LEN},
    normalize::{encode_koi8r, NormalizedText},
    params::EngineConfig,
};

// ─── FFI bindings ─────────────────────────────────────────────────────────────

#[repr(C)]
struct TtsInstance {
    _private: [u8; 0],
}

#[repr(C)]
struct RulexDb {
    _private: [u8; 0],
}

/// `ru_tts_callback`: `size` counts 16-bit samples.  Non-zero aborts synthesis.
type WaveConsumer = extern "C" fn(buffer: *mut c_void, size: usize, user_data: *mut c_void) -> c_int;

extern "C" {
    /// Fill `config` with the engine defaults.
    fn ru_tts_config_init(config: *mut EngineConfig);

    /// Returns `NULL` if initialisation failed.
    fn tts_create(consumer: WaveConsumer) -> *mut TtsInstance;
    fn tts_destroy(tts: *mut TtsInstance);

    /// `text` is KOI8-R.  Feeds the consumer synchronously, in chunks.
    fn tts_speak(tts: *const TtsInstance, config: *const EngineConfig, text: *const c_char);
    fn tts_setVolume(tts: *const TtsInstance, volume: c_float);
    fn tts_setSpeed(tts: *const TtsInstance, speed: c_float);

    /// Keeps `path` for the lifetime of the handle.  Returns `NULL` on failure.
    fn rulexdb_open(path: *const c_char, mode: c_int) -> *mut RulexDb;
    /// Writes the NUL-terminated KOI8-R pronunciation into `buffer`.
    fn rulexdb_search(db: *mut RulexDb, key: *const c_char, buffer: *mut c_char, flags: c_int) -> c_int;
    fn rulexdb_close(db: *mut RulexDb);
}

const RULEXDB_SEARCH: c_int = 0;
const RULEXDB_SUCCESS: c_int = 0;
const RULEXDB_BUFSIZE: usize = 256;

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Callback of the live engine instance.
static CALLBACK: Mutex<Option<AudioCallback>> = const_mutex(None);

extern "C" fn wave_consumer(buffer: *mut c_void, size: usize, _user_data: *mut c_void) -> c_int {
    // Unwinding across the C frames is undefined behaviour.
    let action = catch_unwind(AssertUnwindSafe(|| {
        let slot = CALLBACK.lock();
        let Some(callback) = slot.as_ref() else {
            return CallbackAction::Abort;
        };
        if buffer.is_null() || size == 0 {
            return callback.on_audio(&[]);
        }
        let samples = unsafe { slice::from_raw_parts(buffer as *const i16, size) };
        callback.on_samples(samples)
    }));
    action.unwrap_or(CallbackAction::Abort) as c_int
}

/// The `ru_tts` engine (with its `sonic` speed stage).
pub struct NativeEngine {
    tts: NonNull<TtsInstance>,
}

// The instance is only ever used from one thread at a time (the worker).
unsafe impl Send for NativeEngine {}

impl NativeEngine {
    pub fn create(callback: AudioCallback) -> Result<Self> {
        let mut slot = CALLBACK.lock();
        if slot.is_some() {
            return Err(DriverError::EngineInit("an ru_tts engine already exists in this process".into()));
        }
        let tts = NonNull::new(unsafe { tts_create(wave_consumer) })
            .ok_or_else(|| DriverError::EngineInit("tts_create returned NULL".into()))?;
        *slot = Some(callback);
        debug!("ru_tts engine created");
        Ok(Self { tts })
    }
}

impl SynthesisEngine for NativeEngine {
    fn init_config(&self, config: &mut EngineConfig) {
        unsafe { ru_tts_config_init(config) };
    }

    fn speak(&mut self, config: &EngineConfig, text: &NormalizedText) -> Result<()> {
        let text = CString::new(text.to_koi8r())
            .map_err(|_| DriverError::Engine("text contains a NUL character".into()))?;
        unsafe { tts_speak(self.tts.as_ptr(), config, text.as_ptr()) };
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        unsafe { tts_setVolume(self.tts.as_ptr(), volume) };
    }

    fn set_speed(&mut self, speed: f32) {
        unsafe { tts_setSpeed(self.tts.as_ptr(), speed) };
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        unsafe { tts_destroy(self.tts.as_ptr()) };
        CALLBACK.lock().take();
        debug!("ru_tts engine destroyed");
    }
}

// ─── Dictionary ───────────────────────────────────────────────────────────────

/// Read-only handle to a `rulex` pronunciation database.
pub struct RulexDictionary {
    db: NonNull<RulexDb>,
    /// Referenced by the open handle.
    _path: CString,
    /// Result buffer; also serialises searches on the handle.
    buffer: Mutex<Vec<u8>>,
}

// Every use of `db` goes through the `buffer` lock.
unsafe impl Send for RulexDictionary {}
unsafe impl Sync for RulexDictionary {}

impl RulexDictionary {
    pub fn open(path: &Path) -> Result<Self> {
        let path = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| DriverError::Dictionary(format!("bad database path {}", path.display())))?;
        let db = NonNull::new(unsafe { rulexdb_open(path.as_ptr(), RULEXDB_SEARCH) }).ok_or_else(|| {
            DriverError::Dictionary(format!("failed to open {}", path.to_string_lossy()))
        })?;
        debug!("rulex database opened: {}", path.to_string_lossy());
        Ok(Self { db, _path: path, buffer: Mutex::new(vec![0; RULEXDB_BUFSIZE]) })
    }
}

impl PronunciationLookup for RulexDictionary {
    fn search(&self, key: &str) -> Option<String> {
        let key = encode_koi8r(key);
        if key.len() > MAX_KEY_LEN {
            return None;
        }
        let key = CString::new(key).ok()?;

        let mut buffer = self.buffer.lock();
        buffer.fill(0);
        let rc = unsafe {
            rulexdb_search(self.db.as_ptr(), key.as_ptr(), buffer.as_mut_ptr() as *mut c_char, 0)
        };
        if rc != RULEXDB_SUCCESS {
            return None;
        }
        match CStr::from_bytes_until_nul(&buffer) {
            Ok(found) => Some(KOI8_R.decode_without_bom_handling(found.to_bytes()).0.into_owned()),
            Err(_) => {
                warn!("rulex: unterminated result for {key:?}");
                None
            }
        }
    }
}

impl Drop for RulexDictionary {
    fn drop(&mut self) {
        unsafe { rulexdb_close(self.db.as_ptr()) };
        debug!("rulex database closed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests (need the native libraries)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::AudioSink, queue::CancellationSignal};
    use std::{ptr, sync::Arc};

    #[derive(Default)]
    struct Collect(Mutex<Vec<u8>>);

    impl AudioSink for Collect {
        fn feed(&self, pcm: &[u8]) -> Result<()> {
            self.0.lock().extend_from_slice(pcm);
            Ok(())
        }
        fn stop(&self) {}
        fn pause(&self, _paused: bool) {}
        fn idle(&self) {}
        fn close(&self) {}
    }

    // One test, because the callback slot is process-wide.
    #[test]
    fn test_engine_lifecycle() {
        assert_eq!(wave_consumer(ptr::null_mut(), 0, ptr::null_mut()), CallbackAction::Abort as c_int);

        let sink = Arc::new(Collect::default());
        let signal = CancellationSignal::new();
        let callback = AudioCallback::new(signal.clone(), sink.clone());

        let mut engine = NativeEngine::create(callback.clone()).unwrap();
        assert!(NativeEngine::create(callback.clone()).is_err(), "one engine per process");

        let mut config = EngineConfig::default();
        engine.init_config(&mut config);
        engine.speak(&config, &NormalizedText::new("привет")).unwrap();
        let spoken = sink.0.lock().len();
        assert!(spoken > 0, "engine produced no audio");
        assert_eq!(spoken % 2, 0);

        signal.set();
        engine.speak(&config, &NormalizedText::new("тишина")).unwrap();
        assert_eq!(sink.0.lock().len(), spoken, "cancelled speech must not reach the sink");

        drop(engine);
        let engine = NativeEngine::create(callback);
        assert!(engine.is_ok(), "slot released on drop");
    }

    #[test]
    fn test_missing_dictionary() {
        let missing = RulexDictionary::open(Path::new("/nonexistent/rulex.db"));
        assert!(matches!(missing, Err(DriverError::Dictionary(_))));
    }
}
