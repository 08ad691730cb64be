//! Engine parameter record and the percent ↔ native-range mapping.
//!
//! The host sees every tunable as a percent in `[0, 100]`; the engine wants
//! its own integer ranges.  [`EngineConfig`] has the exact memory layout of the
//! engine's configuration struct so it can be handed across FFI unchanged.

use std::os::raw::c_int;

use crate::config::Parameters;

// ─────────────────────────────────────────────────────────────────────────────
// Ranges
// ─────────────────────────────────────────────────────────────────────────────

pub const RATE_MIN: i32 = 20;
/// The engine accepts up to 500, but output distorts audibly above 250.
pub const RATE_MAX: i32 = 250;
pub const PITCH_MIN: i32 = 50;
pub const PITCH_MAX: i32 = 300;
pub const INTONATION_MIN: i32 = 0;
pub const INTONATION_MAX: i32 = 140;

/// Playback speed multiplier applied when rate boost is on.
pub const RATE_BOOST_SPEED: f32 = 2.0;

// Flag bits of `EngineConfig::flags`.
pub const DEC_SEP_POINT: c_int = 1;
pub const DEC_SEP_COMMA: c_int = 2;
pub const USE_ALTERNATIVE_VOICE: c_int = 4;

/// Map a percent onto `[min, max]`, rounding to the nearest integer.
pub fn percent_to_param(percent: i32, min: i32, max: i32) -> i32 {
    let percent = percent.clamp(0, 100) as f64;
    (min as f64 + percent * (max - min) as f64 / 100.0).round() as i32
}

/// Map a native value back to a percent in `[0, 100]`.
pub fn param_to_percent(value: i32, min: i32, max: i32) -> i32 {
    if max == min {
        return 0;
    }
    let percent = ((value - min) as f64 * 100.0 / (max - min) as f64).round() as i32;
    percent.clamp(0, 100)
}

/// Valid general gap factor range at the given native speech rate.
///
/// The gap factor scales pauses, so its ceiling grows with the rate.
pub fn gap_factor_bounds(rate: i32) -> (i32, i32) {
    (0, 125 * rate / RATE_MIN)
}

// ─────────────────────────────────────────────────────────────────────────────
// EngineConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Mirror of the engine's `ru_tts_conf_t`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub speech_rate: c_int,
    pub voice_pitch: c_int,
    pub intonation: c_int,
    pub general_gap_factor: c_int,
    pub comma_gap_factor: c_int,
    pub dot_gap_factor: c_int,
    pub semicolon_gap_factor: c_int,
    pub colon_gap_factor: c_int,
    pub question_gap_factor: c_int,
    pub exclamation_gap_factor: c_int,
    pub intonational_gap_factor: c_int,
    pub flags: c_int,
}

impl Default for EngineConfig {
    /// The engine's own initial values (`ru_tts_config_init`).
    fn default() -> Self {
        Self {
            speech_rate: 100,
            voice_pitch: 100,
            intonation: 100,
            general_gap_factor: 100,
            comma_gap_factor: 100,
            dot_gap_factor: 100,
            semicolon_gap_factor: 100,
            colon_gap_factor: 100,
            question_gap_factor: 100,
            exclamation_gap_factor: 100,
            intonational_gap_factor: 100,
            flags: DEC_SEP_POINT | DEC_SEP_COMMA,
        }
    }
}

/// Fields that can be changed through the task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    SpeechRate,
    VoicePitch,
    Intonation,
    GeneralGapFactor,
    Flags,
}

impl EngineConfig {
    pub fn set(&mut self, field: ParamField, value: i32) {
        match field {
            ParamField::SpeechRate => self.speech_rate = value,
            ParamField::VoicePitch => self.voice_pitch = value,
            ParamField::Intonation => self.intonation = value,
            ParamField::GeneralGapFactor => self.general_gap_factor = value,
            ParamField::Flags => self.flags = value,
        }
    }

    pub fn get(&self, field: ParamField) -> i32 {
        match field {
            ParamField::SpeechRate => self.speech_rate,
            ParamField::VoicePitch => self.voice_pitch,
            ParamField::Intonation => self.intonation,
            ParamField::GeneralGapFactor => self.general_gap_factor,
            ParamField::Flags => self.flags,
        }
    }

    /// Overlay the user's punctuation pauses and decimal-separator flags.
    ///
    /// Flags are rebuilt from scratch: only the separators the user enabled
    /// survive, and the voice starts as the default one.
    pub fn apply_user_parameters(&mut self, params: &Parameters) {
        self.comma_gap_factor = params.comma_gap_factor.into();
        self.dot_gap_factor = params.dot_gap_factor.into();
        self.semicolon_gap_factor = params.semicolon_gap_factor.into();
        self.colon_gap_factor = params.colon_gap_factor.into();
        self.question_gap_factor = params.question_gap_factor.into();
        self.exclamation_gap_factor = params.exclamation_gap_factor.into();
        self.intonational_gap_factor = params.intonational_gap_factor.into();
        self.flags = 0;
        if params.dec_sep_point {
            self.flags |= DEC_SEP_POINT;
        }
        if params.dec_sep_comma {
            self.flags |= DEC_SEP_COMMA;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Voices
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Male,
    Female,
}

impl Voice {
    pub const ALL: [Voice; 2] = [Voice::Male, Voice::Female];

    /// Host-facing identifier (`"0"` / `"1"`).
    pub fn id(self) -> &'static str {
        match self {
            Voice::Male => "0",
            Voice::Female => "1",
        }
    }

    /// Name shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            Voice::Male => "Male",
            Voice::Female => "Female",
        }
    }

    pub fn from_id(id: &str) -> Option<Voice> {
        Voice::ALL.into_iter().find(|v| v.id() == id)
    }

    pub fn from_flags(flags: c_int) -> Voice {
        if flags & USE_ALTERNATIVE_VOICE != 0 {
            Voice::Female
        } else {
            Voice::Male
        }
    }

    /// `flags` with this voice's bit applied.
    pub fn apply_to(self, flags: c_int) -> c_int {
        match self {
            Voice::Male => flags & !USE_ALTERNATIVE_VOICE,
            Voice::Female => flags | USE_ALTERNATIVE_VOICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_round_trip() {
        for (min, max) in [(RATE_MIN, RATE_MAX), (PITCH_MIN, PITCH_MAX), (INTONATION_MIN, INTONATION_MAX)] {
            for p in 0..=100 {
                let v = percent_to_param(p, min, max);
                assert!((min..=max).contains(&v), "{} out of [{}, {}]", v, min, max);
                assert_eq!(param_to_percent(v, min, max), p, "range [{}, {}]", min, max);
            }
        }
    }

    #[test]
    fn test_percent_endpoints() {
        assert_eq!(percent_to_param(0, RATE_MIN, RATE_MAX), RATE_MIN);
        assert_eq!(percent_to_param(100, RATE_MIN, RATE_MAX), RATE_MAX);
        assert_eq!(percent_to_param(50, PITCH_MIN, PITCH_MAX), 175);
    }

    #[test]
    fn test_percent_clamped() {
        assert_eq!(percent_to_param(150, PITCH_MIN, PITCH_MAX), PITCH_MAX);
        assert_eq!(percent_to_param(-5, PITCH_MIN, PITCH_MAX), PITCH_MIN);
        assert_eq!(param_to_percent(500, RATE_MIN, RATE_MAX), 100);
        assert_eq!(param_to_percent(0, RATE_MIN, RATE_MAX), 0);
    }

    #[test]
    fn test_default_engine_values_as_percent() {
        let cfg = EngineConfig::default();
        assert_eq!(param_to_percent(cfg.speech_rate, RATE_MIN, RATE_MAX), 35);
        assert_eq!(param_to_percent(cfg.voice_pitch, PITCH_MIN, PITCH_MAX), 20);
        assert_eq!(param_to_percent(cfg.intonation, INTONATION_MIN, INTONATION_MAX), 71);
    }

    #[test]
    fn test_gap_factor_bounds_follow_rate() {
        assert_eq!(gap_factor_bounds(RATE_MIN), (0, 125));
        assert_eq!(gap_factor_bounds(100), (0, 625));
        assert_eq!(gap_factor_bounds(RATE_MAX), (0, 1562));
    }

    #[test]
    fn test_set_get() {
        let mut cfg = EngineConfig::default();
        cfg.set(ParamField::VoicePitch, 222);
        assert_eq!(cfg.get(ParamField::VoicePitch), 222);
        assert_eq!(cfg.voice_pitch, 222);
    }

    #[test]
    fn test_apply_user_parameters() {
        let mut cfg = EngineConfig::default();
        cfg.flags |= USE_ALTERNATIVE_VOICE;
        let params = Parameters { dot_gap_factor: 140, dec_sep_comma: false, ..Parameters::default() };
        cfg.apply_user_parameters(&params);
        assert_eq!(cfg.dot_gap_factor, 140);
        assert_eq!(cfg.flags, DEC_SEP_POINT);
    }

    #[test]
    fn test_voice_flags() {
        let flags = Voice::Female.apply_to(DEC_SEP_POINT);
        assert_eq!(Voice::from_flags(flags), Voice::Female);
        assert_eq!(flags & DEC_SEP_POINT, DEC_SEP_POINT, "other bits kept");
        assert_eq!(Voice::from_flags(Voice::Male.apply_to(flags)), Voice::Male);
        assert_eq!(Voice::from_id("1"), Some(Voice::Female));
        assert_eq!(Voice::from_id("2"), None);
        assert_eq!(Voice::Female.display_name(), "Female");
    }
}
