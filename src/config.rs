//! Driver configuration — the user-editable part of the synthesizer setup.
//!
//! Stored as JSON; every field has a default so a partial (or empty) file is
//! valid:
//!
//! ```json
//! {
//!   "parameters": { "dot_gap_factor": 120, "use_unicode_normalization": true },
//!   "single_characters": { "б": "бэ" }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;

use crate::{charmap, engine::SAMPLE_RATE, normalize::NormalizationForm};

/// Sample rate handed to the sink unless configured otherwise.
pub const DEFAULT_SAMPLES_PER_SEC: u32 = SAMPLE_RATE;

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Engine parameters that are not exposed as percent settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub comma_gap_factor: u16,
    pub dot_gap_factor: u16,
    pub semicolon_gap_factor: u16,
    pub colon_gap_factor: u16,
    pub question_gap_factor: u16,
    pub exclamation_gap_factor: u16,
    pub intonational_gap_factor: u16,

    /// Treat `.` as a decimal separator.
    pub dec_sep_point: bool,
    /// Treat `,` as a decimal separator.
    pub dec_sep_comma: bool,

    pub use_unicode_normalization: bool,
    /// One of `NFC`, `NFKC`, `NFD`, `NFKD`.
    pub unicode_normalization_form: String,

    /// Output sample rate handed to the audio sink.
    pub samples_per_sec: u32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            comma_gap_factor: 100,
            dot_gap_factor: 100,
            semicolon_gap_factor: 100,
            colon_gap_factor: 100,
            question_gap_factor: 100,
            exclamation_gap_factor: 100,
            intonational_gap_factor: 100,
            dec_sep_point: true,
            dec_sep_comma: true,
            use_unicode_normalization: false,
            unicode_normalization_form: "NFC".to_string(),
            samples_per_sec: DEFAULT_SAMPLES_PER_SEC,
        }
    }
}

/// Full driver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub parameters: Parameters,

    /// Spoken names of characters read on their own.
    #[serde(default = "charmap::default_single_characters")]
    pub single_characters: HashMap<String, String>,

    /// Per-character substitutions inside longer text.
    #[serde(default = "charmap::default_characters")]
    pub characters: HashMap<String, String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            parameters: Parameters::default(),
            single_characters: charmap::default_single_characters(),
            characters: charmap::default_characters(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

impl DriverConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse driver configuration")
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// The Unicode normalisation form to apply, if enabled and valid.
    ///
    /// An unknown form name disables normalisation rather than failing.
    pub fn normalization_form(&self) -> Option<NormalizationForm> {
        let params = &self.parameters;
        if !params.use_unicode_normalization {
            return None;
        }
        match params.unicode_normalization_form.parse() {
            Ok(form) => Some(form),
            Err(_) => {
                warn!(
                    "unknown unicode normalization form {:?}; normalization disabled",
                    params.unicode_normalization_form
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_json_gives_defaults() {
        let cfg = DriverConfig::from_json("{}").unwrap();
        assert_eq!(cfg.parameters.dot_gap_factor, 100);
        assert_eq!(cfg.parameters.samples_per_sec, DEFAULT_SAMPLES_PER_SEC);
        assert!(cfg.parameters.dec_sep_point && cfg.parameters.dec_sep_comma);
        assert_eq!(cfg.single_characters.get("б").map(String::as_str), Some("бэ"));
        assert_eq!(cfg.characters.get("@").map(String::as_str), Some(" собака "));
    }

    #[test]
    fn test_partial_parameters() {
        let cfg = DriverConfig::from_json(r#"{"parameters": {"comma_gap_factor": 150}}"#).unwrap();
        assert_eq!(cfg.parameters.comma_gap_factor, 150);
        assert_eq!(cfg.parameters.colon_gap_factor, 100);
    }

    #[test]
    fn test_tables_replace_defaults() {
        let cfg = DriverConfig::from_json(r#"{"single_characters": {"а": "а-а"}}"#).unwrap();
        assert_eq!(cfg.single_characters.len(), 1);
        assert!(!cfg.characters.is_empty(), "characters keep their default");
    }

    #[test]
    fn test_negative_gap_factor_rejected() {
        assert!(DriverConfig::from_json(r#"{"parameters": {"dot_gap_factor": -1}}"#).is_err());
    }

    #[test]
    fn test_normalization_form() {
        let mut cfg = DriverConfig::default();
        assert_eq!(cfg.normalization_form(), None, "disabled by default");

        cfg.parameters.use_unicode_normalization = true;
        cfg.parameters.unicode_normalization_form = "NFKD".into();
        assert_eq!(cfg.normalization_form(), Some(NormalizationForm::Nfkd));

        cfg.parameters.unicode_normalization_form = "NFX".into();
        assert_eq!(cfg.normalization_form(), None, "unknown form disables");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"parameters": {{"dec_sep_comma": false}}}}"#).unwrap();
        let cfg = DriverConfig::load(file.path()).unwrap();
        assert!(!cfg.parameters.dec_sep_comma);
        assert!(cfg.parameters.dec_sep_point);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DriverConfig::load(Path::new("/nonexistent/rutts.json")).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot read config"), "got: {err:#}");
    }
}
