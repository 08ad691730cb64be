//! Text normalisation pipeline.
//!
//! Rewrites a raw text run into the form the `ru_tts` engine pronounces well:
//! lone characters read by name, Latin letters and consonant abbreviations
//! spelled out, digits split from following letters, symbols named, optional
//! dictionary pronunciations, parentheses silenced, the stress mark turned
//! into the engine's `+` notation and Braille cells described dot by dot.
//!
//! The order of the stages matters: every stage sees the output of the ones
//! before it.

use std::{borrow::Cow, collections::HashMap, fmt, str::FromStr};

use encoding_rs::KOI8_R;
use fancy_regex::{Captures as FancyCaptures, Regex as FancyRegex};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use crate::{
    charmap,
    config::DriverConfig,
    error::DriverError,
    lookup::{pronounce, PronunciationLookup},
};

/// Combining acute accent — the stress mark.
const STRESS_MARK: char = '\u{0301}';

/// Braille dot names, bit 0 first.
const BRAILLE_DOT_LABELS: [&str; 8] = [
    "первая", "вторая", "третья", "четвёртая", "пятая", "шестая", "седьмая", "восьмая",
];
const BRAILLE_BLANK: &str = " брайлевский пробел ";
const BRAILLE_FULL_CELL: &str = " брайлевское восьмиточие ";

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

static RE_SINGLE_LATIN: Lazy<FancyRegex> =
    Lazy::new(|| FancyRegex::new(r"(?i)(?<![а-яёa-z])[a-z](?![а-яёa-z])").unwrap());
static RE_ABBREVIATION: Lazy<FancyRegex> = Lazy::new(|| {
    FancyRegex::new(r"(?i)(?<![а-яёa-z])[bcdfghjklmnpqrstvwxzбвгджзклмнпрстфхцчшщ]{2,}(?![а-яёa-z])")
        .unwrap()
});
static RE_LETTER_AFTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d[а-яёa-z]").unwrap());
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[а-яё\x{0301}]+").unwrap());
static RE_BRAILLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{2800}-\x{28FF}]").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Unicode normalisation forms
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationForm {
    Nfc,
    Nfkc,
    Nfd,
    Nfkd,
}

impl NormalizationForm {
    pub fn apply(self, text: &str) -> String {
        match self {
            NormalizationForm::Nfc => text.nfc().collect(),
            NormalizationForm::Nfkc => text.nfkc().collect(),
            NormalizationForm::Nfd => text.nfd().collect(),
            NormalizationForm::Nfkd => text.nfkd().collect(),
        }
    }
}

impl FromStr for NormalizationForm {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NFC" => Ok(NormalizationForm::Nfc),
            "NFKC" => Ok(NormalizationForm::Nfkc),
            "NFD" => Ok(NormalizationForm::Nfd),
            "NFKD" => Ok(NormalizationForm::Nfkd),
            other => Err(DriverError::Config(format!("unknown normalization form {other:?}"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NormalizedText
// ─────────────────────────────────────────────────────────────────────────────

/// Text restricted to what the engine can read.
///
/// Characters outside KOI8-R (the engine's encoding) are replaced with `?`
/// on construction, and NUL (which would end the engine's C string) with a
/// space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let bytes = encode_koi8r(&text.replace('\0', " "));
        let (decoded, _) = KOI8_R.decode_without_bom_handling(&bytes);
        NormalizedText(decoded.into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The text in the engine's native encoding.
    pub fn to_koi8r(&self) -> Vec<u8> {
        encode_koi8r(&self.0)
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode `text` as KOI8-R, writing `?` for unrepresentable characters.
pub fn encode_koi8r(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (bytes, _, unmappable) = KOI8_R.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

fn spoken<'a>(names: &'a HashMap<String, String>, c: char) -> Cow<'a, str> {
    let key = charmap::key(c);
    match names.get(&key) {
        Some(name) => Cow::Borrowed(name.as_str()),
        None => Cow::Owned(key),
    }
}

/// Replace a stand-alone Latin letter by its name.
pub fn spell_single_latin(text: &str, names: &HashMap<String, String>) -> String {
    RE_SINGLE_LATIN
        .replace_all(text, |caps: &FancyCaptures| {
            caps[0].chars().map(|c| spoken(names, c)).collect::<String>()
        })
        .into_owned()
}

/// Spell out consonant-only abbreviations letter by letter.
pub fn spell_abbreviations(text: &str, names: &HashMap<String, String>) -> String {
    RE_ABBREVIATION
        .replace_all(text, |caps: &FancyCaptures| {
            caps[0].chars().map(|c| spoken(names, c)).collect::<Vec<_>>().join(" ")
        })
        .into_owned()
}

/// Separate a digit from a letter that immediately follows it.
pub fn space_letters_after_digits(text: &str) -> String {
    RE_LETTER_AFTER_DIGIT
        .replace_all(text, |caps: &Captures| {
            caps[0].chars().map(String::from).collect::<Vec<_>>().join(" ")
        })
        .into_owned()
}

/// Substitute every character found in `table`; others pass through.
pub fn substitute_characters(text: &str, table: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match table.get(&charmap::key(c)) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Replace Cyrillic words with their dictionary pronunciation.
pub fn apply_dictionary(text: &str, lookup: &dyn PronunciationLookup) -> String {
    RE_WORD
        .replace_all(text, |caps: &Captures| pronounce(lookup, &caps[0]).into_owned())
        .into_owned()
}

/// Silence parentheses and convert the stress mark to `+`.
pub fn remap_decorations(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '(' | ')' => ' ',
            STRESS_MARK => '+',
            c => c,
        })
        .collect()
}

/// Spoken description of one Braille cell.
pub fn braille_cell_description(cell: char) -> String {
    let pattern = (cell as u32).wrapping_sub(0x2800);
    let labels: Vec<&str> = BRAILLE_DOT_LABELS
        .iter()
        .enumerate()
        .filter(|&(bit, _)| pattern >> bit & 1 == 1)
        .map(|(_, &label)| label)
        .collect();
    match labels.len() {
        0 => BRAILLE_BLANK.to_string(),
        8 => BRAILLE_FULL_CELL.to_string(),
        1 => format!(" {} брайлевская точка ", labels[0]),
        _ => format!(" {} брайлевские точки ", labels.join(" ")),
    }
}

/// Describe every Braille cell in `text`.
pub fn describe_braille(text: &str) -> Cow<'_, str> {
    RE_BRAILLE.replace_all(text, |caps: &Captures| {
        caps[0].chars().map(braille_cell_description).collect::<String>()
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// TextNormalizer — full pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Tables and options the normaliser works with.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub form: Option<NormalizationForm>,
    pub single_characters: HashMap<String, String>,
    pub characters: HashMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            form: None,
            single_characters: charmap::default_single_characters(),
            characters: charmap::default_characters(),
        }
    }
}

impl From<&DriverConfig> for NormalizerConfig {
    fn from(config: &DriverConfig) -> Self {
        Self {
            form: config.normalization_form(),
            single_characters: config.single_characters.clone(),
            characters: config.characters.clone(),
        }
    }
}

pub struct TextNormalizer {
    pub config: NormalizerConfig,
    dictionary: Option<Box<dyn PronunciationLookup>>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::with_config(NormalizerConfig::default())
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config, dictionary: None }
    }

    pub fn with_dictionary(mut self, dictionary: Box<dyn PronunciationLookup>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn has_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Release the dictionary handle.
    pub fn close_dictionary(&mut self) {
        self.dictionary = None;
    }

    /// Normalise one text run.  `use_dictionary` is the user's switch; it has
    /// no effect without a dictionary.
    pub fn normalize(&self, text: &str, use_dictionary: bool) -> NormalizedText {
        let cfg = &self.config;
        let text = text.trim();
        if text.is_empty() {
            return NormalizedText::default();
        }

        let mut text = match cfg.form {
            Some(form) => form.apply(text),
            None => text.to_string(),
        };

        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(name) = cfg.single_characters.get(&charmap::key(c)) {
                text = name.clone();
            }
        } else {
            text = spell_single_latin(&text, &cfg.single_characters);
            text = spell_abbreviations(&text, &cfg.single_characters);
            text = space_letters_after_digits(&text);
            text = substitute_characters(&text, &cfg.characters);
        }

        if use_dictionary {
            if let Some(dictionary) = &self.dictionary {
                text = apply_dictionary(&text, dictionary.as_ref());
            }
        }

        text = remap_decorations(&text);
        NormalizedText::new(&describe_braille(&text))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MapLookup;

    fn normalize(text: &str) -> String {
        TextNormalizer::new().normalize(text, false).as_str().to_string()
    }

    fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(normalize("").is_empty());
        assert!(normalize("  \t\n").is_empty());
    }

    #[test]
    fn test_single_character() {
        assert_eq!(normalize("б"), "бэ");
        assert_eq!(normalize("Б"), "бэ");
        assert_eq!(normalize(" 7 "), "семь", "trimmed before the length check");
        assert_eq!(normalize("?"), "вопросительный знак");
    }

    #[test]
    fn test_single_character_bypasses_run_rules() {
        let config = NormalizerConfig {
            form: None,
            single_characters: table(&[("а", "бв")]),
            characters: table(&[("б", "Z")]),
        };
        let out = TextNormalizer::with_config(config).normalize("а", false);
        assert_eq!(out.as_str(), "бв", "no abbreviation or character rule may fire");
    }

    #[test]
    fn test_unknown_single_character_kept() {
        assert_eq!(normalize("ё"), "ё");
        assert_eq!(normalize("Ж"), "жэ");
    }

    #[test]
    fn test_parentheses_become_spaces() {
        assert_eq!(normalize("(5)"), " 5 ");
    }

    #[test]
    fn test_single_latin_letter() {
        assert_eq!(normalize("буква x здесь"), "буква экс здесь");
        assert_eq!(normalize("дом.A"), "дом.эй");
        assert_eq!(normalize("слово yes"), "слово yes", "letters inside words untouched");
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(normalize("в СССР"), "в эс эс эс эр");
        assert_eq!(normalize("файл txt"), "файл ти экс ти");
        assert_eq!(normalize("МГУ открыт"), "МГУ открыт", "vowel breaks the cluster");
    }

    #[test]
    fn test_letter_after_digit() {
        assert_eq!(normalize("10мин"), "10 мин");
        assert_eq!(normalize("5кг"), "5 ка гэ");
        assert_eq!(normalize("2 3"), "2 3");
    }

    #[test]
    fn test_characters_substituted() {
        assert_eq!(normalize("почта@сайт"), "почта собака сайт");
        assert_eq!(normalize("а+б"), "а плюс б");
    }

    #[test]
    fn test_stress_mark() {
        assert_eq!(normalize("за\u{301}мок"), "за+мок");
    }

    #[test]
    fn test_dictionary() {
        let dict: MapLookup = [("замок", "за\u{301}мок")].into_iter().collect();
        let normalizer = TextNormalizer::new().with_dictionary(Box::new(dict));
        assert!(normalizer.has_dictionary());
        assert_eq!(normalizer.normalize("старый Замок", true).as_str(), "старый за+мок");
        assert_eq!(normalizer.normalize("старый Замок", false).as_str(), "старый Замок");
    }

    #[test]
    fn test_dictionary_switch_without_dictionary() {
        assert_eq!(TextNormalizer::new().normalize("старый замок", true).as_str(), "старый замок");
    }

    #[test]
    fn test_close_dictionary() {
        let dict: MapLookup = [("дом", "до+м")].into_iter().collect();
        let mut normalizer = TextNormalizer::new().with_dictionary(Box::new(dict));
        normalizer.close_dictionary();
        assert!(!normalizer.has_dictionary());
        assert_eq!(normalizer.normalize("мой дом", true).as_str(), "мой дом");
    }

    #[test]
    fn test_braille() {
        assert_eq!(normalize("\u{2800}"), BRAILLE_BLANK);
        assert_eq!(normalize("\u{28FF}"), BRAILLE_FULL_CELL);
        assert_eq!(normalize("\u{2801}"), " первая брайлевская точка ");
        assert_eq!(normalize("\u{2803}"), " первая вторая брайлевские точки ");
        assert_eq!(
            normalize("а\u{2880}"),
            "а восьмая брайлевская точка "
        );
    }

    #[test]
    fn test_unicode_normalization() {
        // и + combining breve composes to й under NFC.
        let decomposed = "мои\u{306} дом";
        assert_eq!(normalize(decomposed), "мои? дом");

        let config = NormalizerConfig { form: Some(NormalizationForm::Nfc), ..NormalizerConfig::default() };
        let out = TextNormalizer::with_config(config).normalize(decomposed, false);
        assert_eq!(out.as_str(), "мой дом");
    }

    #[test]
    fn test_idempotent_on_plain_text() {
        let plain = "привет, как дела";
        let once = normalize(plain);
        assert_eq!(once, plain);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalized_text_encoding() {
        assert_eq!(NormalizedText::new("日本 ёлка").as_str(), "?? ёлка");
        let koi = NormalizedText::new("Ёж").to_koi8r();
        assert_eq!(koi, vec![0xB3, 0xD6]);
    }

    #[test]
    fn test_nul_does_not_reach_engine() {
        let text = NormalizedText::new("до\0после");
        assert_eq!(text.as_str(), "до после");
        assert!(!text.to_koi8r().contains(&0), "got: {:?}", text.to_koi8r());
        assert_eq!(normalize("раз\0два"), "раз два");
    }

    #[test]
    fn test_form_from_str() {
        assert_eq!("NFKC".parse::<NormalizationForm>().unwrap(), NormalizationForm::Nfkc);
        assert!("nfc".parse::<NormalizationForm>().is_err());
    }
}
