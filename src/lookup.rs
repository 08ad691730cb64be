//! Pronunciation dictionary capability.
//!
//! The dictionary itself is an external service (the native `rulex` database
//! behind the `native` feature, or any host-provided implementation).  This
//! module only defines the capability and the word-level adapter the
//! normaliser uses: lower-case the key, skip oversized keys, fall back to the
//! original word on a miss.

use std::{borrow::Cow, collections::HashMap, path::Path};

use anyhow::{Context, Result};

/// Longest key (in KOI8-R bytes, one per character) the dictionary accepts.
pub const MAX_KEY_LEN: usize = 50;

/// A word → pronunciation lookup service.
pub trait PronunciationLookup: Send + Sync {
    /// Replacement pronunciation for a lower-case `key`, or `None` if unknown.
    fn search(&self, key: &str) -> Option<String>;
}

/// Pronunciation of `word`: the dictionary entry if there is one, otherwise
/// the word itself.  Never fails.
pub fn pronounce<'a>(lookup: &dyn PronunciationLookup, word: &'a str) -> Cow<'a, str> {
    let key = word.to_lowercase();
    if key.chars().count() > MAX_KEY_LEN {
        return Cow::Borrowed(word);
    }
    match lookup.search(&key) {
        Some(replacement) => Cow::Owned(replacement),
        None => Cow::Borrowed(word),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory dictionary
// ─────────────────────────────────────────────────────────────────────────────

/// Dictionary held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MapLookup {
    entries: HashMap<String, String>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; the key is stored lower-cased.
    pub fn insert(&mut self, word: &str, pronunciation: impl Into<String>) {
        self.entries.insert(word.to_lowercase(), pronunciation.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a JSON object of `word → pronunciation` pairs.
    pub fn load_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read dictionary: {}", path.display()))?;
        let raw: HashMap<String, String> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse dictionary: {}", path.display()))?;
        Ok(raw.into_iter().collect())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MapLookup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut lookup = MapLookup::new();
        for (k, v) in iter {
            lookup.insert(k.as_ref(), v);
        }
        lookup
    }
}

impl PronunciationLookup for MapLookup {
    fn search(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hit_and_miss() {
        let dict: MapLookup = [("замок", "за+мок")].into_iter().collect();
        assert_eq!(pronounce(&dict, "замок"), "за+мок");
        assert_eq!(pronounce(&dict, "дом"), "дом");
    }

    #[test]
    fn test_key_is_lowercased() {
        let dict: MapLookup = [("Замок", "за+мок")].into_iter().collect();
        assert_eq!(pronounce(&dict, "ЗАМОК"), "за+мок");
    }

    #[test]
    fn test_miss_keeps_original_case() {
        let dict = MapLookup::new();
        assert_eq!(pronounce(&dict, "Москва"), "Москва");
    }

    struct Counting(AtomicUsize);

    impl PronunciationLookup for Counting {
        fn search(&self, _key: &str) -> Option<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Some("x".into())
        }
    }

    #[test]
    fn test_long_key_not_queried() {
        let dict = Counting(AtomicUsize::new(0));
        let long = "а".repeat(MAX_KEY_LEN + 1);
        assert_eq!(pronounce(&dict, &long), long);
        assert_eq!(dict.0.load(Ordering::SeqCst), 0);

        let limit = "а".repeat(MAX_KEY_LEN);
        assert_eq!(pronounce(&dict, &limit), "x");
        assert_eq!(dict.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Мука": "му+ка"}}"#).unwrap();
        let dict = MapLookup::load_json(file.path()).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.search("мука").as_deref(), Some("му+ка"));
    }
}
