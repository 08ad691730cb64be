//! Built-in character tables.
//!
//! Two tables drive the character-level rules of the normaliser:
//!
//! * **single characters** — how a character is read when it is spoken on its
//!   own (a lone letter, digit or punctuation mark), and how letters are spelled
//!   out inside abbreviations;
//! * **characters** — substitutions applied to every character of a longer run
//!   (symbols the engine would otherwise skip).
//!
//! Keys are lower-case.  A user configuration may replace either table.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Spoken form of characters read in isolation.
const SINGLE_CHARACTERS: &[(&str, &str)] = &[
    // Cyrillic
    ("а", "а"), ("б", "бэ"), ("в", "вэ"), ("г", "гэ"), ("д", "дэ"),
    ("е", "е"), ("ё", "ё"), ("ж", "жэ"), ("з", "зэ"), ("и", "и"),
    ("й", "и краткое"), ("к", "ка"), ("л", "эль"), ("м", "эм"), ("н", "эн"),
    ("о", "о"), ("п", "пэ"), ("р", "эр"), ("с", "эс"), ("т", "тэ"),
    ("у", "у"), ("ф", "эф"), ("х", "ха"), ("ц", "цэ"), ("ч", "чэ"),
    ("ш", "ша"), ("щ", "ща"), ("ъ", "твёрдый знак"), ("ы", "ы"),
    ("ь", "мягкий знак"), ("э", "э"), ("ю", "ю"), ("я", "я"),
    // Latin
    ("a", "эй"), ("b", "би"), ("c", "си"), ("d", "ди"), ("e", "и"),
    ("f", "эф"), ("g", "джи"), ("h", "эйч"), ("i", "ай"), ("j", "джей"),
    ("k", "кей"), ("l", "эл"), ("m", "эм"), ("n", "эн"), ("o", "оу"),
    ("p", "пи"), ("q", "кью"), ("r", "ар"), ("s", "эс"), ("t", "ти"),
    ("u", "ю"), ("v", "ви"), ("w", "дабл ю"), ("x", "экс"), ("y", "уай"),
    ("z", "зед"),
    // Digits
    ("0", "ноль"), ("1", "один"), ("2", "два"), ("3", "три"), ("4", "четыре"),
    ("5", "пять"), ("6", "шесть"), ("7", "семь"), ("8", "восемь"), ("9", "девять"),
    // Punctuation and symbols
    (" ", "пробел"), (".", "точка"), (",", "запятая"), (";", "точка с запятой"),
    (":", "двоеточие"), ("!", "восклицательный знак"), ("?", "вопросительный знак"),
    ("-", "дефис"), ("—", "тире"), ("(", "левая скобка"), (")", "правая скобка"),
    ("[", "левая квадратная скобка"), ("]", "правая квадратная скобка"),
    ("{", "левая фигурная скобка"), ("}", "правая фигурная скобка"),
    ("\"", "кавычка"), ("'", "апостроф"), ("«", "открывающая кавычка"),
    ("»", "закрывающая кавычка"), ("@", "собака"), ("#", "решётка"),
    ("$", "доллар"), ("%", "процент"), ("&", "амперсанд"), ("*", "звёздочка"),
    ("+", "плюс"), ("=", "равно"), ("<", "меньше"), (">", "больше"),
    ("/", "косая черта"), ("\\", "обратная косая черта"), ("|", "вертикальная черта"),
    ("_", "подчёркивание"), ("~", "тильда"), ("^", "крышка"), ("`", "обратный апостроф"),
    ("№", "номер"), ("§", "параграф"), ("€", "евро"), ("…", "многоточие"),
];

/// Substitutions applied to every character of a multi-character run.
///
/// Digits and parentheses are deliberately absent: the engine reads numbers
/// itself and parentheses are silenced later in the pipeline.
const CHARACTERS: &[(&str, &str)] = &[
    ("@", " собака "), ("#", " решётка "), ("$", " доллар "), ("%", " процент "),
    ("&", " амперсанд "), ("*", " звёздочка "), ("+", " плюс "), ("=", " равно "),
    ("<", " меньше "), (">", " больше "), ("/", " косая черта "),
    ("\\", " обратная косая черта "), ("|", " вертикальная черта "),
    ("_", " подчёркивание "), ("~", " тильда "), ("^", " крышка "),
    ("№", " номер "), ("§", " параграф "), ("€", " евро "),
];

static DEFAULT_SINGLE_CHARACTERS: Lazy<HashMap<String, String>> = Lazy::new(|| to_map(SINGLE_CHARACTERS));
static DEFAULT_CHARACTERS: Lazy<HashMap<String, String>> = Lazy::new(|| to_map(CHARACTERS));

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())).collect()
}

/// A fresh copy of the built-in single-character table.
pub fn default_single_characters() -> HashMap<String, String> {
    DEFAULT_SINGLE_CHARACTERS.clone()
}

/// A fresh copy of the built-in multi-character substitution table.
pub fn default_characters() -> HashMap<String, String> {
    DEFAULT_CHARACTERS.clone()
}

/// Lower-case a single character into a table key.
pub fn key(c: char) -> String {
    c.to_lowercase().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_not_empty() {
        assert!(!DEFAULT_SINGLE_CHARACTERS.is_empty());
        assert!(!DEFAULT_CHARACTERS.is_empty());
    }

    #[test]
    fn test_keys_are_single_lowercase_chars() {
        for (k, _) in SINGLE_CHARACTERS.iter().chain(CHARACTERS) {
            assert_eq!(k.chars().count(), 1, "key {:?} is not a single char", k);
            assert_eq!(&key(k.chars().next().unwrap()), k, "key {:?} is not lower-case", k);
        }
    }

    #[test]
    fn test_keys_unique() {
        assert_eq!(DEFAULT_SINGLE_CHARACTERS.len(), SINGLE_CHARACTERS.len());
        assert_eq!(DEFAULT_CHARACTERS.len(), CHARACTERS.len());
    }

    #[test]
    fn test_every_latin_letter_has_a_name() {
        for c in 'a'..='z' {
            assert!(DEFAULT_SINGLE_CHARACTERS.contains_key(&key(c)), "missing {}", c);
        }
    }

    #[test]
    fn test_characters_leave_digits_and_parentheses() {
        for c in "0123456789()".chars() {
            assert!(!DEFAULT_CHARACTERS.contains_key(&key(c)), "{} must pass through", c);
        }
    }

    #[test]
    fn test_key_lowercases() {
        assert_eq!(key('Б'), "б");
        assert_eq!(key('Q'), "q");
    }
}
