//! Rule-based English lemmatizer.
//!
//! Lowercases, tokenizes on anything that is not a letter or digit, maps a
//! small table of irregular forms and strips regular inflections, putting back
//! a silent `e` where the stem lost one. Enough to make policy wording uniform
//! before classification.

use super::TextNormalizer;
use crate::error::CapabilityError;
use std::collections::HashMap;
use std::sync::LazyLock;

static IRREGULAR: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("is", "be"),
        ("are", "be"),
        ("am", "be"),
        ("was", "be"),
        ("were", "be"),
        ("been", "be"),
        ("being", "be"),
        ("has", "have"),
        ("had", "have"),
        ("having", "have"),
        ("does", "do"),
        ("did", "do"),
        ("done", "do"),
        ("made", "make"),
        ("sold", "sell"),
        ("kept", "keep"),
        ("gave", "give"),
        ("given", "give"),
        ("took", "take"),
        ("taken", "take"),
        ("children", "child"),
        ("people", "person"),
        ("data", "data"),
        ("cookies", "cookie"),
        ("used", "use"),
        ("using", "use"),
        ("us", "we"),
        ("our", "we"),
        ("ours", "we"),
    ])
});

/// Stems that lose an `e` the suffix rules cannot recover.
static E_STEMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("provid", "provide"),
        ("includ", "include"),
        ("exclud", "exclude"),
        ("decid", "decide"),
        ("disclos", "disclose"),
        ("purchas", "purchase"),
        ("releas", "release"),
        ("increas", "increase"),
        ("advertis", "advertise"),
        ("creat", "create"),
        ("remov", "remove"),
        ("chang", "change"),
        ("arrang", "arrange"),
        ("manag", "manage"),
        ("engag", "engage"),
        ("us", "use"),
    ])
});

/// Builtin `TextNormalizer`. Stateless and always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lemmatizer;

impl Lemmatizer {
    pub fn new() -> Self {
        Self
    }
}

impl TextNormalizer for Lemmatizer {
    fn normalize(&self, text: &str) -> Result<String, CapabilityError> {
        Ok(lemmatize(text))
    }
}

/// Lemmatize `text` into a space-separated token string.
pub fn lemmatize(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| lemma(&t.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn lemma(word: &str) -> String {
    if let Some(base) = IRREGULAR.get(word) {
        return base.to_string();
    }
    if word.chars().any(|c| c.is_ascii_digit()) || !word.is_ascii() {
        return word.to_string();
    }

    let len = word.len();
    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..len - 3]);
    }
    if word.ends_with("sses") {
        return word[..len - 2].to_string();
    }
    if len > 5 && word.ends_with("ing") {
        return verb_stem(&word[..len - 3]);
    }
    if len > 4 && word.ends_with("ed") && !word.ends_with("eed") {
        return verb_stem(&word[..len - 2]);
    }
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..len - 1].to_string();
    }
    word.to_string()
}

/// Base form of a stem left after `-ing`/`-ed`: undouble a final consonant
/// or restore a silent `e`, never both.
fn verb_stem(stem: &str) -> String {
    let undoubled = undouble(stem);
    if undoubled.len() != stem.len() {
        return undoubled;
    }
    if let Some(base) = E_STEMS.get(stem) {
        return base.to_string();
    }
    if needs_silent_e(stem) {
        return format!("{stem}e");
    }
    stem.to_string()
}

fn is_vowel(bytes: &[u8], i: usize) -> bool {
    match bytes[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => true,
        b'y' => i > 0 && !is_vowel(bytes, i - 1),
        _ => false,
    }
}

/// Number of vowel-consonant sequences (`tr-ee` 0, `sh-ar` 1, `op-en` 2).
fn measure(bytes: &[u8]) -> usize {
    (1..bytes.len())
        .filter(|&i| is_vowel(bytes, i - 1) && !is_vowel(bytes, i))
        .count()
}

/// `shar` -> `share`, `receiv` -> `receive`, `updat` -> `update`.
fn needs_silent_e(stem: &str) -> bool {
    let b = stem.as_bytes();
    let n = b.len();
    if n < 2 {
        return false;
    }
    let consonant = |i: usize| !is_vowel(b, i);

    // English words do not end in `v`; these endings almost always drop an `e`.
    const E_ENDINGS: [&str; 7] = ["bl", "iz", "yz", "uc", "rc", "nc", "dg"];
    if b[n - 1] == b'v' || E_ENDINGS.iter().any(|e| stem.ends_with(e)) {
        return true;
    }
    if n >= 3
        && consonant(n - 3)
        && ["at", "ur", "ir"].iter().any(|e| stem.ends_with(e))
    {
        return true;
    }
    // Short consonant-vowel-consonant stems: `shar`, `stor`, `fil`.
    n >= 3
        && measure(b) == 1
        && consonant(n - 3)
        && is_vowel(b, n - 2)
        && consonant(n - 1)
        && !matches!(b[n - 1], b'w' | b'x' | b'y')
}

/// `stopp` -> `stop`, leaving `ll`, `ss` and `ff` alone.
fn undouble(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 1] == bytes[n - 2] && !matches!(bytes[n - 1], b'l' | b's' | b'f') {
        let last = bytes[n - 1];
        if !matches!(last, b'a' | b'e' | b'i' | b'o' | b'u') {
            return stem[..n - 1].to_string();
        }
    }
    stem.to_string()
}
