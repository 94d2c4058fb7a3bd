//! Description normalization.
//!
//! Produces the canonical lowercase text the vectorizer was fitted on.
//! HTML entities are decoded and mojibake is repaired. Ligatures and
//! full-width forms are folded, and the text is composed to NFC. Then
//! everything that is neither a word character nor whitespace is dropped
//! and the result is lowercased.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

/// Upper bound on normalization passes; real input settles after one or two
const MAX_PASSES: usize = 4;

/// Windows-1252 characters in the 0x80..=0x9F byte range
const CP1252_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Latin ligatures folded to their letters
const LATIN_LIGATURES: [char; 24] = [
    'Ĳ', 'ĳ', 'Ŀ', 'ŀ', 'ŉ', 'Ǆ', 'ǅ', 'ǆ', 'Ǉ', 'ǈ', 'ǉ', 'Ǌ', 'ǋ', 'ǌ', 'Ǳ', 'ǲ', 'ǳ', 'ﬀ', 'ﬁ',
    'ﬂ', 'ﬃ', 'ﬄ', 'ﬅ', 'ﬆ',
];

/// Normalizes raw product descriptions before vectorization
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a description.
    ///
    /// Passes repeat until the text stops changing, so the output is a
    /// fixed point: normalizing it again returns it unchanged.
    pub fn normalize(&self, text: &str) -> String {
        let mut current = Self::single_pass(text);
        for _ in 1..MAX_PASSES {
            let next = Self::single_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn single_pass(text: &str) -> String {
        let unescaped = unescape_html(text);
        let repaired = repair_mojibake(&unescaped);
        let folded = fold_compatibility(&repaired);
        let composed: String = folded.nfc().collect();
        NON_WORD.replace_all(&composed, "").to_lowercase()
    }
}

/// Decode HTML entities unless the text looks like markup (contains `<`).
pub fn unescape_html(text: &str) -> Cow<'_, str> {
    if text.contains('<') || !text.contains('&') {
        return Cow::Borrowed(text);
    }
    html_escape::decode_html_entities(text)
}

/// Apply NFKC to Latin ligatures and the full-width/half-width block only.
///
/// Other compatibility characters (superscripts, fractions, ...) are kept.
pub fn fold_compatibility(text: &str) -> Cow<'_, str> {
    if !text.chars().any(needs_folding) {
        return Cow::Borrowed(text);
    }
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        if needs_folding(c) {
            folded.extend(std::iter::once(c).nfkc());
        } else {
            folded.push(c);
        }
    }
    Cow::Owned(folded)
}

fn needs_folding(c: char) -> bool {
    c == '\u{3000}' || ('\u{FF01}'..='\u{FFEF}').contains(&c) || LATIN_LIGATURES.contains(&c)
}

/// Undo UTF-8 text that was decoded as Windows-1252 / Latin-1.
///
/// The text is re-encoded to single bytes and decoded as UTF-8; if either
/// step fails the input is returned untouched. Applied until stable to
/// unwind double encodings.
pub fn repair_mojibake(text: &str) -> Cow<'_, str> {
    let mut current: Cow<'_, str> = Cow::Borrowed(text);
    loop {
        match redecode_once(&current) {
            Some(fixed) => current = Cow::Owned(fixed),
            None => return current,
        }
    }
}

fn redecode_once(text: &str) -> Option<String> {
    if text.is_ascii() {
        return None;
    }
    let bytes = text
        .chars()
        .map(single_byte)
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn single_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        code @ 0..=0xFF => Some(code as u8),
        _ => CP1252_HIGH
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|&(_, byte)| byte),
    }
}
