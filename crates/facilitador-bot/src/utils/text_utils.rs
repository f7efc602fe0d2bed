//! Text helpers shared by retrieval and prompt building

use std::borrow::Cow;

/// Spanish and English function words ignored by lexical retrieval
const STOP_WORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "del", "al", "y", "o", "u",
    "en", "por", "para", "con", "sin", "que", "qué", "cómo", "como", "es", "son", "se", "su",
    "sus", "mi", "mis", "me", "lo", "le", "les", "yo", "tu", "tú", "si", "sí", "no", "hay",
    "cual", "cuál", "cuales", "cuáles", "donde", "dónde", "cuando", "cuándo", "puedo", "debo",
    "the", "a", "an", "and", "or", "of", "to", "in", "is",
];

pub struct TextUtils;

impl TextUtils {
    /// First `max_chars` characters of `text`, never splitting a code point
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }

    /// Truncate to `max_chars` characters and append `...` when anything was cut
    pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
        let truncated = Self::truncate_chars(text, max_chars);
        if truncated.len() == text.len() {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(format!("{}...", truncated))
        }
    }

    /// Lowercased words worth matching on: alphanumeric, at least `min_len`
    /// characters, not a stop word
    pub fn significant_words(text: &str, min_len: usize) -> Vec<String> {
        let mut words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .filter(|w| Self::is_significant_word(w, min_len))
            .collect();
        words.sort();
        words.dedup();
        words
    }

    pub fn is_significant_word(word: &str, min_len: usize) -> bool {
        word.chars().count() >= min_len && !STOP_WORDS.contains(&word)
    }

    /// Title-case each whitespace separated word ("pérez zeledón" → "Pérez Zeledón")
    pub fn title_case(text: &str) -> String {
        text.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
