use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The two languages a question can be asked and answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Language {
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }

    pub(crate) fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "ar" | "arabic" => Some(Language::Arabic),
            "en" | "english" => Some(Language::English),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A secondary, statistical language signal consulted when the text carries
/// no Arabic script.
pub(crate) trait LanguageIdentifier: Send + Sync {
    fn identify(&self, text: &str) -> Result<Option<Language>>;
}

pub(crate) fn is_arabic_char(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// Arabic letters only; punctuation such as `؟` and `،` is excluded.
pub(crate) fn is_arabic_letter(c: char) -> bool {
    is_arabic_char(c) && c.is_alphabetic()
}

/// Classifies `text` as Arabic or English. Never fails: any identifier error
/// counts as "not Arabic".
pub(crate) fn detect(text: &str, identifier: Option<&dyn LanguageIdentifier>) -> Language {
    if text.chars().any(is_arabic_char) {
        return Language::Arabic;
    }

    if let Some(identifier) = identifier {
        match identifier.identify(text) {
            Ok(Some(Language::Arabic)) => return Language::Arabic,
            Ok(_) => {}
            Err(e) => debug!("language identifier failed: {e:#}"),
        }
    }

    Language::English
}

// Words that are common in chat-alphabet Arabic and rare in English.
const ARABIZI_WORDS: &[&str] = &[
    "shu", "shou", "esh", "eish", "wein", "fein", "kam", "mnein", "meen", "byebi3", "yebi3",
    "bibi3", "arkhas", "ar5as", "a7san", "ahsan", "wala", "3ala", "3an", "mawared", "mowared",
    "sha3eer", "shaeer", "tebn", "barseem", "bersim", "3alaf", "thura", "as3ar", "se3r", "sa3r",
    "mutawaset", "sama7t", "ya3ni", "7ala", "wa2t", "kwayes", "beddi", "biddi", "3ayez", "3awez",
];

/// Scores Latin-script tokens for chat-alphabet Arabic ("Arabizi"): known
/// Arabizi words, and letters mixed with the digits used for Arabic sounds
/// (`2 3 5 6 7 8 9`).
#[derive(Debug, Clone)]
pub(crate) struct ArabiziIdentifier {
    min_hits: usize,
    min_ratio: f32,
}

impl Default for ArabiziIdentifier {
    fn default() -> Self {
        Self {
            min_hits: 2,
            min_ratio: 0.4,
        }
    }
}

impl ArabiziIdentifier {
    fn is_arabizi_word(token: &str) -> bool {
        ARABIZI_WORDS.contains(&token)
    }

    // Quantities such as "5kg" start with a digit; Arabizi words start with a letter.
    fn has_sound_digit(token: &str) -> bool {
        token.starts_with(|c: char| c.is_ascii_alphabetic())
            && token
                .chars()
                .any(|c| matches!(c, '2' | '3' | '5' | '6' | '7' | '8' | '9'))
    }
}

impl LanguageIdentifier for ArabiziIdentifier {
    /// Digit-bearing tokens only count once a known Arabizi word is present,
    /// so product codes such as "a2" or "b12" alone never make text Arabic.
    fn identify(&self, text: &str) -> Result<Option<Language>> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| t.chars().any(|c| c.is_ascii_alphabetic()))
            .collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let words = tokens.iter().filter(|t| Self::is_arabizi_word(t)).count();
        if words == 0 {
            return Ok(Some(Language::English));
        }
        let hits = tokens
            .iter()
            .filter(|t| Self::is_arabizi_word(t) || Self::has_sound_digit(t))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = hits as f32 / tokens.len() as f32;
        debug!(words, hits, ratio, "arabizi score");

        if hits >= self.min_hits && ratio >= self.min_ratio {
            Ok(Some(Language::Arabic))
        } else {
            Ok(Some(Language::English))
        }
    }
}
