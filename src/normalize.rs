use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    language::{is_arabic_letter, Language},
    lexicon::{Lexicon, Vocabulary},
    translator::Translator,
};

/// Rewrites Arabic questions into the English surface form the intent rules
/// understand.
pub(crate) struct Normalizer {
    lexicon: Arc<Lexicon>,
    translator: Option<Arc<dyn Translator>>,
}

impl Normalizer {
    pub(crate) fn new(lexicon: Arc<Lexicon>, translator: Option<Arc<dyn Translator>>) -> Self {
        Self {
            lexicon,
            translator,
        }
    }

    pub(crate) fn has_translator(&self) -> bool {
        self.translator.is_some()
    }

    /// Returns English text unchanged. Arabic text goes through the product,
    /// region and phrase passes, then through the translator if Arabic letters
    /// remain. A translator failure keeps the partially normalized text.
    pub(crate) async fn normalize(&self, text: &str, language: Language) -> String {
        if language == Language::English {
            return text.to_string();
        }

        let partial = self.apply_lexicon(text);
        debug!(%partial, "lexicon passes applied");
        if !has_arabic_residue(&partial) {
            return partial;
        }

        let Some(translator) = &self.translator else {
            return partial;
        };
        match translator
            .translate(&partial, Language::Arabic, Language::English)
            .await
        {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => partial,
            Err(e) => {
                warn!("translator unavailable: {e:#}");
                partial
            }
        }
    }

    pub(crate) fn apply_lexicon(&self, text: &str) -> String {
        let text = replace_longest(text, &self.lexicon.products, false);
        let text = replace_longest(&text, &self.lexicon.regions, false);
        replace_longest(&text, &self.lexicon.phrases, true)
    }
}

pub(crate) fn has_arabic_residue(text: &str) -> bool {
    text.chars().any(is_arabic_letter)
}

/// Scans `text` left to right, replacing at each position the longest
/// vocabulary term that starts there. With `whole_words`, a term only matches
/// when it is not attached to other Arabic letters.
fn replace_longest(text: &str, vocabulary: &Vocabulary, whole_words: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut rest = text;

    'scan: while let Some(c) = rest.chars().next() {
        let at_boundary = previous.map_or(true, |p| !is_arabic_letter(p));
        if !whole_words || at_boundary {
            for (arabic, english) in vocabulary.longest_first() {
                let Some(after) = rest.strip_prefix(arabic) else {
                    continue;
                };
                if whole_words && after.chars().next().is_some_and(is_arabic_letter) {
                    continue;
                }
                out.push_str(english);
                previous = english.chars().last();
                rest = after;
                continue 'scan;
            }
        }
        out.push(c);
        previous = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}
