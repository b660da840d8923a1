use crate::lexicon::Lexicon;

/// The product and region a question is about. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Entities {
    pub(crate) product: Option<String>,
    pub(crate) region: Option<String>,
}

impl Entities {
    pub(crate) fn extract(lexicon: &Lexicon, text: &str) -> Self {
        Self {
            product: extract_product(lexicon, text),
            region: extract_country(lexicon, text),
        }
    }
}

/// The first English product literal contained in `text`, compared without
/// case, else the canonical English name of the longest Arabic product term
/// present.
pub(crate) fn extract_product(lexicon: &Lexicon, text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some(product) = lexicon
        .english_products()
        .iter()
        .find(|literal| lowered.contains(*literal))
    {
        return Some((*product).to_string());
    }
    lexicon
        .products
        .longest_first()
        .iter()
        .find(|(arabic, _)| text.contains(arabic))
        .map(|(_, english)| (*english).to_string())
}

/// Canonical region name for the first region literal in `text`.
pub(crate) fn extract_country(lexicon: &Lexicon, text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some((_, canonical)) = lexicon
        .english_regions()
        .iter()
        .find(|(literal, _)| contains_word(&lowered, literal))
    {
        return Some((*canonical).to_string());
    }
    lexicon
        .regions
        .longest_first()
        .iter()
        .find(|(arabic, _)| text.contains(arabic))
        .map(|(_, english)| (*english).to_string())
}

// Short region literals such as "uae" and "oman" must not fire inside other
// words ("romania", "woman").
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_products() {
        let lexicon = Lexicon::new().unwrap();
        let cases = [
            ("Who is selling the cheapest Wheat Straw?", Some("wheat straw")),
            ("price of ALFALFA HAY in Dubai", Some("alfalfa hay")),
            ("corn silage prices", Some("corn silage")),
            ("average corn price", Some("corn")),
            ("what is available", None),
        ];
        for (text, expected) in cases {
            assert_eq!(extract_product(&lexicon, text).as_deref(), expected, "{text}");
        }
    }

    #[test]
    fn arabic_products_fall_back_to_lexicon() {
        let lexicon = Lexicon::new().unwrap();
        assert_eq!(
            extract_product(&lexicon, "من يبيع قش القمح").as_deref(),
            Some("Wheat Straw")
        );
        assert_eq!(
            extract_product(&lexicon, "أسعار تبن البرسيم").as_deref(),
            Some("Alfalfa hay")
        );
        assert_eq!(extract_product(&lexicon, "كتاب").as_deref(), None);
    }

    #[test]
    fn regions() {
        let lexicon = Lexicon::new().unwrap();
        let cases = [
            ("average price of barley in UAE", Some("UAE")),
            ("suppliers in Saudi Arabia", Some("Saudi Arabia")),
            ("barley from dubai", Some("UAE")),
            ("a woman asked about salt", None),
            ("الشعير في مصر", Some("Egypt")),
            ("Wheat Straw", None),
        ];
        for (text, expected) in cases {
            assert_eq!(extract_country(&lexicon, text).as_deref(), expected, "{text}");
        }
    }

    #[test]
    fn one_entity_of_each_kind() {
        let lexicon = Lexicon::new().unwrap();
        let entities = Entities::extract(&lexicon, "cheapest barley in qatar");
        assert_eq!(
            entities,
            Entities {
                product: Some("barley".to_string()),
                region: Some("Qatar".to_string()),
            }
        );
    }
}
