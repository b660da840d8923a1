//! Static Arabic/English term tables.
//!
//! Each vocabulary entry names one English canonical term and one or more
//! Arabic forms; the first Arabic form is the preferred one. Every Arabic form
//! maps to exactly one English term, and every English term maps back to its
//! preferred Arabic form, so English -> Arabic -> English is the identity.

use std::collections::HashMap;

use anyhow::{bail, Result};

pub(crate) struct Entry {
    pub(crate) english: &'static str,
    pub(crate) arabic: &'static [&'static str],
}

const fn entry(english: &'static str, arabic: &'static [&'static str]) -> Entry {
    Entry { english, arabic }
}

const PRODUCTS: &[Entry] = &[
    entry("Alfalfa", &["برسيم", "البرسيم"]),
    entry("Alfalfa hay", &["تبن البرسيم"]),
    entry("Wheat Straw", &["قش القمح"]),
    entry("Straw", &["قش"]),
    entry("Wheat", &["القمح", "قمح"]),
    entry("Barley", &["الشعير", "شعير"]),
    entry("Corn", &["الذرة", "ذرة"]),
    entry("Soybean", &["فول الصويا", "صويا"]),
    entry("Oat", &["الشوفان", "شوفان"]),
    entry("Oat Hay", &["تبن الشوفان"]),
    entry("Wheat Bran", &["نخالة القمح"]),
    entry("Bran", &["نخالة"]),
    entry("Cotton Seed", &["بذور القطن"]),
    entry("Cotton", &["قطن", "القطن"]),
    entry("Molasses", &["دبس السكر", "دبس"]),
    entry("Limestone", &["الحجر الجيري"]),
    entry("Salt", &["الملح", "ملح"]),
    entry("Urea", &["اليوريا"]),
    entry("Feed", &["علف"]),
    entry("Concentrate", &["علف مركز", "مركزات", "المركزات"]),
    entry("Fodder", &["علف خشن"]),
    entry("Additive", &["مضافات", "المضافات"]),
];

const REGIONS: &[Entry] = &[
    entry("UAE", &["الإمارات", "الامارات", "دبي", "أبوظبي"]),
    entry("Saudi Arabia", &["السعودية", "المملكة العربية السعودية"]),
    entry("Egypt", &["مصر"]),
    entry("Qatar", &["قطر"]),
    entry("Bahrain", &["البحرين"]),
    entry("Kuwait", &["الكويت"]),
    entry("Oman", &["عمان"]),
    entry("Jordan", &["الأردن", "الاردن"]),
    entry("Morocco", &["المغرب"]),
    entry("Tunisia", &["تونس"]),
    entry("Algeria", &["الجزائر"]),
    entry("Libya", &["ليبيا"]),
];

const PHRASES: &[Entry] = &[
    entry("who is selling", &["من يبيع", "من الذي يبيع"]),
    entry("where can I find", &["أين أجد", "اين اجد"]),
    entry("what is the price of", &["ما هو سعر", "ما سعر", "كم سعر"]),
    entry("what is", &["ما هو"]),
    entry("cheapest", &["أرخص", "الأرخص", "ارخص"]),
    entry("most expensive", &["الأغلى"]),
    entry("average price", &["متوسط السعر", "متوسط سعر"]),
    entry("average", &["متوسط"]),
    entry("best time", &["أفضل وقت", "افضل وقت"]),
    entry("to buy", &["للشراء", "لشراء"]),
    entry("supplier", &["المورد"]),
    entry("suppliers", &["الموردين"]),
    entry("in", &["في"]),
    entry("from", &["من"]),
    entry("what are", &["ما هي", "ماهي"]),
    entry("show", &["أظهر", "اظهر"]),
    entry("list", &["قائمة"]),
    entry("prices", &["أسعار", "اسعار", "الأسعار"]),
    entry("historical", &["تاريخي", "التاريخي"]),
    entry("price trend", &["اتجاه الأسعار"]),
    entry("restrictions", &["قيود", "القيود"]),
    entry("limits", &["حدود"]),
];

/// English product literals for entity extraction, specific before general.
const ENGLISH_PRODUCTS: &[&str] = &[
    "alfalfa hay",
    "alfalfa",
    "wheat straw",
    "wheat bran",
    "wheat grain",
    "barley flakes",
    "barley",
    "corn silage",
    "corn gluten",
    "corn",
    "soya bean meal",
    "soybean",
    "oat hay",
    "cotton seed",
    "beet pulp",
    "triticale",
    "molasses",
    "limestone",
    "salt",
    "urea",
    "maize",
];

/// English region literals for entity extraction, mapped to canonical names.
const ENGLISH_REGIONS: &[(&str, &str)] = &[
    ("uae", "UAE"),
    ("emirates", "UAE"),
    ("dubai", "UAE"),
    ("abu dhabi", "UAE"),
    ("saudi arabia", "Saudi Arabia"),
    ("saudi", "Saudi Arabia"),
    ("egypt", "Egypt"),
    ("qatar", "Qatar"),
    ("bahrain", "Bahrain"),
    ("kuwait", "Kuwait"),
    ("oman", "Oman"),
    ("jordan", "Jordan"),
    ("morocco", "Morocco"),
    ("tunisia", "Tunisia"),
    ("algeria", "Algeria"),
    ("libya", "Libya"),
];

/// One bidirectional vocabulary. Arabic-to-English lookups go through the
/// longest-first scan.
pub(crate) struct Vocabulary {
    to_arabic: HashMap<&'static str, &'static str>,
    // Arabic forms sorted by length, longest first.
    longest_first: Vec<(&'static str, &'static str)>,
}

impl Vocabulary {
    fn new(name: &str, entries: &'static [Entry]) -> Result<Self> {
        let mut to_english = HashMap::new();
        let mut to_arabic = HashMap::new();
        let mut longest_first = Vec::new();

        for entry in entries {
            let Some(preferred) = entry.arabic.first() else {
                bail!("{name}: `{}` has no Arabic form", entry.english);
            };
            if to_arabic.insert(entry.english, *preferred).is_some() {
                bail!("{name}: duplicate English term `{}`", entry.english);
            }
            for form in entry.arabic {
                if let Some(other) = to_english.insert(*form, entry.english) {
                    bail!(
                        "{name}: `{form}` maps to both `{other}` and `{}`",
                        entry.english
                    );
                }
                longest_first.push((*form, entry.english));
            }
        }

        // Stable sort keeps table order among forms of equal length.
        longest_first.sort_by_key(|(form, _)| std::cmp::Reverse(form.chars().count()));

        Ok(Self {
            to_arabic,
            longest_first,
        })
    }

    pub(crate) fn to_arabic(&self, english: &str) -> Option<&'static str> {
        self.to_arabic.get(english).copied()
    }

    /// `(arabic, english)` pairs, longest Arabic form first.
    pub(crate) fn longest_first(&self) -> &[(&'static str, &'static str)] {
        &self.longest_first
    }
}

/// Process-wide, read-only term tables. Built once at start-up.
pub(crate) struct Lexicon {
    pub(crate) products: Vocabulary,
    pub(crate) regions: Vocabulary,
    pub(crate) phrases: Vocabulary,
}

impl Lexicon {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            products: Vocabulary::new("products", PRODUCTS)?,
            regions: Vocabulary::new("regions", REGIONS)?,
            phrases: Vocabulary::new("phrases", PHRASES)?,
        })
    }

    pub(crate) fn english_products(&self) -> &'static [&'static str] {
        ENGLISH_PRODUCTS
    }

    pub(crate) fn english_regions(&self) -> &'static [(&'static str, &'static str)] {
        ENGLISH_REGIONS
    }
}
