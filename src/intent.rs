use std::fmt;

use serde::Serialize;

use crate::{extract::Entities, plan::QueryPlan, synthesis};

/// The purpose of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Intent {
    Cheapest,
    Average,
    HistoricalTrend,
    SupplierLookup,
    Listing,
    RestrictionLookup,
    GenericSearch,
}

impl Intent {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Intent::Cheapest => "cheapest",
            Intent::Average => "average",
            Intent::HistoricalTrend => "historical_trend",
            Intent::SupplierLookup => "supplier_lookup",
            Intent::Listing => "listing",
            Intent::RestrictionLookup => "restriction_lookup",
            Intent::GenericSearch => "generic_search",
        }
    }

    /// Report header, in English; the renderer localizes it.
    pub(crate) fn header(self) -> &'static str {
        match self {
            Intent::Cheapest => "Cheapest suppliers",
            Intent::Average => "Average prices",
            Intent::HistoricalTrend => "Best time to buy",
            Intent::SupplierLookup => "Suppliers",
            Intent::Listing => "Products",
            Intent::RestrictionLookup => "Restrictions",
            Intent::GenericSearch => "Results",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the plan for an intent from the extracted entities and the
/// lowercased question.
pub(crate) type Synthesizer = fn(&Entities, &str) -> (QueryPlan, String);

pub(crate) struct Rule {
    pub(crate) intent: Intent,
    pub(crate) triggers: &'static [&'static str],
    pub(crate) synthesize: Synthesizer,
}

/// Classification rules in priority order. The first rule with a trigger
/// contained in the lowercased question wins.
pub(crate) const RULES: &[Rule] = &[
    Rule {
        intent: Intent::Cheapest,
        triggers: &["cheapest", "lowest price", "best price", "أرخص", "الأرخص"],
        synthesize: synthesis::cheapest,
    },
    Rule {
        intent: Intent::Average,
        triggers: &["average", "mean", "متوسط"],
        synthesize: synthesis::average,
    },
    Rule {
        intent: Intent::HistoricalTrend,
        triggers: &[
            "best time",
            "when to buy",
            "historical",
            "price trend",
            "أفضل وقت",
            "تاريخي",
        ],
        synthesize: synthesis::historical_trend,
    },
    Rule {
        intent: Intent::SupplierLookup,
        triggers: &["who sell", "who is selling", "supplier", "من يبيع", "المورد"],
        synthesize: synthesis::supplier_lookup,
    },
    Rule {
        intent: Intent::Listing,
        triggers: &["list", "show", "what products", "available", "أظهر", "قائمة"],
        synthesize: synthesis::listing,
    },
    Rule {
        intent: Intent::RestrictionLookup,
        triggers: &["restriction", "limit", "قيود", "حدود"],
        synthesize: synthesis::restriction_lookup,
    },
];

const DEFAULT_RULE: Rule = Rule {
    intent: Intent::GenericSearch,
    triggers: &[],
    synthesize: synthesis::generic_search,
};

/// Never fails: a question no rule claims is a generic search.
pub(crate) fn classify(lowered: &str) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| lowered.contains(t)))
        .unwrap_or(&DEFAULT_RULE)
}

/// Product categories of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    Fodder,
    Concentrate,
    Additive,
}

impl Category {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Category::Fodder => "Fodder",
            Category::Concentrate => "Concentrate",
            Category::Additive => "Additive",
        }
    }
}

const CATEGORY_TRIGGERS: &[(Category, &[&str])] = &[
    (Category::Fodder, &["fodder", "علف خشن"]),
    (Category::Concentrate, &["concentrate", "علف مركز"]),
    (Category::Additive, &["additive", "مضاف"]),
];

/// Category named in the question, independent of the intent triggers.
pub(crate) fn infer_category(lowered: &str) -> Option<Category> {
    CATEGORY_TRIGGERS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| lowered.contains(t)))
        .map(|(category, _)| *category)
}
