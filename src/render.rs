use std::{fmt::Display, sync::Arc};

use anyhow::Result;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::{database::Row, language::Language, lexicon::Lexicon};

const NO_RESULTS_EN: &str = "No results found";
const NO_RESULTS_AR: &str = "لم يتم العثور على نتائج";

const HEADERS: &[(&str, &str)] = &[
    ("Results", "النتائج"),
    ("Cheapest suppliers", "أرخص الموردين"),
    ("Average prices", "متوسط الأسعار"),
    ("Price trends", "اتجاهات الأسعار"),
    ("Best time to buy", "أفضل وقت للشراء"),
    ("Suppliers", "الموردين"),
    ("Products", "المنتجات"),
    ("Restrictions", "القيود"),
];

// Row labels, each rendered as "<label>:".
const LABELS: &[(&str, &str)] = &[
    ("Max feed %", "الحد الأقصى في العلف %"),
    ("Max conc %", "الحد الأقصى في المركز %"),
    ("Avg", "المتوسط"),
    ("Min", "الحد الأدنى"),
    ("Max", "الحد الأقصى"),
    ("Species", "الفصيلة"),
    ("Email", "البريد الإلكتروني"),
    ("Phone", "الهاتف"),
];

/// Turns result rows into a numbered, language-matched report.
pub(crate) struct Renderer {
    lexicon: Arc<Lexicon>,
    labels: Regex,
    per_kg: Regex,
}

impl Renderer {
    pub(crate) fn new(lexicon: Arc<Lexicon>) -> Result<Self> {
        let alternatives: Vec<String> = LABELS.iter().map(|(en, _)| regex::escape(en)).collect();
        Ok(Self {
            lexicon,
            labels: Regex::new(&format!(r"\b({}):", alternatives.join("|")))?,
            per_kg: Regex::new(r"/kg\b")?,
        })
    }

    pub(crate) fn render(&self, rows: &[Row], header: &str, language: Language) -> String {
        if rows.is_empty() {
            return no_results(language).to_string();
        }

        let mut lines = vec![format!("{}:", self.header(header, language)), String::new()];
        for (i, row) in rows.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, self.line(row, language).join(" ")));
        }
        let report = lines.join("\n");

        match language {
            Language::English => report,
            Language::Arabic => self.translate_labels(&report),
        }
    }

    fn header(&self, label: &str, language: Language) -> String {
        let label = label.trim().trim_end_matches(':').trim();
        let label = if label.is_empty() { "Results" } else { label };
        match language {
            Language::English => label.to_string(),
            Language::Arabic => HEADERS
                .iter()
                .find(|(en, _)| *en == label)
                .map_or(label, |(_, ar)| *ar)
                .to_string(),
        }
    }

    /// Fragments of one row, in a fixed field order.
    fn line(&self, row: &Row, language: Language) -> Vec<String> {
        let mut parts = Vec::new();
        let currency = text(row, "cost_currency").unwrap_or_else(|| "USD".to_string());

        if let Some(month) = text(row, "month") {
            parts.push(month);
        }
        if let Some(supplier) = text(row, "supplier") {
            parts.push(supplier);
        }
        if let Some(product) = text(row, "product_name") {
            parts.push(product);
        }
        if let Some(country) = text(row, "supplier_country") {
            parts.push(format!("({})", self.localize_region(&country, language)));
        }
        if let Some(cost) = number(row, "cost_per_kg").filter(|cost| *cost != 0.0) {
            parts.push(format!("- {currency} {cost:.2}/kg"));
        }
        if let Some(avg) = number(row, "avg_price") {
            parts.push(format!("Avg: {currency} {avg:.2}"));
        }
        if let Some(min) = number(row, "min_price") {
            parts.push(format!("Min: {min:.2}"));
        }
        if let Some(max) = number(row, "max_price") {
            parts.push(format!("Max: {max:.2}"));
        }
        if let Some(category) = text(row, "type") {
            parts.push(format!("[{}]", self.localize_category(&category, language)));
        }
        if let Some(species) = text(row, "species") {
            parts.push(format!("Species: {species}"));
        }
        if let Some(cap) = number(row, "max_perc_feed").filter(|cap| *cap != 0.0) {
            parts.push(format!("Max feed %: {}", plain(cap)));
        }
        if let Some(cap) = number(row, "max_perc_conc").filter(|cap| *cap != 0.0) {
            parts.push(format!("Max conc %: {}", plain(cap)));
        }
        if let Some(email) = text(row, "supplier_email") {
            parts.push(format!("Email: {email}"));
        }
        if let Some(phone) = text(row, "supplier_phone") {
            parts.push(format!("Phone: {phone}"));
        }
        parts
    }

    fn localize_region(&self, region: &str, language: Language) -> String {
        let localized = match language {
            Language::Arabic => self.lexicon.regions.to_arabic(region).unwrap_or(region),
            Language::English => region,
        };
        localized.to_string()
    }

    fn localize_category(&self, category: &str, language: Language) -> String {
        let localized = match language {
            Language::Arabic => self.lexicon.products.to_arabic(category).unwrap_or(category),
            Language::English => category,
        };
        localized.to_string()
    }

    // Labels only; data values never end in a colon.
    fn translate_labels(&self, report: &str) -> String {
        let report = self.labels.replace_all(report, |caps: &Captures<'_>| {
            let label = &caps[1];
            let arabic = LABELS
                .iter()
                .find(|(en, _)| *en == label)
                .map_or(label, |(_, ar)| *ar);
            format!("{arabic}:")
        });
        self.per_kg.replace_all(&report, "/كجم").into_owned()
    }
}

pub(crate) fn no_results(language: Language) -> &'static str {
    match language {
        Language::English => NO_RESULTS_EN,
        Language::Arabic => NO_RESULTS_AR,
    }
}

pub(crate) fn database_error(language: Language, error: impl Display) -> String {
    match language {
        Language::English => format!("Database error: {error}"),
        Language::Arabic => format!("خطأ في قاعدة البيانات: {error}"),
    }
}

pub(crate) fn processing_error(language: Language, error: impl Display) -> String {
    match language {
        Language::English => format!("Error processing query: {error}"),
        Language::Arabic => format!("حدث خطأ: {error}"),
    }
}

fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn plain(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(Arc::new(Lexicon::new().unwrap())).unwrap()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn cheapest_row() -> Row {
        row(json!({
            "product_name": "Wheat Straw",
            "supplier": "Gulf Fodder Trading",
            "supplier_country": "UAE",
            "cost_per_kg": 0.85,
            "cost_currency": "AED",
            "supplier_email": "sales@gulffodder.ae",
            "supplier_phone": null,
        }))
    }

    #[test]
    fn empty_results_use_the_sentinel() {
        let renderer = renderer();
        assert_eq!(
            renderer.render(&[], "Cheapest suppliers", Language::English),
            "No results found"
        );
        assert_eq!(
            renderer.render(&[], "Cheapest suppliers", Language::Arabic),
            "لم يتم العثور على نتائج"
        );
    }

    #[test]
    fn english_report() {
        let report = renderer().render(&[cheapest_row()], "Cheapest suppliers", Language::English);
        assert_eq!(
            report,
            "Cheapest suppliers:\n\n\
             1. Gulf Fodder Trading Wheat Straw (UAE) - AED 0.85/kg Email: sales@gulffodder.ae"
        );
    }

    #[test]
    fn arabic_report_translates_labels_not_values() {
        let report = renderer().render(&[cheapest_row()], "Cheapest suppliers", Language::Arabic);
        assert_eq!(
            report,
            "أرخص الموردين:\n\n\
             1. Gulf Fodder Trading Wheat Straw (الإمارات) - AED 0.85/كجم البريد الإلكتروني: sales@gulffodder.ae"
        );
    }

    #[test]
    fn aggregate_rows() {
        let rows = vec![row(json!({
            "supplier_country": "Saudi Arabia",
            "cost_currency": "SAR",
            "avg_price": 1.2,
            "min_price": 1,
            "max_price": 1.456,
            "supplier_count": 3,
        }))];
        let english = renderer().render(&rows, "Average prices", Language::English);
        assert_eq!(
            english,
            "Average prices:\n\n1. (Saudi Arabia) Avg: SAR 1.20 Min: 1.00 Max: 1.46"
        );
        let arabic = renderer().render(&rows, "Average prices", Language::Arabic);
        assert!(arabic.starts_with("متوسط الأسعار:"));
        assert!(arabic.contains("(السعودية) المتوسط: SAR 1.20 الحد الأدنى: 1.00 الحد الأقصى: 1.46"));
    }

    #[test]
    fn month_leads_and_category_is_localized() {
        let rows = vec![row(json!({
            "month": "2024-03",
            "product_name": "Barley",
            "type": "Fodder",
            "avg_price": 0.9,
            "cost_currency": "QAR",
        }))];
        assert_eq!(
            renderer().render(&rows, "Best time to buy", Language::English),
            "Best time to buy:\n\n1. 2024-03 Barley Avg: QAR 0.90 [Fodder]"
        );
        assert_eq!(
            renderer().render(&rows, "Best time to buy", Language::Arabic),
            "أفضل وقت للشراء:\n\n1. 2024-03 Barley المتوسط: QAR 0.90 [علف خشن]"
        );
    }

    #[test]
    fn restriction_rows() {
        let rows = vec![row(json!({
            "product_name": "Urea",
            "type": "Additive",
            "species": "cattle",
            "max_perc_feed": 1.0,
            "max_perc_conc": 2.5,
        }))];
        assert_eq!(
            renderer().render(&rows, "Restrictions", Language::English),
            "Restrictions:\n\n1. Urea [Additive] Species: cattle Max feed %: 1 Max conc %: 2.5"
        );
    }

    #[test]
    fn arabic_restriction_labels_are_distinct() {
        let rows = vec![row(json!({
            "product_name": "Urea",
            "type": "Additive",
            "species": "cattle",
            "max_perc_feed": 1.0,
        }))];
        assert_eq!(
            renderer().render(&rows, "Restrictions", Language::Arabic),
            "القيود:\n\n1. Urea [مضافات] الفصيلة: cattle الحد الأقصى في العلف %: 1"
        );
    }

    #[test]
    fn unknown_headers_pass_through() {
        let rows = vec![cheapest_row()];
        let report = renderer().render(&rows, "Here are the cheapest suppliers:", Language::Arabic);
        assert!(report.starts_with("Here are the cheapest suppliers:\n\n1. "));
        let report = renderer().render(&rows, "", Language::English);
        assert!(report.starts_with("Results:\n\n"));
    }

    #[test]
    fn supplier_names_are_not_labels() {
        let rows = vec![row(json!({ "supplier": "Max Feeds", "product_name": "Salt" }))];
        assert_eq!(
            renderer().render(&rows, "Suppliers", Language::Arabic),
            "الموردين:\n\n1. Max Feeds Salt"
        );
    }

    #[test]
    fn localized_errors() {
        assert_eq!(
            database_error(Language::English, "no such column: foo"),
            "Database error: no such column: foo"
        );
        assert_eq!(
            database_error(Language::Arabic, "no such column: foo"),
            "خطأ في قاعدة البيانات: no such column: foo"
        );
        assert_eq!(processing_error(Language::Arabic, "boom"), "حدث خطأ: boom");
    }
}
