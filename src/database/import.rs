use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Database;

fn yes() -> bool {
    true
}

/// A catalog product as it appears in a fixture file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductRecord {
    product_name: String,
    product_code: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    category: Option<String>,
    cost_per_kg: Option<f64>,
    cost_currency: Option<String>,
    supplier: Option<String>,
    supplier_country: Option<String>,
    supplier_email: Option<String>,
    supplier_phone: Option<String>,
    supplier_address: Option<String>,
    #[serde(default)]
    is_standard_product: bool,
    created_at: Option<i64>,
    #[serde(default = "yes")]
    is_active: bool,
}

/// A feeding rule, tied to its product by product code.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RestrictionRecord {
    product_code: String,
    species: Option<String>,
    sex: Option<String>,
    min_age_months: Option<i64>,
    max_age_months: Option<i64>,
    breeding_cycle: Option<String>,
    lactation_cycle: Option<String>,
    production_focus: Option<String>,
    #[serde(default = "yes")]
    is_eligible: bool,
    max_perc_feed: Option<f64>,
    max_perc_conc: Option<f64>,
    #[serde(default = "yes")]
    is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Fixture {
    #[serde(default)]
    products: Vec<ProductRecord>,
    #[serde(default)]
    restrictions: Vec<RestrictionRecord>,
}

impl Fixture {
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid fixture {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) products: usize,
    pub(crate) restrictions: usize,
    /// Restrictions whose product code matched no product.
    pub(crate) skipped: usize,
}

impl Database {
    /// Loads a fixture in one transaction.
    pub(crate) fn import(&self, fixture: &Fixture) -> Result<ImportSummary> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut summary = ImportSummary::default();

        for product in &fixture.products {
            tx.execute(
                "INSERT INTO feed_products_sample (product_name, product_code, name, type, \
                 cost_per_kg, cost_currency, supplier, supplier_country, supplier_email, \
                 supplier_phone, supplier_address, is_standard_product, created_at, is_active) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    product.product_name,
                    product.product_code,
                    product.name.as_ref().unwrap_or(&product.product_name),
                    product.category,
                    product.cost_per_kg,
                    product.cost_currency,
                    product.supplier,
                    product.supplier_country,
                    product.supplier_email,
                    product.supplier_phone,
                    product.supplier_address,
                    product.is_standard_product,
                    product.created_at,
                    product.is_active,
                ],
            )?;
            summary.products += 1;
        }

        for rule in &fixture.restrictions {
            let inserted = tx.execute(
                "INSERT INTO feed_product_restrictions (product_id, species, sex, \
                 min_age_months, max_age_months, breeding_cycle, lactation_cycle, \
                 production_focus, is_eligible, max_perc_feed, max_perc_conc, is_active) \
                 SELECT id, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12 \
                 FROM feed_products_sample WHERE product_code = ?1 ORDER BY id LIMIT 1",
                params![
                    rule.product_code,
                    rule.species,
                    rule.sex,
                    rule.min_age_months,
                    rule.max_age_months,
                    rule.breeding_cycle,
                    rule.lactation_cycle,
                    rule.production_focus,
                    rule.is_eligible,
                    rule.max_perc_feed,
                    rule.max_perc_conc,
                    rule.is_active,
                ],
            )?;
            if inserted == 0 {
                warn!("No product with code {} for restriction", rule.product_code);
                summary.skipped += 1;
            } else {
                summary.restrictions += 1;
            }
        }

        tx.commit()?;
        info!(
            "Imported {} products and {} restrictions",
            summary.products, summary.restrictions
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::{database::Store, plan::SqlQuery};

    #[test]
    fn sample_fixture_summary() {
        let db = Database::open_in_memory().unwrap();
        let fixture: Fixture =
            serde_json::from_str(include_str!("../../fixtures/sample_catalog.json")).unwrap();
        let summary = db.import(&fixture).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                products: 16,
                restrictions: 4,
                skipped: 1,
            }
        );
    }

    #[test]
    fn defaults_for_missing_fields() {
        let db = Database::open_in_memory().unwrap();
        let fixture: Fixture = serde_json::from_value(json!({
            "products": [{ "product_name": "Salt", "product_code": "FP-020" }],
            "restrictions": [{ "product_code": "FP-020", "species": "sheep" }],
        }))
        .unwrap();
        db.import(&fixture).unwrap();

        let rows = db
            .execute(&SqlQuery::raw(
                "SELECT p.name, p.is_active, p.is_standard_product, r.is_eligible, \
                 r.is_active AS rule_active \
                 FROM feed_products_sample p JOIN feed_product_restrictions r ON p.id = r.product_id",
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
        let values: Vec<_> = rows[0].values().cloned().collect();
        assert_eq!(values, [json!("Salt"), json!(1), json!(0), json!(1), json!(1)]);
    }

    #[test]
    fn fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"products": [{{"product_name": "Urea"}}]}}"#).unwrap();
        let fixture = Fixture::from_path(file.path()).unwrap();
        assert_eq!(fixture.products.len(), 1);
        assert!(fixture.restrictions.is_empty());

        write!(file, "not json").unwrap();
        assert!(Fixture::from_path(file.path()).is_err());
    }
}
