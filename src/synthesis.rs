//! Per-intent query plans, and the structured catalog lookups.

use crate::{
    extract::Entities,
    intent::{self, infer_category, Intent},
    plan::{
        Direction::{Asc, Desc},
        Filter, QueryPlan,
        Source::{Catalog, CatalogWithRules},
        HISTORICAL_MARKER,
    },
};

/// Result of classifying and planning one question.
#[derive(Debug, Clone)]
pub(crate) struct Synthesis {
    pub(crate) intent: Intent,
    pub(crate) plan: QueryPlan,
    pub(crate) explanation: String,
}

pub(crate) fn synthesize(question: &str, entities: &Entities) -> Synthesis {
    let lowered = question.to_lowercase();
    let rule = intent::classify(&lowered);
    let (plan, explanation) = (rule.synthesize)(entities, &lowered);
    Synthesis {
        intent: rule.intent,
        plan,
        explanation,
    }
}

fn contains(column: &'static str) -> impl FnOnce(String) -> Filter {
    move |value| Filter::Contains { column, value }
}

fn region_is(value: String) -> Filter {
    Filter::Equals {
        column: "supplier_country",
        value,
    }
}

fn subject(entities: &Entities) -> &str {
    entities.product.as_deref().unwrap_or("products")
}

pub(crate) fn cheapest(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        Catalog,
        &[
            "product_name",
            "supplier",
            "supplier_country",
            "cost_per_kg",
            "cost_currency",
            "supplier_email",
            "supplier_phone",
        ],
    )
    .filter_if(entities.product.clone(), contains("product_name"))
    .filter_if(entities.region.clone(), region_is)
    .filter(Filter::Flag("is_active"))
    .filter(Filter::NotNull("supplier"))
    .order_by("cost_per_kg", Asc)
    .limit(10);
    (
        plan,
        format!("Finding cheapest suppliers for {}", subject(entities)),
    )
}

pub(crate) fn average(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        Catalog,
        &[
            "supplier_country",
            "cost_currency",
            "ROUND(AVG(cost_per_kg), 2) AS avg_price",
            "ROUND(MIN(cost_per_kg), 2) AS min_price",
            "ROUND(MAX(cost_per_kg), 2) AS max_price",
            "COUNT(*) AS supplier_count",
        ],
    )
    .filter_if(entities.product.clone(), contains("product_name"))
    .filter_if(entities.region.clone(), region_is)
    .filter(Filter::Flag("is_active"))
    .group_by(&["supplier_country", "cost_currency"])
    .order_by("avg_price", Asc);
    (
        plan,
        format!("Calculating average prices for {}", subject(entities)),
    )
}

/// Historical rows are selected by marker regardless of the active flag.
pub(crate) fn historical_trend(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        Catalog,
        &[
            "strftime('%Y-%m', created_at, 'unixepoch') AS month",
            "ROUND(AVG(cost_per_kg), 2) AS avg_price",
            "cost_currency",
            "supplier_country",
        ],
    )
    .filter_if(entities.product.clone(), contains("product_name"))
    .filter(Filter::Marked {
        column: "product_code",
        marker: HISTORICAL_MARKER,
    })
    .filter_if(entities.region.clone(), region_is)
    .group_by(&["month", "supplier_country", "cost_currency"])
    .order_by("avg_price", Asc)
    .limit(10);
    (
        plan,
        format!("Finding best time to buy {}", subject(entities)),
    )
}

/// One row per supplier and region, carrying that supplier's lowest price.
pub(crate) fn supplier_lookup(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        Catalog,
        &[
            "supplier",
            "supplier_country",
            "supplier_email",
            "supplier_phone",
            "product_name",
            "MIN(cost_per_kg) AS cost_per_kg",
            "cost_currency",
        ],
    )
    .filter_if(entities.product.clone(), contains("product_name"))
    .filter_if(entities.region.clone(), region_is)
    .filter(Filter::Flag("is_active"))
    .filter(Filter::NotNull("supplier"))
    .group_by(&["supplier", "supplier_country"])
    .order_by("supplier_country", Asc)
    .order_by("cost_per_kg", Asc)
    .limit(15);
    (
        plan,
        format!("Finding suppliers for {}", subject(entities)),
    )
}

pub(crate) fn listing(entities: &Entities, lowered: &str) -> (QueryPlan, String) {
    let category = infer_category(lowered);
    let plan = QueryPlan::new(
        Catalog,
        &[
            "product_name",
            "type",
            "ROUND(AVG(cost_per_kg), 2) AS avg_price",
            "cost_currency",
        ],
    )
    .filter_if(category, |category| Filter::Equals {
        column: "type",
        value: category.as_str().to_string(),
    })
    .filter_if(entities.region.clone(), region_is)
    .filter(Filter::Flag("is_active"))
    .group_by(&["product_name", "type", "cost_currency"])
    .order_by("type", Asc)
    .order_by("product_name", Asc)
    .limit(30);
    let listed = category.map_or("all", |category| category.as_str());
    (plan, format!("Listing {listed} products"))
}

pub(crate) fn restriction_lookup(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        CatalogWithRules,
        &[
            "p.product_name",
            "p.type",
            "r.species",
            "r.sex",
            "r.min_age_months",
            "r.max_age_months",
            "r.max_perc_feed",
            "r.max_perc_conc",
            "r.production_focus",
            "r.lactation_cycle",
        ],
    )
    .filter_if(entities.product.clone(), contains("p.product_name"))
    .filter(Filter::Flag("r.is_active"))
    .order_by("p.product_name", Asc)
    .order_by("r.species", Asc)
    .limit(20);
    (
        plan,
        format!("Finding feeding restrictions for {}", subject(entities)),
    )
}

pub(crate) fn generic_search(entities: &Entities, _: &str) -> (QueryPlan, String) {
    let plan = QueryPlan::new(
        Catalog,
        &[
            "product_name",
            "type",
            "supplier",
            "supplier_country",
            "cost_per_kg",
            "cost_currency",
        ],
    )
    .filter_if(entities.product.clone(), contains("product_name"))
    .filter_if(entities.region.clone(), region_is)
    .filter(Filter::Flag("is_active"))
    .order_by("product_name", Asc)
    .order_by("cost_per_kg", Asc)
    .limit(15);
    (plan, "General product search".to_string())
}

pub(crate) const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub(crate) const MAX_SEARCH_LIMIT: u32 = 100;

/// Criteria for a structured product search. Every field is optional.
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchCriteria {
    pub(crate) product: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) supplier: Option<String>,
    pub(crate) min_cost: Option<f64>,
    pub(crate) max_cost: Option<f64>,
    pub(crate) limit: Option<u32>,
}

pub(crate) fn product_search(criteria: &SearchCriteria) -> QueryPlan {
    let limit = criteria
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    QueryPlan::new(
        Catalog,
        &[
            "product_name",
            "product_code",
            "type",
            "supplier",
            "supplier_country",
            "cost_per_kg",
            "cost_currency",
            "supplier_email",
            "supplier_phone",
        ],
    )
    .filter_if(criteria.product.clone(), contains("product_name"))
    .filter_if(criteria.category.clone(), |value| Filter::Equals {
        column: "type",
        value,
    })
    .filter_if(criteria.region.clone(), region_is)
    .filter_if(criteria.supplier.clone(), contains("supplier"))
    .filter_if(criteria.min_cost, |value| Filter::AtLeast {
        column: "cost_per_kg",
        value,
    })
    .filter_if(criteria.max_cost, |value| Filter::AtMost {
        column: "cost_per_kg",
        value,
    })
    .filter(Filter::Flag("is_active"))
    .order_by("cost_per_kg", Asc)
    .limit(limit)
}

/// Monthly price range of a product's historical rows.
pub(crate) fn price_history(product: &str, region: Option<&str>) -> QueryPlan {
    QueryPlan::new(
        Catalog,
        &[
            "strftime('%Y-%m', created_at, 'unixepoch') AS month",
            "ROUND(MIN(cost_per_kg), 2) AS min_price",
            "ROUND(AVG(cost_per_kg), 2) AS avg_price",
            "ROUND(MAX(cost_per_kg), 2) AS max_price",
            "cost_currency",
            "supplier_country",
        ],
    )
    .filter(Filter::Contains {
        column: "product_name",
        value: product.to_string(),
    })
    .filter(Filter::Marked {
        column: "product_code",
        marker: HISTORICAL_MARKER,
    })
    .filter_if(region.map(str::to_string), region_is)
    .group_by(&["month", "supplier_country", "cost_currency"])
    .order_by("month", Asc)
}

pub(crate) fn categories() -> QueryPlan {
    QueryPlan::new(Catalog, &["type"])
        .filter(Filter::NotNull("type"))
        .group_by(&["type"])
        .order_by("type", Asc)
}

pub(crate) fn regions() -> QueryPlan {
    QueryPlan::new(
        Catalog,
        &["supplier_country", "COUNT(*) AS product_count"],
    )
    .filter(Filter::Flag("is_active"))
    .filter(Filter::NotNull("supplier_country"))
    .group_by(&["supplier_country"])
    .order_by("product_count", Desc)
    .order_by("supplier_country", Asc)
}

pub(crate) fn suppliers(region: Option<&str>) -> QueryPlan {
    QueryPlan::new(
        Catalog,
        &[
            "supplier",
            "supplier_country",
            "supplier_email",
            "supplier_phone",
            "COUNT(*) AS product_count",
        ],
    )
    .filter(Filter::Flag("is_active"))
    .filter(Filter::NotNull("supplier"))
    .filter_if(region.map(str::to_string), region_is)
    .group_by(&["supplier", "supplier_country"])
    .order_by("supplier", Asc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexicon::Lexicon,
        plan::{Param, SqlQuery},
    };

    fn plan_for(question: &str) -> (Synthesis, SqlQuery) {
        let lexicon = Lexicon::new().unwrap();
        let entities = Entities::extract(&lexicon, question);
        let synthesis = synthesize(question, &entities);
        let sql = synthesis.plan.to_sql();
        (synthesis, sql)
    }

    fn text(value: &str) -> Param {
        Param::Text(value.to_string())
    }

    #[test]
    fn cheapest_wheat_straw() {
        let (synthesis, query) = plan_for("Who is selling the cheapest Wheat Straw?");
        assert_eq!(synthesis.intent, Intent::Cheapest);
        assert_eq!(
            synthesis.plan.filters,
            vec![
                Filter::Contains {
                    column: "product_name",
                    value: "wheat straw".to_string()
                },
                Filter::Flag("is_active"),
                Filter::NotNull("supplier"),
            ]
        );
        assert_eq!(synthesis.plan.ordering, vec![("cost_per_kg", Asc)]);
        assert_eq!(synthesis.plan.limit, Some(10));
        assert_eq!(query.params, vec![text("%wheat straw%")]);
        assert!(query.sql.contains("LOWER(product_name) LIKE ?1"));
        assert!(query.sql.contains("is_active = 1"));
        assert!(query.sql.contains("supplier IS NOT NULL"));
        assert!(query.sql.ends_with("ORDER BY cost_per_kg ASC\nLIMIT 10"));
    }

    #[test]
    fn normalized_arabic_matches_english_plan() {
        let (english, _) = plan_for("Who is selling the cheapest Wheat Straw?");
        let (arabic, _) = plan_for("who is selling cheapest Wheat Straw؟");
        assert_eq!(english.intent, arabic.intent);
        assert_eq!(english.plan, arabic.plan);
    }

    #[test]
    fn average_has_no_cap() {
        let (synthesis, query) = plan_for("average price of barley in UAE");
        assert_eq!(synthesis.intent, Intent::Average);
        assert_eq!(synthesis.plan.limit, None);
        assert_eq!(query.params, vec![text("%barley%"), text("UAE")]);
        assert!(query
            .sql
            .contains("GROUP BY supplier_country, cost_currency\nORDER BY avg_price ASC"));
        assert!(!query.sql.contains("supplier IS NOT NULL"));
    }

    #[test]
    fn historical_ignores_active_flag() {
        let (synthesis, query) = plan_for("best time to buy alfalfa hay");
        assert_eq!(synthesis.intent, Intent::HistoricalTrend);
        assert!(!query.sql.contains("is_active"));
        assert!(query.sql.contains("product_code LIKE ?2"));
        assert_eq!(query.params, vec![text("%alfalfa hay%"), text("%HIST%")]);
        assert_eq!(synthesis.plan.limit, Some(10));

        let (_, with_region) = plan_for("historical prices of alfalfa in Saudi Arabia");
        assert_eq!(
            with_region.params,
            vec![text("%alfalfa%"), text("%HIST%"), text("Saudi Arabia")]
        );
    }

    #[test]
    fn suppliers_are_deduplicated() {
        let (synthesis, query) = plan_for("Which supplier sells molasses in Egypt?");
        assert_eq!(synthesis.intent, Intent::SupplierLookup);
        assert_eq!(synthesis.plan.grouping, vec!["supplier", "supplier_country"]);
        assert!(query
            .sql
            .ends_with("ORDER BY supplier_country ASC, cost_per_kg ASC\nLIMIT 15"));
    }

    #[test]
    fn listing_infers_category() {
        let (synthesis, query) = plan_for("List fodder products in Qatar");
        assert_eq!(synthesis.intent, Intent::Listing);
        assert_eq!(query.params, vec![text("Fodder"), text("Qatar")]);
        assert_eq!(synthesis.explanation, "Listing Fodder products");
        assert_eq!(synthesis.plan.limit, Some(30));

        let (all, query) = plan_for("show available products");
        assert_eq!(all.explanation, "Listing all products");
        assert!(query.params.is_empty());
    }

    #[test]
    fn restrictions_join_rules() {
        let (synthesis, query) = plan_for("feeding restrictions for urea");
        assert_eq!(synthesis.intent, Intent::RestrictionLookup);
        assert!(query.sql.contains("JOIN feed_product_restrictions r"));
        assert!(query.sql.contains("r.is_active = 1"));
        assert_eq!(query.params, vec![text("%urea%")]);
        assert_eq!(synthesis.plan.limit, Some(20));
    }

    #[test]
    fn generic_search_without_entities() {
        let (synthesis, query) = plan_for("tell me something");
        assert_eq!(synthesis.intent, Intent::GenericSearch);
        assert_eq!(synthesis.plan.filters, vec![Filter::Flag("is_active")]);
        assert!(query.params.is_empty());
        assert_eq!(synthesis.plan.limit, Some(15));
    }

    #[test]
    fn search_limit_is_clamped() {
        let mut criteria = SearchCriteria::default();
        assert_eq!(product_search(&criteria).limit, Some(DEFAULT_SEARCH_LIMIT));
        criteria.limit = Some(0);
        assert_eq!(product_search(&criteria).limit, Some(1));
        criteria.limit = Some(1000);
        assert_eq!(product_search(&criteria).limit, Some(MAX_SEARCH_LIMIT));
    }

    #[test]
    fn search_binds_every_criterion() {
        let criteria = SearchCriteria {
            product: Some("Barley".to_string()),
            category: Some("Fodder".to_string()),
            region: Some("UAE".to_string()),
            supplier: Some("gulf".to_string()),
            min_cost: Some(0.5),
            max_cost: Some(2.0),
            limit: None,
        };
        let query = product_search(&criteria).to_sql();
        assert_eq!(
            query.params,
            vec![
                text("%barley%"),
                text("Fodder"),
                text("UAE"),
                text("%gulf%"),
                Param::Real(0.5),
                Param::Real(2.0),
            ]
        );
        assert!(query.sql.contains("cost_per_kg >= ?5"));
        assert!(query.sql.contains("cost_per_kg <= ?6"));
    }

    #[test]
    fn price_history_orders_by_month() {
        let query = price_history("Wheat Straw", Some("Saudi Arabia")).to_sql();
        assert!(query.sql.ends_with("ORDER BY month ASC"));
        assert_eq!(
            query.params,
            vec![text("%wheat straw%"), text("%HIST%"), text("Saudi Arabia")]
        );
    }
}
