use std::sync::Arc;

use async_graphql::{Context, InputObject, Json, Object, Result, SimpleObject};
use serde_json::Value;

use crate::{
    agent::FeedAgent,
    database::{CatalogStats, Count, Row},
    synthesis::SearchCriteria,
};

#[derive(Default)]
pub(super) struct CatalogQuery {}

#[derive(InputObject, Debug, Default)]
pub(crate) struct ProductFilter {
    /// Case-insensitive part of the product name.
    product: Option<String>,
    /// Exact category, e.g. "Fodder".
    product_type: Option<String>,
    /// Exact region, e.g. "UAE".
    country: Option<String>,
    /// Case-insensitive part of the supplier name.
    supplier: Option<String>,
    min_cost: Option<f64>,
    max_cost: Option<f64>,
    /// Defaults to 20, at most 100.
    limit: Option<i32>,
}

impl From<ProductFilter> for SearchCriteria {
    fn from(filter: ProductFilter) -> Self {
        Self {
            product: filter.product,
            category: filter.product_type,
            region: filter.country,
            supplier: filter.supplier,
            min_cost: filter.min_cost,
            max_cost: filter.max_cost,
            limit: filter.limit.map(|limit| u32::try_from(limit).unwrap_or(0)),
        }
    }
}

#[derive(SimpleObject, Debug, PartialEq)]
struct Supplier {
    name: String,
    country: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    product_count: i64,
}

impl From<&Row> for Supplier {
    fn from(row: &Row) -> Self {
        Self {
            name: text(row, "supplier").unwrap_or_default(),
            country: text(row, "supplier_country"),
            email: text(row, "supplier_email"),
            phone: text(row, "supplier_phone"),
            product_count: row.get("product_count").and_then(Value::as_i64).unwrap_or(0),
        }
    }
}

fn text(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

#[Object]
impl CatalogQuery {
    /// Counts over the whole catalog.
    async fn stats(&self, ctx: &Context<'_>) -> Result<CatalogStats> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        Ok(agent.stats().await?)
    }

    /// Active products matching every given criterion, cheapest first.
    async fn search_products(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: ProductFilter,
    ) -> Result<Json<Vec<Row>>> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        Ok(Json(agent.search(&filter.into()).await?))
    }

    /// Monthly historical prices of a product.
    async fn price_history(
        &self,
        ctx: &Context<'_>,
        product: String,
        country: Option<String>,
    ) -> Result<Json<Vec<Row>>> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        Ok(Json(agent.price_history(&product, country.as_deref()).await?))
    }

    async fn product_types(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        let rows = agent.categories().await?;
        Ok(rows.iter().filter_map(|row| text(row, "type")).collect())
    }

    /// Regions with their number of active products.
    async fn countries(&self, ctx: &Context<'_>) -> Result<Vec<Count>> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        let rows = agent.regions().await?;
        Ok(rows
            .iter()
            .map(|row| Count {
                name: text(row, "supplier_country").unwrap_or_default(),
                count: row.get("product_count").and_then(Value::as_i64).unwrap_or(0),
            })
            .collect())
    }

    async fn suppliers(
        &self,
        ctx: &Context<'_>,
        country: Option<String>,
    ) -> Result<Vec<Supplier>> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        let rows = agent.suppliers(country.as_deref()).await?;
        Ok(rows.iter().map(Supplier::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::TestSchema;

    #[tokio::test]
    async fn stats() {
        let schema = TestSchema::new();
        let query = r#"
        {
            stats {
                total
                active
                byType { name count }
                uniqueSuppliers
                totalRestrictions
            }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(
            data["stats"],
            json!({
                "total": 16,
                "active": 12,
                "byType": [
                    { "name": "Additive", "count": 2 },
                    { "name": "Concentrate", "count": 2 },
                    { "name": "Fodder", "count": 8 },
                ],
                "uniqueSuppliers": 5,
                "totalRestrictions": 4,
            })
        );
    }

    #[tokio::test]
    async fn search_products_by_filter() {
        let schema = TestSchema::new();
        let query = r#"
        {
            searchProducts(filter: {product: "wheat straw", minCost: 0.5, maxCost: 1.0})
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        let rows = data["searchProducts"].as_array().unwrap();
        let codes: Vec<_> = rows.iter().map(|row| row["product_code"].clone()).collect();
        assert_eq!(codes, [json!("MP-UAE-001"), json!("MP-SA-001")]);

        let query = r#"{ searchProducts(filter: {limit: 2}) }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        let rows = data["searchProducts"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["product_code"], "FP-002");

        let query = r#"{ searchProducts }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(data["searchProducts"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn price_history() {
        let schema = TestSchema::new();
        let query = r#"
        {
            priceHistory(product: "Wheat Straw", country: "UAE")
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        let months: Vec<_> = data["priceHistory"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["month"].clone())
            .collect();
        assert_eq!(months, [json!("2024-01"), json!("2024-03"), json!("2024-06")]);
    }

    #[tokio::test]
    async fn product_types_and_countries() {
        let schema = TestSchema::new();
        let query = r#"
        {
            productTypes
            countries { name count }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(
            data["productTypes"],
            json!(["Additive", "Concentrate", "Fodder"])
        );
        assert_eq!(
            data["countries"],
            json!([
                { "name": "UAE", "count": 6 },
                { "name": "Saudi Arabia", "count": 3 },
                { "name": "Egypt", "count": 2 },
                { "name": "Qatar", "count": 1 },
            ])
        );
    }

    #[tokio::test]
    async fn suppliers_by_country() {
        let schema = TestSchema::new();
        let query = r#"
        {
            suppliers(country: "Egypt") { name country productCount }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(
            data["suppliers"],
            json!([{ "name": "Nile Valley Agro", "country": "Egypt", "productCount": 2 }])
        );

        let query = r#"{ suppliers { name } }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(data["suppliers"].as_array().unwrap().len(), 5);
    }
}
