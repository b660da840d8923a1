use std::sync::Arc;

use async_graphql::{Context, Object, Result, SimpleObject};

use crate::agent::{FeedAgent, EXAMPLES};

#[derive(Default)]
pub(super) struct StatusQuery {}

#[derive(SimpleObject)]
struct Health {
    /// "healthy" when the catalog is reachable, "degraded" otherwise.
    status: String,
    database: bool,
    oracle: bool,
    translator: bool,
}

#[derive(SimpleObject)]
struct ExampleQuestion {
    category: String,
    english: String,
    arabic: String,
}

#[Object]
impl StatusQuery {
    async fn health(&self, ctx: &Context<'_>) -> Result<Health> {
        let health = ctx.data::<Arc<FeedAgent>>()?.health().await;
        let status = if health.database { "healthy" } else { "degraded" };
        Ok(Health {
            status: status.to_string(),
            database: health.database,
            oracle: health.oracle,
            translator: health.translator,
        })
    }

    /// Sample questions in both languages.
    #[allow(clippy::unused_async)]
    async fn examples(&self) -> Vec<ExampleQuestion> {
        EXAMPLES
            .iter()
            .map(|example| ExampleQuestion {
                category: example.category.to_string(),
                english: example.english.to_string(),
                arabic: example.arabic.to_string(),
            })
            .collect()
    }
}
