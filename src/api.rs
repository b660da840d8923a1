mod ask;
mod catalog;
mod status;

use std::sync::Arc;

use async_graphql::{
    EmptyMutation, EmptySubscription, InputValueError, InputValueResult, MergedObject, Scalar,
    ScalarType, Value,
};
use chrono::{DateTime, Utc};

use crate::agent::FeedAgent;

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(ask::AskQuery, catalog::CatalogQuery, status::StatusQuery);

pub(crate) type Schema = async_graphql::Schema<Query, EmptyMutation, EmptySubscription>;

#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub(crate) struct DateTimeUtc(DateTime<Utc>);

#[Scalar]
impl ScalarType for DateTimeUtc {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(s) => Ok(DateTimeUtc(s.parse()?)),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339())
    }
}

pub(crate) fn schema(agent: Arc<FeedAgent>) -> Schema {
    Schema::build(Query::default(), EmptyMutation, EmptySubscription)
        .data(agent)
        .finish()
}

#[cfg(test)]
struct TestSchema {
    _dir: tempfile::TempDir, // keeps the catalog file alive while the test runs
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    fn new() -> Self {
        use crate::database::{Database, Fixture};

        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&dir.path().join("feed_products.db")).unwrap();
        let fixture: Fixture =
            serde_json::from_str(include_str!("../fixtures/sample_catalog.json")).unwrap();
        db.import(&fixture).unwrap();
        let agent = FeedAgent::new(Arc::new(db)).unwrap();
        Self {
            _dir: dir,
            schema: schema(Arc::new(agent)),
        }
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}
