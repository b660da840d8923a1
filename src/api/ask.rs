use std::sync::Arc;

use async_graphql::{Context, Json, Object, Result, SimpleObject};

use crate::{
    agent::{FeedAgent, QueryOutcome},
    api::DateTimeUtc,
    database::Row,
    language::Language,
};

#[derive(Default)]
pub(super) struct AskQuery {}

/// The answer to one question.
#[derive(SimpleObject)]
struct Answer {
    success: bool,

    /// The rendered report, in the response language.
    response: String,

    /// The executed SQL with its bound parameters.
    query_text: String,

    /// The result rows, columns in select order.
    data: Json<Vec<Row>>,

    /// `ar` or `en`.
    language: String,

    error: Option<String>,
    intent: Option<String>,

    /// The question after Arabic terms were rewritten to English.
    normalized_query: String,

    explanation: String,
    answered_at: DateTimeUtc,
}

impl From<QueryOutcome> for Answer {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            success: outcome.success,
            response: outcome.response,
            query_text: outcome.query_text,
            data: Json(outcome.data),
            language: outcome.language.code().to_string(),
            error: outcome.error,
            intent: outcome.intent.map(|intent| intent.as_str().to_string()),
            normalized_query: outcome.normalized_query,
            explanation: outcome.explanation,
            answered_at: DateTimeUtc(outcome.answered_at),
        }
    }
}

#[Object]
impl AskQuery {
    /// Answers a question about the catalog. `language` forces the response
    /// language; otherwise it follows the question.
    async fn ask(
        &self,
        ctx: &Context<'_>,
        query: String,
        language: Option<String>,
    ) -> Result<Answer> {
        let agent = ctx.data::<Arc<FeedAgent>>()?;
        let forced = match language.as_deref() {
            Some(code) => Some(
                Language::from_code(code)
                    .ok_or_else(|| format!("unsupported language `{code}`"))?,
            ),
            None => None,
        };
        Ok(agent.process_query_with(&query, forced).await.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::TestSchema;

    #[tokio::test]
    async fn ask_in_english() {
        let schema = TestSchema::new();
        let query = r#"
        {
            ask(query: "Who is selling the cheapest Wheat Straw?") {
                success
                language
                intent
                data
                response
            }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        let answer = &data["ask"];
        assert_eq!(answer["success"], true);
        assert_eq!(answer["language"], "en");
        assert_eq!(answer["intent"], "cheapest");
        assert_eq!(answer["data"].as_array().unwrap().len(), 3);
        assert_eq!(answer["data"][0]["supplier"], "Gulf Fodder Trading");
        assert!(answer["response"]
            .as_str()
            .unwrap()
            .starts_with("Cheapest suppliers:"));
    }

    #[tokio::test]
    async fn ask_in_arabic() {
        let schema = TestSchema::new();
        let query = r#"
        {
            ask(query: "ما هو متوسط سعر الشعير في الإمارات؟") {
                success
                language
                intent
                normalizedQuery
                response
            }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        let answer = &data["ask"];
        assert_eq!(answer["success"], true);
        assert_eq!(answer["language"], "ar");
        assert_eq!(answer["intent"], "average");
        assert_eq!(answer["normalizedQuery"], "what is average price Barley in UAE؟");
        assert!(answer["response"]
            .as_str()
            .unwrap()
            .starts_with("متوسط الأسعار:\n\n1. (الإمارات) المتوسط: AED 1.20"));
    }

    #[tokio::test]
    async fn forced_and_unknown_languages() {
        let schema = TestSchema::new();
        let query = r#"
        {
            ask(query: "cheapest barley", language: "ar") {
                language
                response
            }
        }"#;
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(data["ask"]["language"], "ar");
        assert!(data["ask"]["response"]
            .as_str()
            .unwrap()
            .starts_with("أرخص الموردين:"));

        let query = r#"{ ask(query: "cheapest barley", language: "fr") { success } }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.contains("unsupported language `fr`"));
    }
}
