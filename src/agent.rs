use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    database::{CatalogStats, Row, Store},
    extract::Entities,
    intent::Intent,
    language::{detect, Language, LanguageIdentifier},
    lexicon::Lexicon,
    normalize::Normalizer,
    oracle::OracleAdapter,
    plan::{QueryPlan, SqlQuery},
    render::{database_error, processing_error, Renderer},
    synthesis::{self, SearchCriteria},
    translator::Translator,
};

/// The answer to one question. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QueryOutcome {
    pub(crate) success: bool,
    pub(crate) response: String,
    /// The executed SQL, with its bound parameters.
    pub(crate) query_text: String,
    pub(crate) data: Vec<Row>,
    pub(crate) language: Language,
    pub(crate) error: Option<String>,
    pub(crate) intent: Option<Intent>,
    pub(crate) normalized_query: String,
    pub(crate) explanation: String,
    pub(crate) answered_at: DateTime<Utc>,
}

impl QueryOutcome {
    fn new(language: Language) -> Self {
        Self {
            success: false,
            response: String::new(),
            query_text: String::new(),
            data: Vec::new(),
            language,
            error: None,
            intent: None,
            normalized_query: String::new(),
            explanation: String::new(),
            answered_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct Example {
    pub(crate) category: &'static str,
    pub(crate) english: &'static str,
    pub(crate) arabic: &'static str,
}

pub(crate) const EXAMPLES: &[Example] = &[
    Example {
        category: "price",
        english: "Who is selling the cheapest Wheat Straw?",
        arabic: "من يبيع أرخص قش القمح؟",
    },
    Example {
        category: "average",
        english: "What is the average price of Barley in UAE?",
        arabic: "ما هو متوسط سعر الشعير في الإمارات؟",
    },
    Example {
        category: "supplier",
        english: "Which suppliers sell Alfalfa hay in Saudi Arabia?",
        arabic: "من يبيع تبن البرسيم في السعودية؟",
    },
    Example {
        category: "historical",
        english: "When is the best time to buy Corn?",
        arabic: "ما هو أفضل وقت لشراء الذرة؟",
    },
    Example {
        category: "list",
        english: "List all concentrates in Egypt",
        arabic: "قائمة بجميع المركزات في مصر",
    },
    Example {
        category: "restrictions",
        english: "What restrictions apply to Urea for cattle?",
        arabic: "ما هي قيود استخدام اليوريا للماشية؟",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Health {
    pub(crate) database: bool,
    pub(crate) oracle: bool,
    pub(crate) translator: bool,
}

/// Answers catalog questions asked in English or Arabic.
pub(crate) struct FeedAgent {
    lexicon: Arc<Lexicon>,
    normalizer: Normalizer,
    identifier: Option<Box<dyn LanguageIdentifier>>,
    oracle: Option<OracleAdapter>,
    renderer: Renderer,
    store: Arc<dyn Store>,
    reachability: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl FeedAgent {
    pub(crate) fn new(store: Arc<dyn Store>) -> Result<Self> {
        let lexicon = Arc::new(Lexicon::new().context("invalid lexicon")?);
        Ok(Self {
            normalizer: Normalizer::new(Arc::clone(&lexicon), None),
            renderer: Renderer::new(Arc::clone(&lexicon))?,
            lexicon,
            identifier: None,
            oracle: None,
            store,
            reachability: None,
        })
    }

    #[must_use]
    pub(crate) fn with_identifier(mut self, identifier: Box<dyn LanguageIdentifier>) -> Self {
        self.identifier = Some(identifier);
        self
    }

    #[must_use]
    pub(crate) fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.normalizer = Normalizer::new(Arc::clone(&self.lexicon), Some(translator));
        self
    }

    #[must_use]
    pub(crate) fn with_oracle(mut self, oracle: OracleAdapter) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Reachability check reported by [`FeedAgent::health`].
    #[must_use]
    pub(crate) fn with_reachability(mut self, reachability: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.reachability = Some(Arc::new(reachability));
        self
    }

    pub(crate) async fn process_query(&self, text: &str) -> QueryOutcome {
        self.process_query_with(text, None).await
    }

    /// Like [`FeedAgent::process_query`], answering in `forced` when given.
    #[instrument(skip(self))]
    pub(crate) async fn process_query_with(
        &self,
        text: &str,
        forced: Option<Language>,
    ) -> QueryOutcome {
        let detected = detect(text, self.identifier.as_deref());
        let language = forced.unwrap_or(detected);
        let mut outcome = QueryOutcome::new(language);

        if let Err(e) = self.answer(text, detected, &mut outcome).await {
            outcome.success = false;
            outcome.error = Some(format!("{e:#}"));
            outcome.response = processing_error(language, format!("{e:#}"));
        }
        info!(
            success = outcome.success,
            rows = outcome.data.len(),
            "Answered in {}",
            outcome.language
        );
        outcome
    }

    async fn answer(&self, text: &str, detected: Language, outcome: &mut QueryOutcome) -> Result<()> {
        let language = outcome.language;
        let normalized = self.normalizer.normalize(text, detected).await;
        let entities = Entities::extract(&self.lexicon, &normalized);
        let synthesis = synthesis::synthesize(&normalized, &entities);
        outcome.intent = Some(synthesis.intent);

        let suggestion = match &self.oracle {
            Some(oracle) => oracle.suggest(&normalized, language).await,
            None => None,
        };
        let (query, header, explanation) = match suggestion {
            Some(suggestion) => {
                let template = suggestion.response_template.trim();
                let header = if template.is_empty() {
                    synthesis.intent.header().to_string()
                } else {
                    template.to_string()
                };
                (SqlQuery::raw(suggestion.sql), header, suggestion.explanation)
            }
            None => (
                synthesis.plan.to_sql(),
                synthesis.intent.header().to_string(),
                synthesis.explanation,
            ),
        };
        outcome.normalized_query = normalized;
        outcome.query_text = query.to_string();
        outcome.explanation = explanation;

        match self.run(query).await? {
            Ok(rows) => {
                outcome.response = self.renderer.render(&rows, &header, language);
                outcome.data = rows;
                outcome.success = true;
            }
            Err(e) => {
                outcome.error = Some(format!("{e:#}"));
                outcome.response = database_error(language, format!("{e:#}"));
            }
        }
        Ok(())
    }

    /// Executes off the async runtime. The outer error is a failed task, the
    /// inner one a store error.
    async fn run(&self, query: SqlQuery) -> Result<Result<Vec<Row>>> {
        let store = Arc::clone(&self.store);
        blocking(move || store.execute(&query)).await
    }

    async fn fetch(&self, plan: QueryPlan) -> Result<Vec<Row>> {
        self.run(plan.to_sql()).await?
    }

    pub(crate) async fn stats(&self) -> Result<CatalogStats> {
        let store = Arc::clone(&self.store);
        blocking(move || store.stats()).await?
    }

    pub(crate) async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Row>> {
        self.fetch(synthesis::product_search(criteria)).await
    }

    pub(crate) async fn price_history(&self, product: &str, region: Option<&str>) -> Result<Vec<Row>> {
        self.fetch(synthesis::price_history(product, region)).await
    }

    pub(crate) async fn categories(&self) -> Result<Vec<Row>> {
        self.fetch(synthesis::categories()).await
    }

    pub(crate) async fn regions(&self) -> Result<Vec<Row>> {
        self.fetch(synthesis::regions()).await
    }

    pub(crate) async fn suppliers(&self, region: Option<&str>) -> Result<Vec<Row>> {
        self.fetch(synthesis::suppliers(region)).await
    }

    pub(crate) async fn health(&self) -> Health {
        let database = match &self.reachability {
            Some(reachability) => {
                let reachability = Arc::clone(reachability);
                blocking(move || reachability()).await.unwrap_or(false)
            }
            None => true,
        };
        Health {
            database,
            oracle: self.oracle.is_some(),
            translator: self.normalizer.has_translator(),
        }
    }
}

/// Store calls lock the SQLite connection, so they run on the blocking pool.
async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("store task failed")
}
