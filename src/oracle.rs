use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::language::Language;

/// An external text generator that may suggest SQL for a question.
#[async_trait]
pub(crate) trait Oracle: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}

pub(crate) struct OllamaOracle {
    client: Ollama,
    model: String,
}

impl OllamaOracle {
    pub(crate) fn new(host: &str, port: u16, model: &str) -> Result<Self> {
        Url::parse(host).with_context(|| format!("invalid oracle host `{host}`"))?;
        Ok(Self {
            client: Ollama::new(host.to_string(), port),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];
        let request = ChatMessageRequest::new(self.model.clone(), messages);
        let response = self.client.send_chat_messages(request).await?;
        Ok(response.message.content)
    }
}

/// A query suggested by the oracle.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub(crate) struct Suggestion {
    #[serde(alias = "query")]
    pub(crate) sql: String,
    #[serde(default, alias = "rationale")]
    pub(crate) explanation: String,
    #[serde(default)]
    pub(crate) response_template: String,
}

const SCHEMA: &str = "\
Table: feed_products_sample
  id INTEGER PRIMARY KEY
  product_name TEXT (e.g. 'Alfalfa hay (mid-bloom)', 'Wheat Straw', 'Barley')
  product_code TEXT (historical price points contain 'HIST')
  name TEXT
  type TEXT (one of 'Fodder', 'Concentrate', 'Additive')
  cost_per_kg REAL
  cost_currency TEXT (e.g. 'AED', 'SAR', 'QAR', 'EGP', 'USD')
  supplier TEXT (NULL for standard reference products)
  supplier_country TEXT (e.g. 'UAE', 'Saudi Arabia', 'Egypt', 'Qatar')
  supplier_email TEXT
  supplier_phone TEXT
  supplier_address TEXT
  is_standard_product INTEGER (0 or 1)
  created_at INTEGER (Unix timestamp)
  is_active INTEGER (1 for current prices, 0 for historical)

Table: feed_product_restrictions
  id INTEGER PRIMARY KEY
  product_id INTEGER (references feed_products_sample.id)
  species TEXT (e.g. 'cattle', 'sheep', 'goat')
  sex TEXT
  min_age_months INTEGER
  max_age_months INTEGER
  breeding_cycle TEXT
  lactation_cycle TEXT
  production_focus TEXT (e.g. 'dairy', 'beef')
  is_eligible INTEGER
  max_perc_feed REAL
  max_perc_conc REAL
  is_active INTEGER";

const RULES: &str = "\
1. Return valid SQLite SQL.
2. Use LOWER(product_name) LIKE '%...%' for product names.
3. For current prices, filter by is_active = 1.
4. For historical data, filter by product_code LIKE '%HIST%'.
5. For cheapest or best price, ORDER BY cost_per_kg ASC.
6. For suppliers, filter supplier IS NOT NULL.
7. Use strftime('%Y-%m', created_at, 'unixepoch') for months.
8. Always add a LIMIT between 10 and 20 unless aggregating.";

const EXAMPLES: &str = "\
Question: Who is selling the cheapest Wheat Straw?
SQL: SELECT supplier, supplier_country, cost_per_kg, cost_currency FROM feed_products_sample \
WHERE LOWER(product_name) LIKE '%wheat straw%' AND is_active = 1 AND supplier IS NOT NULL \
ORDER BY cost_per_kg ASC LIMIT 10

Question: What is the average price of Barley?
SQL: SELECT supplier_country, cost_currency, ROUND(AVG(cost_per_kg), 2) AS avg_price, \
COUNT(*) AS supplier_count FROM feed_products_sample WHERE LOWER(product_name) LIKE '%barley%' \
AND is_active = 1 GROUP BY supplier_country, cost_currency ORDER BY avg_price ASC

Question: Which products have feeding restrictions for young cattle?
SQL: SELECT p.product_name, r.species, r.max_age_months, r.max_perc_feed FROM feed_products_sample p \
JOIN feed_product_restrictions r ON p.id = r.product_id WHERE r.species = 'cattle' \
AND r.max_age_months <= 12 AND r.is_active = 1 LIMIT 20";

fn preamble() -> String {
    format!(
        "You convert questions about animal feed products in the Middle East and North Africa \
        into SQLite queries.\n\n\
        Schema:\n{SCHEMA}\n\n\
        Rules:\n{RULES}\n\n\
        Examples:\n{EXAMPLES}\n\n\
        Return only a JSON object with the fields \"sql\", \"explanation\" and \
        \"response_template\". Do not write anything before or after it."
    )
}

/// Asks the oracle for a suggestion. Any failure, including a timeout, means
/// "no suggestion".
pub(crate) struct OracleAdapter {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    preamble: String,
}

impl OracleAdapter {
    pub(crate) fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self {
            oracle,
            timeout,
            preamble: preamble(),
        }
    }

    pub(crate) async fn suggest(&self, question: &str, language: Language) -> Option<Suggestion> {
        match self.try_suggest(question, language).await {
            Ok(suggestion) => {
                info!(explanation = %suggestion.explanation, "oracle suggested a query");
                Some(suggestion)
            }
            Err(e) => {
                warn!("oracle unavailable: {e:#}");
                None
            }
        }
    }

    async fn try_suggest(&self, question: &str, language: Language) -> Result<Suggestion> {
        let prompt = format!(
            "Convert this question to SQL: \"{question}\"\n\
            The user's language is: {language}\n\
            Return only the JSON object."
        );
        let reply = tokio::time::timeout(
            self.timeout,
            self.oracle.generate(&self.preamble, &prompt),
        )
        .await
        .map_err(|_| anyhow!("no reply within {:?}", self.timeout))??;
        debug!(%reply, "oracle reply");
        parse_suggestion(&reply)
    }
}

/// Reads a suggestion from a reply that may wrap its JSON in a fenced block,
/// surround it with prose, or give it bare.
pub(crate) fn parse_suggestion(reply: &str) -> Result<Suggestion> {
    let suggestion: Suggestion = candidates(reply)
        .into_iter()
        .find_map(|candidate| serde_json::from_str(candidate).ok())
        .context("reply holds no suggestion object")?;
    if suggestion.sql.trim().is_empty() {
        bail!("suggestion has no query");
    }
    Ok(suggestion)
}

fn candidates(reply: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    if let Some(block) = fenced(reply, "```json") {
        candidates.push(block);
    }
    if let Some(block) = fenced(reply, "```") {
        candidates.push(block);
    }
    candidates.push(reply.trim());
    if let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) {
        if start < end {
            candidates.push(&reply[start..=end]);
        }
    }
    candidates
}

fn fenced<'a>(reply: &'a str, opening: &str) -> Option<&'a str> {
    let (_, rest) = reply.split_once(opening)?;
    let (block, _) = rest.split_once("```")?;
    Some(block.trim())
}
