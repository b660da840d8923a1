use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// An external machine translator used for text the lexicon leaves behind.
#[async_trait]
pub(crate) trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
pub(crate) struct HttpTranslator {
    client: Client,
    url: String,
}

impl HttpTranslator {
    pub(crate) fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build translator client")?;
        let url = if url.ends_with("/translate") {
            url.to_string()
        } else {
            format!("{}/translate", url.trim_end_matches('/'))
        };
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            source: source.code(),
            target: target.code(),
            format: "text",
        };
        let response: TranslateResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("translator request failed")?
            .error_for_status()?
            .json()
            .await
            .context("unexpected translator response")?;
        Ok(response.translated_text)
    }
}
