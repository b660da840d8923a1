mod agent;
mod api;
mod database;
mod extract;
mod intent;
mod language;
mod lexicon;
mod normalize;
mod oracle;
mod plan;
mod render;
mod settings;
mod shell;
mod synthesis;
mod translator;
mod web;

use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    agent::FeedAgent,
    database::{Database, Fixture, Store},
    language::{ArabiziIdentifier, Language},
    oracle::{OllamaOracle, OracleAdapter},
    settings::{Args, Command, Settings},
    translator::HttpTranslator,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings =
        Settings::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        Command::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&settings).context("failed to format configuration")?
            );
        }
        Command::Import { path } => {
            let fixture = Fixture::from_path(&path)?;
            let db = Database::connect(&settings.database.path)?;
            let summary = db.import(&fixture)?;
            println!(
                "Imported {} products and {} restrictions ({} skipped)",
                summary.products, summary.restrictions, summary.skipped
            );
        }
        Command::Stats => {
            let db = Database::connect(&settings.database.path)?;
            let stats = tokio::task::spawn_blocking(move || db.stats())
                .await
                .context("statistics task failed")??;
            println!("{}", shell::format_stats(&stats));
        }
        Command::Ask {
            query,
            json,
            language,
        } => {
            let forced = language
                .map(|code| {
                    Language::from_code(&code)
                        .with_context(|| format!("unsupported language `{code}`"))
                })
                .transpose()?;
            let agent = build_agent(&settings)?;
            if !shell::ask(&agent, &query.join(" "), forced, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Shell => {
            let agent = build_agent(&settings)?;
            shell::run(&agent).await?;
        }
        Command::Serve { cert, key } => {
            let agent = build_agent(&settings)?;
            let schema = api::schema(Arc::new(agent));
            let tls = cert.as_deref().zip(key.as_deref());
            web::serve(schema, settings.web.address, tls).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Wires the agent to the catalog and the configured optional services.
fn build_agent(settings: &Settings) -> Result<FeedAgent> {
    let db = Database::connect(&settings.database.path)?;
    let reachability = db.clone();
    let mut agent =
        FeedAgent::new(Arc::new(db))?.with_reachability(move || reachability.is_reachable());

    if settings.language.arabizi {
        agent = agent.with_identifier(Box::new(ArabiziIdentifier::default()));
    }
    if let Some(url) = &settings.translator.url {
        let timeout = Duration::from_secs(settings.translator.timeout_secs);
        agent = agent.with_translator(Arc::new(HttpTranslator::new(url, timeout)?));
        info!("Translator at {url}");
    }
    if let Some(model) = &settings.oracle.model {
        let oracle = OllamaOracle::new(&settings.oracle.host, settings.oracle.port, model)?;
        let timeout = Duration::from_secs(settings.oracle.timeout_secs);
        agent = agent.with_oracle(OracleAdapter::new(Arc::new(oracle), timeout));
        info!("Oracle model {model} at {}:{}", settings.oracle.host, settings.oracle.port);
    }
    Ok(agent)
}
