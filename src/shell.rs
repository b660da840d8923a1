//! Terminal front end: one-shot questions and the interactive loop.

use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{
    agent::{FeedAgent, QueryOutcome, EXAMPLES},
    database::CatalogStats,
    language::Language,
};

const BANNER: &str = "Feed products assistant. Ask in English or Arabic; type `help` for commands.";

const HELP: &str = "\
Commands:
  help      show this message
  examples  sample questions in both languages
  stats     catalog statistics
  sql       toggle printing the executed SQL
  clear     clear the screen
  exit      leave (also `quit`, `bye`, `خروج`)

Anything else is answered as a question.";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Help,
    Examples,
    Stats,
    ToggleSql,
    Clear,
    Exit,
    Empty,
    Question(&'a str),
}

fn parse(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "help" | "?" => Input::Help,
        "examples" => Input::Examples,
        "stats" => Input::Stats,
        "sql" => Input::ToggleSql,
        "clear" => Input::Clear,
        "exit" | "quit" | "bye" | "خروج" => Input::Exit,
        _ => Input::Question(line),
    }
}

/// Answers one question and prints the report, or the whole outcome as JSON.
pub(crate) async fn ask(
    agent: &FeedAgent,
    question: &str,
    forced: Option<Language>,
    json: bool,
) -> Result<bool> {
    let outcome = agent.process_query_with(question, forced).await;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("failed to serialize the outcome")?
        );
    } else {
        println!("{}", outcome.response);
    }
    Ok(outcome.success)
}

pub(crate) async fn run(agent: &FeedAgent) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();
    let mut show_sql = false;

    println!("{BANNER}\n");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse(&line) {
            Input::Empty => {}
            Input::Help => println!("{HELP}\n"),
            Input::Examples => println!("{}\n", examples()),
            Input::Stats => match agent.stats().await {
                Ok(stats) => println!("{}\n", format_stats(&stats)),
                Err(e) => eprintln!("Failed to read statistics: {e:#}\n"),
            },
            Input::ToggleSql => {
                show_sql = !show_sql;
                println!("SQL display {}\n", if show_sql { "on" } else { "off" });
            }
            Input::Clear => print!("\x1b[2J\x1b[H"),
            Input::Exit => break,
            Input::Question(question) => {
                let outcome = agent.process_query(question).await;
                println!("{}\n", transcript(&outcome, show_sql));
            }
        }
    }
    Ok(())
}

fn transcript(outcome: &QueryOutcome, show_sql: bool) -> String {
    if show_sql && !outcome.query_text.is_empty() {
        format!("{}\n\n{}", outcome.query_text, outcome.response)
    } else {
        outcome.response.clone()
    }
}

fn examples() -> String {
    EXAMPLES
        .iter()
        .map(|example| format!("[{}]\n  {}\n  {}", example.category, example.english, example.arabic))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_stats(stats: &CatalogStats) -> String {
    let mut lines = vec![
        format!("Products: {} ({} active)", stats.total, stats.active),
        format!("Suppliers: {}", stats.unique_suppliers),
        format!("Restrictions: {}", stats.total_restrictions),
    ];
    if !stats.by_type.is_empty() {
        lines.push("By type:".to_string());
        lines.extend(stats.by_type.iter().map(|c| format!("  {}: {}", c.name, c.count)));
    }
    if !stats.by_region.is_empty() {
        lines.push("By country:".to_string());
        lines.extend(stats.by_region.iter().map(|c| format!("  {}: {}", c.name, c.count)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{sample, Store};

    #[test]
    fn commands() {
        assert_eq!(parse("  HELP "), Input::Help);
        assert_eq!(parse("sql"), Input::ToggleSql);
        assert_eq!(parse("Bye"), Input::Exit);
        assert_eq!(parse("خروج"), Input::Exit);
        assert_eq!(parse("   "), Input::Empty);
        assert_eq!(
            parse(" cheapest barley "),
            Input::Question("cheapest barley")
        );
        assert_eq!(parse("ما هو سعر الشعير"), Input::Question("ما هو سعر الشعير"));
    }

    #[test]
    fn stats_summary() {
        let summary = format_stats(&sample().stats().unwrap());
        assert!(summary.starts_with("Products: 16 (12 active)\nSuppliers: 5\nRestrictions: 4"));
        assert!(summary.contains("By type:\n  Additive: 2\n  Concentrate: 2\n  Fodder: 8"));
        assert!(summary.ends_with("  Qatar: 1"));
        assert_eq!(
            format_stats(&CatalogStats::default()),
            "Products: 0 (0 active)\nSuppliers: 0\nRestrictions: 0"
        );
    }

    #[tokio::test]
    async fn transcript_with_sql() {
        let agent = FeedAgent::new(std::sync::Arc::new(sample())).unwrap();
        let outcome = agent.process_query("cheapest barley").await;
        assert_eq!(transcript(&outcome, false), outcome.response);
        let shown = transcript(&outcome, true);
        assert!(shown.starts_with("SELECT product_name"));
        assert!(shown.ends_with(&outcome.response));
    }

    #[test]
    fn examples_list_both_languages() {
        let listing = examples();
        assert!(listing.starts_with("[price]\n  Who is selling the cheapest Wheat Straw?\n  من يبيع أرخص قش القمح؟"));
        assert_eq!(listing.lines().count(), EXAMPLES.len() * 3);
    }
}
