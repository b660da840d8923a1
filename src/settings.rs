// src/settings.rs

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_FILE: &str = "feed_products.db";
const ENV_PREFIX: &str = "FEED_AGENT";

#[derive(Parser, Debug)]
#[command(version, about = "Ask questions about the feed products catalog in English or Arabic")]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a single question and exit.
    Ask {
        /// The question, in English or Arabic.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the whole outcome as JSON.
        #[arg(long)]
        json: bool,

        /// Force the response language (`ar` or `en`).
        #[arg(long, value_name = "LANG")]
        language: Option<String>,
    },
    /// Start an interactive question loop.
    Shell,
    /// Serve the GraphQL API.
    Serve {
        /// Path to the certificate file.
        #[arg(long, value_name = "CERT_PATH", requires = "key")]
        cert: Option<PathBuf>,

        /// Path to the key file.
        #[arg(long, value_name = "KEY_PATH", requires = "cert")]
        key: Option<PathBuf>,
    },
    /// Print catalog statistics.
    Stats,
    /// Load products and restrictions from a JSON fixture.
    Import {
        #[arg(value_name = "FIXTURE")]
        path: PathBuf,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Use the Arabizi identifier as the secondary language signal.
    pub arabizi: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleSettings {
    pub host: String,
    pub port: u16,
    /// The oracle is configured only when a model is named.
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslatorSettings {
    /// The translator is configured only when an endpoint is given.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub database: DatabaseSettings,
    pub language: LanguageSettings,
    pub oracle: OracleSettings,
    pub translator: TranslatorSettings,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", default_db_path())?
            .set_default("language.arabizi", true)?
            .set_default("oracle.host", "http://127.0.0.1")?
            .set_default("oracle.port", 11434)?
            .set_default("oracle.timeout_secs", 20)?
            .set_default("translator.timeout_secs", 10)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let cfg = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        cfg.try_deserialize()
    }
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "feed-agent")
        .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
        .to_string_lossy()
        .into_owned()
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.web.address, DEFAULT_ADDR.parse().unwrap());
        assert!(settings.language.arabizi);
        assert_eq!(settings.oracle.port, 11434);
        assert!(settings.oracle.model.is_none());
        assert!(settings.translator.url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[web]\naddress = \"0.0.0.0:9000\"\n\n[oracle]\nmodel = \"llama3.1:8b\"\ntimeout_secs = 5\n\n[database]\npath = \"catalog.db\""
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.web.address.port(), 9000);
        assert_eq!(settings.oracle.model.as_deref(), Some("llama3.1:8b"));
        assert_eq!(settings.oracle.timeout_secs, 5);
        assert_eq!(settings.database.path, PathBuf::from("catalog.db"));
        assert_eq!(settings.oracle.host, "http://127.0.0.1");
    }
}
