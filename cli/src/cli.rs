use anyhow::{Context, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Args, Parser, Subcommand, ValueEnum};

use session_store::{SaveStrategy, SessionId, StoreConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyCli {
    UpdateThenInsert,
    Native,
}

#[derive(Debug, Parser)]
#[clap(name = "session-cli", version)]
pub struct Cli {
    /// Database URL (falls back to DATABASE_URL)
    #[clap(long)]
    pub database_url: Option<String>,

    /// Sessions table name (falls back to SESSION_TABLE)
    #[clap(long)]
    pub table: Option<String>,

    /// How `put` writes rows (falls back to SESSION_SAVE_STRATEGY)
    #[clap(long, value_enum)]
    pub strategy: Option<StrategyCli>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ensure the sessions table exists and report what happened
    Init,
    /// Print the payload stored for a session
    Get {
        #[clap(long)]
        id: String,
        /// Print the payload as base64 instead of lossy UTF-8
        #[clap(long, conflicts_with = "json")]
        base64: bool,
        /// Print the stored row as JSON
        #[clap(long)]
        json: bool,
    },
    /// Store a payload, replacing any previous one
    Put(PutArgs),
    /// Acknowledge a session (no storage change)
    Touch {
        #[clap(long)]
        id: String,
    },
    /// Remove a session
    Delete {
        #[clap(long)]
        id: String,
    },
    /// Number of rows stored for a session id
    Count {
        #[clap(long)]
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct PutArgs {
    /// Session id; a new UUID is generated when omitted
    #[clap(long)]
    pub id: Option<String>,

    /// Payload given as UTF-8 text
    #[clap(long, conflicts_with = "base64")]
    pub data: Option<String>,

    /// Payload given as base64
    #[clap(long)]
    pub base64: Option<String>,
}

impl PutArgs {
    pub(crate) fn session_id(&self) -> anyhow::Result<SessionId> {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(SessionId::new(id)?)
    }

    pub(crate) fn payload(&self) -> anyhow::Result<Vec<u8>> {
        match (&self.data, &self.base64) {
            (Some(text), None) => Ok(text.as_bytes().to_vec()),
            (None, Some(encoded)) => STANDARD
                .decode(encoded)
                .context("--base64 is not valid base64"),
            _ => bail!("exactly one of --data or --base64 is required"),
        }
    }
}

/// Convert CLI strategy selection → store strategy
pub(crate) fn cli_to_strategy(s: StrategyCli) -> SaveStrategy {
    match s {
        StrategyCli::UpdateThenInsert => SaveStrategy::UpdateThenInsert,
        StrategyCli::Native => SaveStrategy::Native,
    }
}

/// Environment config with command-line overrides applied on top
pub(crate) fn build_config(cli: &Cli, base: StoreConfig) -> StoreConfig {
    let mut cfg = base;

    if let Some(url) = &cli.database_url {
        cfg.database_url = url.clone();
    }
    if let Some(table) = &cli.table {
        cfg.table = table.clone();
    }
    if let Some(strategy) = cli.strategy {
        cfg.save_strategy = cli_to_strategy(strategy);
    }

    cfg
}
