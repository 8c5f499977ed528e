pub mod cli;

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use tracing::Instrument;

use cli::*;
use common::logger::{TraceId, child_span, init_logger, root_span, warn_if_slow};
use session_store::{SessionId, SessionStore, SqlSessionStore, StoreConfig};

const SLOW_COMMAND: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("session-cli");

    let cli = Cli::parse();
    let config = build_config(&cli, StoreConfig::from_env()?);

    let trace_id = TraceId::new();
    let span = root_span("session-cli", &trace_id);

    warn_if_slow("command", SLOW_COMMAND, run(cli.command, config))
        .instrument(span)
        .await
}

async fn run(command: Command, config: StoreConfig) -> anyhow::Result<()> {
    let store = SqlSessionStore::connect_and_init(&config)
        .instrument(child_span("connect"))
        .await?;

    match command {
        Command::Init => {
            println!("{}: {}", store.table().name(), store.schema_status());
        }

        Command::Get { id, base64, json } => {
            let id = SessionId::new(id)?;

            if json {
                match store.record(&id).await? {
                    Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                    None => println!("null"),
                }
                return Ok(());
            }

            match store.load(&id).await? {
                Some(bytes) if base64 => println!("{}", STANDARD.encode(&bytes)),
                Some(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
                None => eprintln!("no session '{id}'"),
            }
        }

        Command::Put(args) => {
            let id = args.session_id()?;
            let payload = args.payload()?;

            store.save(&id, &payload).await?;
            println!("{id}");
        }

        Command::Touch { id } => {
            store.touch(&SessionId::new(id)?).await?;
        }

        Command::Delete { id } => {
            store.delete(&SessionId::new(id)?).await?;
        }

        Command::Count { id } => {
            println!("{}", store.row_count(&SessionId::new(id)?).await?);
        }
    }

    Ok(())
}
