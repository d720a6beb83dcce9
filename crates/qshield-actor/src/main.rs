//! `qshield-actor` — JSONL conformance-harness actor over stdio.
//!
//! Reads one `Request{id, op, params}` per line from stdin, writes one
//! `Response{id, ok, result|error}` per line to stdout. stdout is reserved
//! for the response stream; all diagnostics go to stderr via `tracing`.

mod ops;

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use qshield_engine::{Engine, EngineConfig};
use qshield_store::{Store, Vault};

/// QShield protocol engine conformance-harness actor.
#[derive(Parser, Debug)]
#[command(name = "qshield-actor")]
struct Cli {
    /// Identifies this actor instance in diagnostics; carries no protocol
    /// meaning (the harness runs one actor per peer role).
    #[arg(long)]
    #[allow(dead_code)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!(name = cli.name.as_deref().unwrap_or("qshield-actor"), "starting actor");

    let engine = build_engine().await?;

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ops::Request>(line) {
            Ok(req) => ops::dispatch(&engine, req).await,
            Err(e) => ops::Response {
                id: None,
                ok: false,
                result: None,
                error: Some(serde_json::json!({ "reason": "invalid_request", "message": format!("bad request: {e}") })),
            },
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Builds the engine's store. `QSL_DUR_STORE_DIR`, when set, switches from
/// an in-memory SQLite pool to a durable on-disk one under that directory —
/// a harness-level concern, not engine configuration.
///
/// The vault is unlocked with a process-local random key rather than a
/// password: the actor is a non-interactive subprocess with no password
/// collection surface, and snapshot-at-rest confidentiality only needs to
/// survive for the lifetime of one conformance run.
async fn build_engine() -> anyhow::Result<Engine> {
    let vault = Vault::new();
    let mut key = [0u8; 32];
    {
        use rand_core::RngCore;
        rand_core::OsRng.fill_bytes(&mut key);
    }
    vault.unlock_with_key(key).await;

    let store = match std::env::var("QSL_DUR_STORE_DIR") {
        Ok(dir) => {
            let mut path = PathBuf::from(dir);
            std::fs::create_dir_all(&path)?;
            path.push("qshield.sqlite3");
            Store::open(&path, vault).await?
        }
        Err(_) => Store::open_in_memory(vault).await?,
    };

    Ok(Engine::new(store, EngineConfig::from_env()))
}
