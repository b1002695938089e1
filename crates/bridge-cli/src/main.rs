//! summit-import - load conference feeds into a record store
//!
//! ## Commands
//!
//! - `import`: upsert a JSON feed and report per-entity record counts
//! - `export`: import a feed, then print one record in its wire shape

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bridge_core::{Entity, IdentifierValue, PersistenceContext, ScalarKind, Session};
use bridge_state::{MemoryContext, SurrealContext};
use clap::{Parser, Subcommand};
use serde_json::Value;
use summit_model::{summit_schema, Summit};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "summit-import")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Import conference feeds into a deduplicated record store", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Use an in-memory store instead of the configured SurrealDB
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upsert every record of a feed and commit
    Import {
        /// Feed file (a JSON object or array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Entity the top-level records decode as
        #[arg(short, long, default_value = Summit::NAME)]
        entity: String,

        /// Report what would be stored, then discard it
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a feed, then print one record as JSON
    Export {
        /// Feed file (a JSON object or array of objects)
        #[arg(short, long)]
        input: PathBuf,

        /// Entity of the record to print
        #[arg(short, long)]
        entity: String,

        /// Identifier of the record to print
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bridge_core::telemetry::init_tracing(cli.json, level);

    let context = open_context(cli.memory).await?;
    let schema = summit_schema().context("Conference schema is invalid")?;
    let session = Session::new(Arc::new(schema), context);

    match cli.command {
        Commands::Import {
            input,
            entity,
            dry_run,
        } => {
            let counts = cmd_import(&session, &input, &entity, dry_run).await?;
            if dry_run {
                println!("Dry run, nothing stored:");
            }
            for (entity, count) in counts {
                println!("  {entity}: {count}");
            }
            Ok(())
        }
        Commands::Export { input, entity, id } => {
            let record = cmd_export(&session, &input, &entity, &id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}

async fn open_context(memory: bool) -> Result<Arc<dyn PersistenceContext>> {
    if memory {
        info!("Using in-memory record store");
        return Ok(Arc::new(MemoryContext::new()));
    }
    let store = SurrealContext::from_env()
        .await
        .context("Failed to connect to record store")?;
    Ok(Arc::new(store))
}

fn read_feed(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Import `input` as `entity` and return the per-entity record counts.
async fn cmd_import(
    session: &Session,
    input: &Path,
    entity: &str,
    dry_run: bool,
) -> Result<BTreeMap<String, usize>> {
    let feed = read_feed(input)?;
    info!("Importing {} as {}", input.display(), entity);

    if !dry_run {
        session
            .import(&feed, entity)
            .await
            .with_context(|| format!("Failed to import {}", input.display()))?;
        return record_counts(session).await;
    }

    let staged = match &feed {
        Value::Array(_) => session.upsert_many(&feed, entity).await.map(|_| ()),
        _ => session.upsert(&feed, entity).await.map(|_| ()),
    };
    let counts = match staged {
        Ok(()) => record_counts(session).await,
        Err(err) => Err(err.into()),
    };
    session.rollback().await?;
    counts.with_context(|| format!("Failed to import {}", input.display()))
}

async fn cmd_export(session: &Session, input: &Path, entity: &str, id: &str) -> Result<Value> {
    cmd_import(session, input, Summit::NAME, false).await?;

    let identifier = parse_identifier(session, entity, id)?;
    let Some(record) = session.lookup(entity, identifier).await? else {
        bail!("No {entity} with identifier {id}");
    };
    Ok(session.encode(&record).await?)
}

/// Read a command-line identifier with the entity's identifier kind.
fn parse_identifier(session: &Session, entity: &str, raw: &str) -> Result<IdentifierValue> {
    let descriptor = session.schema().entity(entity)?;
    let field = session.schema().identifier_of(descriptor)?;
    let value = match field.kind {
        ScalarKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .with_context(|| format!("{entity} identifiers are integers, got `{raw}`"))?,
        _ => Value::from(raw),
    };
    IdentifierValue::from_json(&field.kind, &value)
        .with_context(|| format!("`{raw}` is not a valid {entity} identifier"))
}

async fn record_counts(session: &Session) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for entity in session.schema().entity_names() {
        let count = session.count(entity).await?;
        if count > 0 {
            counts.insert(entity.to_string(), count);
        }
    }
    Ok(counts)
}
