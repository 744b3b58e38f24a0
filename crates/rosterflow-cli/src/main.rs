//! Rosterflow admin CLI — drives the ingestion pipeline against a Postgres
//! database.
//!
//! Set DATABASE_URL (a local `.env` file works). Notification delivery and
//! real-time push are external subsystems; this binary wires the no-op ports.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rosterflow_cli::init_tracing;
use rosterflow_core::{Config, NoOpCreditPush, NoOpNotifier};
use rosterflow_db::{PgCandidateStore, PgPlacementStore};
use rosterflow_pipeline::{CreditReconciler, CreditScope, FileLifecycleManager};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rosterflow", about = "Rosterflow ingestion pipeline admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Approve a pending roster file: provision accounts and mark it processed
    Approve {
        /// Placement UUID
        #[arg(long)]
        placement: Uuid,
        /// File UUID within the placement's history
        #[arg(long)]
        file: Uuid,
    },
    /// Reject a pending roster file
    Reject {
        /// Placement UUID
        #[arg(long)]
        placement: Uuid,
        /// File UUID within the placement's history
        #[arg(long)]
        file: Uuid,
    },
    /// Overwrite credits across files, the placement, and its candidates
    AssignCredits {
        /// Placement UUID
        #[arg(long)]
        placement: Uuid,
        /// New credit value (clamped to 0..=10000)
        #[arg(long)]
        credits: i32,
        /// Restrict the rewrite to one file; omit for all files
        #[arg(long)]
        file: Option<Uuid>,
    },
    /// Apply per-row spreadsheet-authored credits/courses to candidates
    SyncCredits {
        /// Placement UUID
        #[arg(long)]
        placement: Uuid,
    },
    /// Run pending database migrations
    Migrate,
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let placements = Arc::new(PgPlacementStore::new(pool.clone()));
    let candidates = Arc::new(PgCandidateStore::new(pool.clone()));

    let cli = Cli::parse();

    match cli.command {
        Commands::Approve { placement, file } => {
            let manager =
                FileLifecycleManager::new(placements, candidates, Arc::new(NoOpNotifier));
            let outcome = manager.approve(placement, file).await?;
            print_json(&json!({
                "created": outcome.created,
                "skipped": outcome.skipped,
                "errors": outcome
                    .errors
                    .iter()
                    .map(|e| json!({"row_index": e.row_index, "message": e.message}))
                    .collect::<Vec<_>>(),
                "already_processed": outcome.already_processed,
            }))?;
        }
        Commands::Reject { placement, file } => {
            let manager =
                FileLifecycleManager::new(placements, candidates, Arc::new(NoOpNotifier));
            let rejected = manager.reject(placement, file).await?;
            print_json(&json!({ "rejected": rejected }))?;
        }
        Commands::AssignCredits {
            placement,
            credits,
            file,
        } => {
            let scope = match file {
                Some(file_id) => CreditScope::SingleFile(file_id),
                None => CreditScope::AllFiles,
            };
            let reconciler =
                CreditReconciler::new(placements, candidates, Arc::new(NoOpCreditPush));
            let outcome = reconciler.assign_credits(placement, credits, scope).await?;
            print_json(&json!({
                "credits": outcome.credits,
                "files_rewritten": outcome.files_rewritten,
                "candidates_updated": outcome.candidates_updated,
            }))?;
        }
        Commands::SyncCredits { placement } => {
            let reconciler =
                CreditReconciler::new(placements, candidates, Arc::new(NoOpCreditPush));
            let outcome = reconciler.sync_from_spreadsheet(placement).await?;
            print_json(&json!({
                "rows_applied": outcome.rows_applied,
                "rows_skipped": outcome.rows_skipped,
            }))?;
        }
        Commands::Migrate => {
            sqlx::migrate!("../rosterflow-db/migrations")
                .run(&pool)
                .await
                .context("Migration failed")?;
            print_json(&json!({ "migrated": true }))?;
        }
    }

    Ok(())
}
