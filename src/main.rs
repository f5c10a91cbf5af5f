/// Relaymend command-line entry point
///
/// Deployment commands patch the remote workflow graph over the engine's
/// REST API; operator commands (`send`, `replay-failed`) drive the native
/// delivery unit directly against the transport and record stores.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use relaymend::config::{DatabaseConfig, EngineConfig, TransportConfig};
use relaymend::delivery::extract::ExtractedResponse;
use relaymend::delivery::{DeliveryRequest, DeliveryUnit, HttpTransport, RetryPolicy};
use relaymend::deploy::{
    apply_persistence_rewire, apply_resilience_rollout, install_sandbox_probe,
    refresh_send_payload, Deployer,
};
use relaymend::engine::EngineClient;
use relaymend::pipeline::{route_outcome, DeliveryStore, TurnContext};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workflow name stamped into execution-log payloads
    #[arg(long, global = true, default_value = "chat-faq-bot")]
    workflow_name: String,

    /// Directory for pre-edit document backups
    #[arg(long, global = true, default_value = "backups")]
    backup_dir: PathBuf,

    /// Skip the pre-edit backup
    #[arg(long, global = true)]
    no_backup: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the retry pipeline into the remote graph
    Deploy,
    /// Move conversation persistence ahead of the branch decision
    RewirePersistence,
    /// Re-render and push only the retry-send payload
    RefreshSendCode,
    /// Swap the send node for a sandbox probe (undo with refresh-send-code)
    Diagnose,
    /// Fetch the current document and write a local backup
    Backup,
    /// Deliver one message through the native unit and record the outcome
    Send {
        /// Destination chat identity
        #[arg(long)]
        chat_id: String,
        /// Message body
        #[arg(long)]
        text: String,
        /// Transport session bucket
        #[arg(long, default_value = "default")]
        session: String,
        /// Skip Postgres persistence of the turn
        #[arg(long)]
        no_store: bool,
    },
    /// Redeliver stored failed messages through the native unit
    ReplayFailed {
        /// Maximum rows to replay, oldest first
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymend=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let backup_dir = if cli.no_backup {
        None
    } else {
        Some(cli.backup_dir.clone())
    };

    match cli.command {
        Commands::Deploy => {
            let transport = TransportConfig::from_env()?;
            let policy = RetryPolicy::default();
            let workflow_name = cli.workflow_name.clone();
            let deployer = engine_deployer(backup_dir)?;
            deployer
                .run_edit(|document| {
                    apply_resilience_rollout(document, &transport, &policy, &workflow_name)
                })
                .await?;
        }
        Commands::RewirePersistence => {
            let deployer = engine_deployer(backup_dir)?;
            deployer.run_edit(apply_persistence_rewire).await?;
        }
        Commands::RefreshSendCode => {
            let transport = TransportConfig::from_env()?;
            let policy = RetryPolicy::default();
            let deployer = engine_deployer(backup_dir)?;
            deployer
                .run_edit(|document| refresh_send_payload(document, &transport, &policy))
                .await?;
        }
        Commands::Diagnose => {
            let deployer = engine_deployer(backup_dir)?;
            deployer.run_edit(install_sandbox_probe).await?;
            tracing::info!("🔬 Probe deployed; trigger the workflow and check the failure records");
        }
        Commands::Backup => {
            let deployer = engine_deployer(None)?;
            deployer.backup_only(&cli.backup_dir).await?;
        }
        Commands::Send {
            chat_id,
            text,
            session,
            no_store,
        } => {
            send_one(&cli.workflow_name, chat_id, text, session, no_store).await?;
        }
        Commands::ReplayFailed { limit } => {
            replay_failed(&cli.workflow_name, limit).await?;
        }
    }

    Ok(())
}

fn engine_deployer(backup_dir: Option<PathBuf>) -> Result<Deployer> {
    let engine = EngineConfig::from_env()?;
    let client = EngineClient::new(&engine)?;
    Ok(Deployer::new(client, engine.workflow_id, backup_dir))
}

/// One operator-initiated delivery with full outcome routing
async fn send_one(
    workflow_name: &str,
    chat_id: String,
    text: String,
    session: String,
    no_store: bool,
) -> Result<()> {
    let transport_config = TransportConfig::from_env()?;
    let transport = Arc::new(HttpTransport::new(&transport_config)?);
    let unit = DeliveryUnit::new(transport);

    let request = DeliveryRequest::new(chat_id.as_str(), text.as_str()).with_session(session.as_str());
    let outcome = unit.deliver(&request).await;

    let mut ctx = TurnContext::anonymous(chat_id.as_str(), "");
    ctx.session_label = session;
    let turn = route_outcome(
        &ctx,
        &ExtractedResponse::verbatim(text.as_str()),
        &outcome,
        workflow_name,
        &Uuid::new_v4().to_string(),
    );

    if !no_store {
        let database = DatabaseConfig::from_env()?;
        let store = DeliveryStore::connect(&database.url).await?;
        store.init_schema().await?;
        store.persist_turn(&turn).await;
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.sent {
        std::process::exit(1);
    }
    Ok(())
}

/// Drain stored failed messages back through the delivery unit
async fn replay_failed(workflow_name: &str, limit: i64) -> Result<()> {
    let transport_config = TransportConfig::from_env()?;
    let transport = Arc::new(HttpTransport::new(&transport_config)?);
    let unit = DeliveryUnit::new(transport);

    let database = DatabaseConfig::from_env()?;
    let store = DeliveryStore::connect(&database.url).await?;
    store.init_schema().await?;

    let rows = store.load_failed_messages(limit).await?;
    tracing::info!("📨 Replaying {} failed message(s)", rows.len());

    let mut delivered = 0usize;
    for row in rows {
        let session = row.message_payload["session"]
            .as_str()
            .unwrap_or("default")
            .to_string();
        let user_message = row.message_payload["userMessage"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let request = DeliveryRequest::new(row.chat_id.as_str(), row.response_text.as_str())
            .with_session(session.as_str());
        let outcome = unit.deliver(&request).await;

        let mut ctx = TurnContext::anonymous(row.chat_id.as_str(), user_message);
        ctx.user_id = row.user_id.clone();
        ctx.session_label = session;
        let turn = route_outcome(
            &ctx,
            &ExtractedResponse::verbatim(row.response_text.as_str()),
            &outcome,
            workflow_name,
            &Uuid::new_v4().to_string(),
        );
        store.persist_turn(&turn).await;

        if outcome.sent {
            delivered += 1;
            tracing::info!("✅ Replayed row {} to {}", row.id, row.chat_id);
        } else {
            tracing::warn!(
                "⚠️ Replay of row {} to {} failed again: {:?}",
                row.id,
                row.chat_id,
                outcome.failure_reason
            );
        }
    }

    tracing::info!("🎉 Replay finished: {} delivered", delivered);
    Ok(())
}
