//! Reference agent for the messaging SDK.
//!
//! Connects one account, subscribes to conversation changes, and logs every
//! event the SDK publishes until Ctrl-C.
//!
//! Usage:
//!   AL_TOKEN=bearer al-echo-agent --config agentlink.toml
//!
//! Env vars:
//!   AL_CONFIG    config file (default: agentlink.toml)
//!   AL_TOKEN     bearer token (or set `username` + AL_PASSWORD)
//!   RUST_LOG     log filter (default: info,al_agent_sdk=debug)

use std::path::PathBuf;

use al_agent_sdk::{AgentClientBuilder, EventName, RequestOptions, SdkEvent};
use al_domain::Config;
use clap::Parser;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "al-echo-agent", version, about = "Log every messaging event for one account")]
struct Args {
    /// Config file; defaults to $AL_CONFIG or agentlink.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json: bool,

    /// Override the account id from the config file.
    #[arg(long, env = "AL_ACCOUNT_ID")]
    account_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── Tracing ────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,al_agent_sdk=debug"));
    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    }

    // ── Config ─────────────────────────────────────────────────────
    let (mut config, path) = match &args.config {
        Some(path) => (Config::load(path)?, path.display().to_string()),
        None => Config::load_from_env()?,
    };
    if let Some(account_id) = args.account_id {
        config.account.account_id = account_id;
    }
    tracing::info!(
        config = %path,
        account_id = %config.account.account_id,
        domains = config.domains.len(),
        "configuration loaded"
    );

    // ── Client ─────────────────────────────────────────────────────
    let mut client = AgentClientBuilder::from_config(&config).build()?;
    let mut events = client.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received, shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => on_event(&client, event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.shutdown().await;
    Ok(())
}

fn on_event(client: &al_agent_sdk::AgentClient, event: SdkEvent) {
    match event {
        SdkEvent::Connected => {
            tracing::info!("connected, subscribing to conversations");
            client.subscribe_ex_conversations(
                json!({ "convState": ["OPEN"] }),
                RequestOptions::new()
                    .on_success(|body, _| tracing::info!(%body, "subscribed"))
                    .on_error(|err, _| tracing::warn!(error = %err, "subscribe failed")),
                None,
            );
        }
        SdkEvent::Closed { code, reason } => {
            tracing::info!(code = ?code, reason = reason.as_deref().unwrap_or(""), "closed");
        }
        SdkEvent::Error(e) => tracing::warn!(error = %e, "sdk error"),
        SdkEvent::ServiceIssue(e) => tracing::warn!(error = %e, "service issue"),
        SdkEvent::Message {
            name: EventName::ExConversationChange,
            body,
            ..
        } => {
            tracing::info!(%body, "conversation change");
        }
        SdkEvent::Message { name, body, req_id, .. } => {
            tracing::debug!(event = %name, req_id = ?req_id, %body, "message");
        }
        SdkEvent::Notification(_) => {}
    }
}
