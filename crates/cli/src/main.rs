//! agentdeck CLI
//!
//! Terminal front end for coding-agent sessions: live watch over the
//! streaming channel, approve/deny of pending tool invocations, prompt
//! submission, and standalone diff rendering.

mod logging;
mod render_out;

use std::io::Read;

use agentdeck_client::{
    ApprovalCorrelator, ClientConfig, ConnectionManager, ConnectionState, Decision, ResolveOutcome,
    SessionApi, SessionProjection, StreamNotice,
};
use std::time::Duration;

use agentdeck_protocol::{ControlFrame, StreamEvent};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use tracing::info;

#[derive(Parser)]
#[command(name = "agentdeck", about = "Terminal client for coding-agent sessions")]
struct Cli {
    /// Base URL of the session backend
    #[arg(long, global = true)]
    server: Option<String>,

    /// API key for the backend
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a session's events live until it finishes
    Watch { session_id: String },

    /// Show a session's current state
    Status { session_id: String },

    /// Approve the session's pending tool invocation
    Approve {
        session_id: String,
        /// Feedback to attach to the decision
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Deny the session's pending tool invocation
    Deny {
        session_id: String,
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Send a new prompt to a session
    Prompt { session_id: String, prompt: String },

    /// Interrupt the session's active agent turn
    Interrupt { session_id: String },

    /// Render a unified diff file (or stdin) with gutter line numbers
    RenderDiff {
        /// Path to a diff file; reads stdin when omitted
        path: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logging()?;

    let mut config = ClientConfig::load().map_err(|e| anyhow::anyhow!("{e}"))?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(key) = cli.api_key {
        config.api_key = Some(key);
    }

    match cli.command {
        Command::Watch { session_id } => watch(config, &session_id).await,
        Command::Status { session_id } => status(config, &session_id).await,
        Command::Approve {
            session_id,
            feedback,
        } => resolve(config, &session_id, Decision::Approve, feedback).await,
        Command::Deny {
            session_id,
            feedback,
        } => resolve(config, &session_id, Decision::Deny, feedback).await,
        Command::Prompt { session_id, prompt } => {
            let api = SessionApi::new(config);
            api.send_prompt(&session_id, &prompt).await?;
            println!("prompt sent");
            Ok(())
        }
        Command::Interrupt { session_id } => interrupt(config, &session_id).await,
        Command::RenderDiff { path } => render_diff(path),
    }
}

async fn watch(config: ClientConfig, session_id: &str) -> anyhow::Result<()> {
    let api = SessionApi::new(config.clone());
    let (manager, mut notices) = ConnectionManager::establish(config, session_id);
    let mut projection = SessionProjection::new();
    let mut was_connected = false;

    info!(component = "cli", session_id = %session_id, "watching session");

    while let Some(notice) = notices.recv().await {
        if let StreamNotice::State(ConnectionState::Connected) = notice {
            if was_connected {
                // The agent may have restarted during the gap
                let _ = manager.send(ControlFrame::Subscribe);
            }
            was_connected = true;
        }
        match notice {
            StreamNotice::Event(event) => {
                print_event(&event);
                projection.apply_event(&event);
                if projection.status.is_terminal() {
                    break;
                }
            }
            StreamNotice::Resync => {
                // Events may have been missed during the gap; the
                // authoritative record wins.
                match api.get_session(session_id).await {
                    Ok(session) => {
                        projection.apply_authoritative(&session);
                        println!(
                            "{} {}",
                            style("synced:").dim(),
                            render_out::status_label(projection.status)
                        );
                        if let Some(approval) = &projection.pending_approval {
                            render_out::print_approval(approval);
                        }
                        if projection.status.is_terminal() {
                            break;
                        }
                    }
                    Err(err) => {
                        eprintln!("{} {err}", style("sync failed:").red());
                    }
                }
            }
            StreamNotice::State(state) => {
                let label = match state {
                    ConnectionState::Connecting => "connecting",
                    ConnectionState::Connected => "connected",
                    ConnectionState::Reconnecting => "reconnecting",
                    ConnectionState::FallbackActive => "degraded to one-way stream",
                    ConnectionState::Disconnected => "disconnected",
                };
                eprintln!("{}", style(format!("[{label}]")).dim());
            }
        }
    }

    manager.disconnect();
    println!(
        "session {}: {}, {} messages, ${:.4}",
        session_id,
        render_out::status_label(projection.status),
        projection.message_count,
        projection.total_cost_usd
    );
    Ok(())
}

fn print_event(event: &StreamEvent) {
    match event {
        StreamEvent::Text { content, .. } => println!("{content}"),
        StreamEvent::User { content, .. } => {
            println!("{} {content}", style(">").bold());
        }
        StreamEvent::ToolUse {
            tool_name,
            tool_input,
            ..
        } => {
            println!("{} {tool_name}", style("tool:").cyan());
            if let Some(command) = tool_input.get("command").and_then(|v| v.as_str()) {
                render_out::print_command(command);
            }
        }
        StreamEvent::ToolResult { tool_result, .. } => {
            let preview: String = tool_result.chars().take(200).collect();
            println!("{} {preview}", style("result:").dim());
        }
        StreamEvent::ApprovalRequired { approval, .. } => {
            render_out::print_approval(approval);
            println!(
                "{}",
                style("run `agentdeck approve` or `agentdeck deny`").yellow()
            );
        }
        StreamEvent::ApprovalProcessed { approved, .. } => {
            let verdict = if *approved { "approved" } else { "denied" };
            println!("{}", style(format!("decision: {verdict}")).dim());
        }
        StreamEvent::Status { status, .. } => {
            println!("{} {}", style("status:").dim(), render_out::status_label(*status));
        }
        StreamEvent::Error { content, .. } => {
            eprintln!("{} {content}", style("error:").red().bold());
        }
        StreamEvent::Result {
            total_cost_usd,
            duration_ms,
            ..
        } => {
            println!(
                "{} cost ${:.4}, {} ms",
                style("turn done:").dim(),
                total_cost_usd.unwrap_or(0.0),
                duration_ms.unwrap_or(0)
            );
        }
        StreamEvent::Init { .. } | StreamEvent::History { .. } | StreamEvent::Pong { .. } => {}
    }
}

async fn status(config: ClientConfig, session_id: &str) -> anyhow::Result<()> {
    let api = SessionApi::new(config);
    let session = api.get_session(session_id).await?;
    println!(
        "{} {}",
        style(&session.id).bold(),
        render_out::status_label(session.status)
    );
    println!(
        "  {} messages, ${:.4}",
        session.message_count, session.total_cost_usd
    );
    if let Some(approval) = &session.pending_approval {
        render_out::print_approval(approval);
    }
    Ok(())
}

async fn resolve(
    config: ClientConfig,
    session_id: &str,
    decision: Decision,
    feedback: Option<String>,
) -> anyhow::Result<()> {
    let api = SessionApi::new(config);
    let session = api.get_session(session_id).await?;

    let Some(pending) = session.pending_approval else {
        bail!("session {session_id} has nothing pending");
    };
    let tool_use_id = pending.tool_use_id.clone();

    let mut correlator = ApprovalCorrelator::new();
    correlator.accept(pending);
    if let Some(feedback) = feedback {
        correlator.set_draft_feedback(feedback);
    }

    match correlator
        .resolve(&api, session_id, &tool_use_id, decision)
        .await?
    {
        ResolveOutcome::Submitted => {
            let verb = match decision {
                Decision::Approve => "approved",
                Decision::Deny => "denied",
            };
            println!("{verb} {tool_use_id}");
            Ok(())
        }
        outcome => bail!("decision not submitted: {outcome:?}"),
    }
}

async fn interrupt(config: ClientConfig, session_id: &str) -> anyhow::Result<()> {
    let (manager, mut notices) = ConnectionManager::establish(config, session_id);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);

    loop {
        match tokio::time::timeout_at(deadline, notices.recv()).await {
            Ok(Some(StreamNotice::State(ConnectionState::Connected))) => {
                manager.send(ControlFrame::Interrupt)?;
                manager.disconnect();
                println!("interrupt sent");
                return Ok(());
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                manager.disconnect();
                bail!("could not reach session {session_id}");
            }
        }
    }
}

fn render_diff(path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let diff = match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("read stdin")?;
            buffer
        }
    };
    render_out::print_diff(&diff);
    Ok(())
}
