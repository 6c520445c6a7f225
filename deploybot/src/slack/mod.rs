//! Slack adapter: receives Events API callbacks and posts replies.
//!
//! Slack expects an answer within three seconds, so commands run on their own
//! task and the callback is acknowledged immediately.

mod client;
mod events;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::commands::{Invocation, Registry, Reply};

pub use client::{BotIdentity, SlackClient};
pub use events::{verify_signature, ChatMessage, Envelope, Event, SignatureError};

/// Destination for command replies.
pub trait ReplySink: Send + Sync {
    fn post<'a>(&'a self, channel: &'a str, text: &'a str, thread_ts: Option<&'a str>) -> BoxFuture<'a, Result<()>>;
}

impl ReplySink for SlackClient {
    fn post<'a>(&'a self, channel: &'a str, text: &'a str, thread_ts: Option<&'a str>) -> BoxFuture<'a, Result<()>> {
        self.post_message(channel, text, thread_ts).boxed()
    }
}

pub struct AppState {
    pub registry: Arc<Registry>,
    pub sink: Arc<dyn ReplySink>,
    /// Requests are only authenticated when this is set.
    pub signing_secret: Option<String>,
    /// The bot's own user id, to ignore its own messages.
    pub bot_user: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/slack/events", post(slack_events))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening for Slack events on {addr}");
    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")
}

async fn health() -> &'static str {
    "ok"
}

async fn slack_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    if let Some(secret) = &state.signing_secret {
        verify_signature(
            secret,
            header(&headers, "x-slack-request-timestamp"),
            header(&headers, "x-slack-signature"),
            &body,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected Slack request");
            (StatusCode::UNAUTHORIZED, e.to_string())
        })?;
    }

    // Slack redelivers events it thinks were missed; running a deploy twice
    // is worse than dropping the retry.
    if let Some(retry) = header(&headers, "x-slack-retry-num") {
        tracing::debug!(%retry, "Ignoring Slack retry");
        return Ok(StatusCode::OK.into_response());
    }

    let envelope: Envelope = serde_json::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")))?;

    match envelope {
        Envelope::UrlVerification { challenge } => {
            Ok(Json(serde_json::json!({ "challenge": challenge })).into_response())
        }
        Envelope::EventCallback { event } => {
            if let Some(message) = event.into_chat_message(state.bot_user.as_deref()) {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    handle_message(&state.registry, state.sink.as_ref(), message).await;
                });
            }
            Ok(StatusCode::OK.into_response())
        }
        Envelope::Other => Ok(StatusCode::OK.into_response()),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Run the command in `message`, if any, and post its replies in order.
pub async fn handle_message(registry: &Registry, sink: &dyn ReplySink, message: ChatMessage) {
    let Some(invocation) = Invocation::parse(&message.text, registry.prefix()) else {
        return;
    };

    tracing::info!(
        user = %message.user,
        channel = %message.channel,
        command = %invocation.command,
        args = ?invocation.args,
        "Command received"
    );

    let reply = match registry.dispatch(&invocation).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(command = %invocation.command, error = %format!("{e:#}"), "Command failed");
            Reply::Text(format!("Command {} failed: {e:#}", invocation.command))
        }
    };

    match reply {
        Reply::Silent => {}
        Reply::Text(text) => post_reply(sink, &message, &text).await,
        Reply::Stream(mut rx) => {
            while let Some(text) = rx.recv().await {
                post_reply(sink, &message, &text).await;
            }
        }
    }
}

async fn post_reply(sink: &dyn ReplySink, message: &ChatMessage, text: &str) {
    if let Err(e) = sink
        .post(&message.channel, text, message.thread_ts.as_deref())
        .await
    {
        tracing::error!(channel = %message.channel, error = %e, "Failed to post reply");
    }
}
