//! deploybot: deploy and reset Kubernetes workloads from Slack.
//!
//! Requires CHATBOT_SLACK_TOKEN. Set CHATBOT_CLUSTER_NAME when several bots,
//! one per cluster, listen in the same channel.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use deploybot::commands::{Command, DeployCommand, Registry, ResetCommand};
use deploybot::config::BotConfig;
use deploybot::executor::{Executor, ShellExecutor};
use deploybot::gate::ClusterGate;
use deploybot::kubectl::Kubectl;
use deploybot::registry_check::DockerHub;
use deploybot::slack::{self, AppState, SlackClient};

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs in production (DEPLOYBOT_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("DEPLOYBOT_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "deploybot=info".into());
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = BotConfig::parse();
    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        std::process::exit(1);
    }

    let slack = SlackClient::new(config.slack_token.clone(), &config.slack_api_url);
    let identity = match slack.auth_test().await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Slack token rejected");
            std::process::exit(1);
        }
    };
    tracing::info!(user = %identity.user_id, "Authenticated with Slack");

    let registry = build_registry(&config)?;
    for r in registry.registrations() {
        tracing::info!(alias = %r.alias, gated = r.gated, "Command available");
    }

    let state = Arc::new(AppState {
        registry: Arc::new(registry),
        sink: Arc::new(slack),
        signing_secret: config.signing_secret.clone(),
        bot_user: Some(identity.user_id),
    });
    if state.signing_secret.is_none() {
        tracing::warn!("No signing secret configured; Slack requests are not authenticated");
    }

    slack::serve(config.listen_addr, state).await
}

fn build_registry(config: &BotConfig) -> Result<Registry> {
    let gate = config
        .cluster_name
        .as_deref()
        .map(ClusterGate::new)
        .transpose()?;
    if let Some(gate) = &gate {
        tracing::info!(cluster = %gate.cluster(), "Cluster gate enabled");
    }

    let executor: Arc<dyn Executor> = Arc::new(ShellExecutor::new());
    let kubectl = Kubectl::new(config.kubectl.clone());

    let mut deploy = DeployCommand::new(executor.clone(), kubectl.clone())
        .with_status_wait(config.status_timeout(), config.status_poll());
    if config.skip_image_check {
        tracing::info!("Image tag check disabled");
    } else {
        let hub = DockerHub::new(&config.registry_url, config.registry_timeout())?;
        deploy = deploy.with_registry(Arc::new(hub));
    }

    let mut registry = Registry::new(&config.prefix, gate);
    registry.register(Command::Deploy(Arc::new(deploy)));
    registry.register(Command::Reset(Arc::new(ResetCommand::new(
        executor,
        kubectl,
        config.reset_dir.clone(),
    ))));
    Ok(registry)
}
