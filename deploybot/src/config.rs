//! Process configuration, from flags or environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("you must supply a slack token via CHATBOT_SLACK_TOKEN env variable")]
    MissingSlackToken,
    #[error("invalid cluster name {0:?}: must end with \"net\" and be at least 4 characters")]
    InvalidClusterName(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "deploybot", about = "Slack bot for kubectl deploys and statefulset resets")]
pub struct BotConfig {
    /// Slack bot token (xoxb-...)
    #[arg(long, env = "CHATBOT_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: String,

    /// Slack signing secret; request signatures are not checked without it
    #[arg(long, env = "CHATBOT_SLACK_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// Cluster this bot owns; commands must name it when set
    #[arg(long, env = "CHATBOT_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Address for the Slack Events API endpoint
    #[arg(long = "listen", env = "CHATBOT_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    /// Command prefix
    #[arg(long, default_value = "!")]
    pub prefix: String,

    /// kubectl binary
    #[arg(long, default_value = "kubectl")]
    pub kubectl: String,

    /// Directory for statefulset definitions saved during reset
    #[arg(long, default_value = "/tmp")]
    pub reset_dir: PathBuf,

    /// Deploy without checking that the image tag exists on Docker Hub
    #[arg(long)]
    pub skip_image_check: bool,

    /// Docker Hub index base URL
    #[arg(long, default_value = crate::registry_check::DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    #[arg(long, default_value_t = 2)]
    pub registry_timeout_secs: u64,

    /// How long to wait for pods to become ready after a deploy
    #[arg(long, default_value_t = 20)]
    pub status_timeout_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub status_poll_secs: u64,

    /// Slack Web API base URL
    #[arg(long, default_value = "https://slack.com/api")]
    pub slack_api_url: String,
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack_token.trim().is_empty() {
            return Err(ConfigError::MissingSlackToken);
        }
        if let Some(name) = &self.cluster_name {
            crate::gate::ClusterGate::new(name)?;
        }
        if self.registry_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("--registry-timeout-secs"));
        }
        if self.status_poll_secs == 0 {
            return Err(ConfigError::ZeroDuration("--status-poll-secs"));
        }
        Ok(())
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> BotConfig {
        let mut argv = vec!["deploybot"];
        argv.extend_from_slice(args);
        BotConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let cfg = parse(&["--slack-token", "xoxb-1"]);
        assert_eq!(cfg.prefix, "!");
        assert_eq!(cfg.kubectl, "kubectl");
        assert_eq!(cfg.reset_dir, PathBuf::from("/tmp"));
        assert_eq!(cfg.registry_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.status_timeout(), Duration::from_secs(20));
        assert!(!cfg.skip_image_check);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_token_is_rejected() {
        let cfg = parse(&["--slack-token", "  "]);
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingSlackToken)));
    }

    #[test]
    fn cluster_name_must_end_with_net() {
        let cfg = parse(&["--slack-token", "xoxb-1", "--cluster-name", "prod"]);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidClusterName(_))));

        let cfg = parse(&["--slack-token", "xoxb-1", "--cluster-name", "prodnet"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let cfg = parse(&["--slack-token", "xoxb-1", "--status-poll-secs", "0"]);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDuration(_))));
    }
}
